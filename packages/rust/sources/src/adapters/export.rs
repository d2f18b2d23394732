//! Export files and the timestamp formats found in them.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike};
use tracing::info;

use daybook_shared::{DaybookError, Result};

/// A downloaded export file consumed by a history adapter.
#[derive(Debug, Clone)]
pub struct ExportFile {
    path: PathBuf,
    delete_after_import: bool,
}

impl ExportFile {
    pub fn new(path: impl Into<PathBuf>, delete_after_import: bool) -> Self {
        Self {
            path: path.into(),
            delete_after_import,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole export. A missing file fails the source, not the run.
    pub fn read(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| DaybookError::io(&self.path, e))
    }

    /// Delete the export when configured to.
    pub fn consume(&self) -> Result<Option<PathBuf>> {
        if !self.delete_after_import {
            return Ok(None);
        }
        fs::remove_file(&self.path).map_err(|e| DaybookError::io(&self.path, e))?;
        info!(path = %self.path.display(), "removed consumed export");
        Ok(Some(self.path.clone()))
    }
}

/// Timestamp formats without a zone, read as local wall-clock time.
const LOCAL_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an export timestamp into local wall-clock time, to the second.
///
/// Accepts epoch milliseconds, RFC 3339 with any offset (both converted with
/// `offset`) and the zone-less forms in [`LOCAL_FORMATS`].
pub(crate) fn parse_local_timestamp(raw: &str, offset: FixedOffset) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    let parsed = if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        let millis: i64 = raw.parse().ok()?;
        DateTime::from_timestamp_millis(millis)?
            .with_timezone(&offset)
            .naive_local()
    } else if let Ok(zoned) = DateTime::parse_from_rfc3339(raw) {
        zoned.with_timezone(&offset).naive_local()
    } else {
        LOCAL_FORMATS
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())?
    };
    Some(parsed.with_nanosecond(0).unwrap_or(parsed))
}

/// Index of the column named `name`, ignoring case and surrounding space.
pub(crate) fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("daybook-export-test-{}", uuid::Uuid::now_v7()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("export.csv");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn consume_only_when_enabled() {
        let path = temp_file("x");
        let keep = ExportFile::new(&path, false);
        assert_eq!(keep.consume().unwrap(), None);
        assert!(path.exists());

        let remove = ExportFile::new(&path, true);
        assert_eq!(remove.consume().unwrap(), Some(path.clone()));
        assert!(!path.exists());
    }

    #[test]
    fn timestamps_in_every_export_format() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let minus_five = FixedOffset::west_opt(5 * 3600).unwrap();
        let expected = NaiveDateTime::parse_from_str("2025-04-26 08:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();

        // 2025-04-26T13:00:00.250Z
        assert_eq!(parse_local_timestamp("1745672400250", minus_five), Some(expected));
        assert_eq!(
            parse_local_timestamp("2025-04-26T13:00:00+00:00", minus_five),
            Some(expected)
        );
        assert_eq!(parse_local_timestamp("2025-04-26T08:00:00", utc), Some(expected));
        assert_eq!(parse_local_timestamp("2025-04-26 08:00", utc), Some(expected));
        assert_eq!(parse_local_timestamp("yesterday", utc), None);
        assert_eq!(parse_local_timestamp("", utc), None);
    }

    #[test]
    fn missing_export_is_an_io_error() {
        let export = ExportFile::new("/nonexistent/daybook/export.csv", false);
        assert!(matches!(export.read(), Err(DaybookError::Io { .. })));
    }
}
