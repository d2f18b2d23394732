//! Target discovery: find the daily notes a run may enrich.
//!
//! A target is a regular file named exactly `YYYY-MM-DD.<ext>`. Anything else in
//! the directory is ignored. Only the target directory itself being unreadable
//! is an error; Daybook never creates notes, so without it there is nothing to do.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use daybook_shared::{DateKey, DaybookError, Result};
use tracing::{debug, info, instrument, warn};

/// Default extension of daily notes.
const DEFAULT_EXTENSION: &str = "md";

// ---------------------------------------------------------------------------
// Discovery options
// ---------------------------------------------------------------------------

/// Configuration for the discovery scan.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Extension of daily notes, without the dot.
    pub extension: String,
    /// Also scan subdirectories (e.g. `2025/April/2025-04-26.md`).
    pub recursive: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            recursive: false,
        }
    }
}

// ---------------------------------------------------------------------------
// TargetSet
// ---------------------------------------------------------------------------

/// An existing daily note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDocument {
    pub date: DateKey,
    pub path: PathBuf,
}

/// All discovered notes, keyed by date.
#[derive(Debug, Clone, Default)]
pub struct TargetSet {
    docs: BTreeMap<DateKey, TargetDocument>,
}

impl TargetSet {
    pub fn get(&self, date: DateKey) -> Option<&TargetDocument> {
        self.docs.get(&date)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Notes in date order.
    pub fn iter(&self) -> impl Iterator<Item = &TargetDocument> {
        self.docs.values()
    }

    fn insert(&mut self, doc: TargetDocument) {
        match self.docs.get(&doc.date) {
            Some(existing) => {
                warn!(
                    date = %doc.date,
                    kept = %existing.path.display(),
                    ignored = %doc.path.display(),
                    "two notes share a date, keeping the first"
                );
            }
            None => {
                self.docs.insert(doc.date, doc);
            }
        }
    }
}

impl FromIterator<TargetDocument> for TargetSet {
    fn from_iter<I: IntoIterator<Item = TargetDocument>>(iter: I) -> Self {
        let mut set = TargetSet::default();
        for doc in iter {
            set.insert(doc);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Scan `dir` for daily notes.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn discover(dir: &Path, opts: &DiscoveryOptions) -> Result<TargetSet> {
    let mut set = TargetSet::default();
    let mut pending = vec![dir.to_path_buf()];
    let mut root = true;

    while let Some(current) = pending.pop() {
        let entries = match read_sorted(&current) {
            Ok(entries) => entries,
            Err(source) if root => {
                return Err(DaybookError::Discovery {
                    path: current,
                    source,
                });
            }
            Err(e) => {
                warn!(path = %current.display(), error = %e, "skipping unreadable subdirectory");
                continue;
            }
        };
        root = false;

        for path in entries {
            if path.is_dir() {
                if opts.recursive {
                    pending.push(path);
                }
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            match parse_target_name(name, &opts.extension) {
                Some(date) if path.is_file() => set.insert(TargetDocument { date, path }),
                _ => debug!(name, "not a daily note"),
            }
        }
    }

    info!(count = set.len(), "discovered daily notes");
    Ok(set)
}

/// Parse `YYYY-MM-DD.<ext>`; returns `None` for any other name.
pub fn parse_target_name(name: &str, extension: &str) -> Option<DateKey> {
    let stem = name.strip_suffix(extension)?.strip_suffix('.')?;
    DateKey::parse_strict(stem)
}

/// List a directory with entries sorted by path, so scans are reproducible.
fn read_sorted(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "daybook-discovery-test-{}",
            uuid::Uuid::now_v7()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn name_pattern_is_exact() {
        assert!(parse_target_name("2025-04-26.md", "md").is_some());
        assert!(parse_target_name("2025-04-26.md.bak", "md").is_none());
        assert!(parse_target_name("2025-04-26.txt", "md").is_none());
        assert!(parse_target_name("2025-4-26.md", "md").is_none());
        assert!(parse_target_name("x2025-04-26.md", "md").is_none());
        assert!(parse_target_name("2025-04-26md", "md").is_none());
        assert!(parse_target_name("2025-13-01.md", "md").is_none());
        assert!(parse_target_name("2025-04-26.txt", "txt").is_some());
    }

    #[test]
    fn discover_filters_non_matching_entries() {
        let dir = temp_dir();
        fs::write(dir.join("2025-04-26.md"), "# Notes\n").unwrap();
        fs::write(dir.join("2025-04-27.md"), "").unwrap();
        fs::write(dir.join("notes.md"), "").unwrap();
        fs::write(dir.join("2025-04-28.txt"), "").unwrap();
        fs::create_dir_all(dir.join("2025-04-29.md")).unwrap();

        let set = discover(&dir, &DiscoveryOptions::default()).unwrap();
        assert_eq!(set.len(), 2);
        let date: DateKey = "2025-04-26".parse().unwrap();
        assert_eq!(set.get(date).unwrap().path, dir.join("2025-04-26.md"));
        assert!(set.get("2025-04-29".parse().unwrap()).is_none());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn discover_recurses_only_when_asked() {
        let dir = temp_dir();
        let nested = dir.join("2025").join("April");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("2025-04-26.md"), "").unwrap();

        let flat = discover(&dir, &DiscoveryOptions::default()).unwrap();
        assert!(flat.is_empty());

        let opts = DiscoveryOptions {
            recursive: true,
            ..Default::default()
        };
        let deep = discover(&dir, &opts).unwrap();
        assert_eq!(deep.len(), 1);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_directory_is_fatal() {
        let dir = std::env::temp_dir().join(format!("daybook-missing-{}", uuid::Uuid::now_v7()));
        let err = discover(&dir, &DiscoveryOptions::default()).unwrap_err();
        assert!(matches!(err, DaybookError::Discovery { .. }));
    }
}
