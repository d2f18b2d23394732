//! Streaming viewing history from a CSV export (`Title`, `Date`).

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{info, instrument};

use daybook_shared::{ContentRecord, DaybookError, RecordKind, Result, StreamingView};

use super::export::column;
use super::{ExportFile, RunContext, SourceAdapter, SourceBatch};

const DATE_FORMATS: [&str; 3] = ["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d"];
const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

pub struct StreamingAdapter {
    export: ExportFile,
}

impl StreamingAdapter {
    pub fn new(export: ExportFile) -> Self {
        Self { export }
    }
}

#[async_trait]
impl SourceAdapter for StreamingAdapter {
    fn name(&self) -> &str {
        "streaming"
    }

    fn kind(&self) -> RecordKind {
        RecordKind::Streaming
    }

    #[instrument(skip_all, fields(path = %self.export.path().display()))]
    async fn fetch(&self, _ctx: &RunContext) -> Result<SourceBatch> {
        let raw = self.export.read()?;
        let batch = parse_views(&raw)?;
        info!(
            records = batch.records.len(),
            rejects = batch.rejects.len(),
            "read viewing history"
        );
        Ok(batch)
    }

    fn consume(&self) -> Result<Option<std::path::PathBuf>> {
        self.export.consume()
    }
}

fn parse_views(raw: &str) -> Result<SourceBatch> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| DaybookError::parse(format!("unreadable CSV header: {e}")))?
        .clone();
    let title_col = column(&headers, "Title")
        .ok_or_else(|| DaybookError::parse("viewing history has no 'Title' column"))?;
    let date_col = column(&headers, "Date")
        .ok_or_else(|| DaybookError::parse("viewing history has no 'Date' column"))?;

    let mut batch = SourceBatch::default();
    for (i, row) in reader.records().enumerate() {
        let line = i + 2;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                batch.reject(format!("viewing row {line}: {e}"));
                continue;
            }
        };

        let title = row.get(title_col).unwrap_or_default();
        if title.is_empty() {
            batch.reject(format!("viewing row {line}: empty title"));
            continue;
        }
        let raw_date = row.get(date_col).unwrap_or_default();
        let Some((watched_on, watched_at)) = parse_watch_date(raw_date) else {
            batch.reject(format!("viewing row {line}: bad date {raw_date:?}"));
            continue;
        };

        batch.records.push(ContentRecord::Streaming(StreamingView {
            title: title.to_string(),
            watched_on,
            watched_at,
        }));
    }
    Ok(batch)
}

/// A viewing date, with the time of day when the export has one.
fn parse_watch_date(raw: &str) -> Option<(NaiveDate, Option<NaiveTime>)> {
    let raw = raw.trim();
    if let Some(at) = DATE_TIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
    {
        return Some((at.date(), Some(at.time())));
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
        .map(|d| (d, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_every_date_form() {
        let day = NaiveDate::from_ymd_opt(2025, 4, 26).unwrap();
        assert_eq!(parse_watch_date("4/26/25"), Some((day, None)));
        assert_eq!(parse_watch_date("04/26/2025"), Some((day, None)));
        assert_eq!(parse_watch_date("2025-04-26"), Some((day, None)));
        assert_eq!(
            parse_watch_date("2025-04-26 21:05"),
            Some((day, NaiveTime::from_hms_opt(21, 5, 0)))
        );
        assert_eq!(parse_watch_date("Saturday"), None);
    }

    #[test]
    fn parses_netflix_style_export() {
        let csv = "Title,Date\n\
                   \"The Show: Season 1: Episode 1\",4/26/25\n\
                   \"The Show: Season 1: Episode 2\",4/26/25\n\
                   Broken,someday\n";
        let batch = parse_views(csv).unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.rejects.len(), 1);
        assert_ne!(batch.records[0].marker(), batch.records[1].marker());
    }

    #[test]
    fn missing_date_column_fails_the_source() {
        assert!(parse_views("Title\nA\n").is_err());
    }
}
