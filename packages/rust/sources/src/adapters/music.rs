//! Music play history from a CSV export.
//!
//! Columns: `Track Name`, optional `Artist Name`, `Last Played Date` (epoch
//! milliseconds or an ISO-8601 timestamp). Other columns are ignored.

use async_trait::async_trait;
use chrono::FixedOffset;
use tracing::{info, instrument};

use daybook_shared::{ContentRecord, DaybookError, MusicPlay, RecordKind, Result};

use super::export::{column, parse_local_timestamp};
use super::{ExportFile, RunContext, SourceAdapter, SourceBatch};

pub struct MusicAdapter {
    export: ExportFile,
}

impl MusicAdapter {
    pub fn new(export: ExportFile) -> Self {
        Self { export }
    }
}

#[async_trait]
impl SourceAdapter for MusicAdapter {
    fn name(&self) -> &str {
        "music"
    }

    fn kind(&self) -> RecordKind {
        RecordKind::Music
    }

    #[instrument(skip_all, fields(path = %self.export.path().display()))]
    async fn fetch(&self, ctx: &RunContext) -> Result<SourceBatch> {
        let raw = self.export.read()?;
        let batch = parse_plays(&raw, ctx.utc_offset)?;
        info!(
            records = batch.records.len(),
            rejects = batch.rejects.len(),
            "read music export"
        );
        Ok(batch)
    }

    fn consume(&self) -> Result<Option<std::path::PathBuf>> {
        self.export.consume()
    }
}

fn parse_plays(raw: &str, offset: FixedOffset) -> Result<SourceBatch> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| DaybookError::parse(format!("unreadable CSV header: {e}")))?
        .clone();
    let track_col = column(&headers, "Track Name")
        .ok_or_else(|| DaybookError::parse("music export has no 'Track Name' column"))?;
    let played_col = column(&headers, "Last Played Date")
        .ok_or_else(|| DaybookError::parse("music export has no 'Last Played Date' column"))?;
    let artist_col = column(&headers, "Artist Name");

    let mut batch = SourceBatch::default();
    for (i, row) in reader.records().enumerate() {
        let line = i + 2;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                batch.reject(format!("music row {line}: {e}"));
                continue;
            }
        };

        let track = row.get(track_col).unwrap_or_default();
        if track.is_empty() {
            batch.reject(format!("music row {line}: empty track name"));
            continue;
        }
        let raw_played = row.get(played_col).unwrap_or_default();
        let Some(played_at) = parse_local_timestamp(raw_played, offset) else {
            batch.reject(format!("music row {line}: bad timestamp {raw_played:?}"));
            continue;
        };
        let artist = artist_col
            .and_then(|c| row.get(c))
            .unwrap_or_default()
            .to_string();

        batch.records.push(ContentRecord::Music(MusicPlay {
            track: track.to_string(),
            artist,
            played_at,
        }));
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn write_export(contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("daybook-music-test-{}", uuid::Uuid::now_v7()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("plays.csv");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn parses_epoch_and_iso_rows() {
        let csv = "Track Name,Artist Name,Last Played Date,Is User Initiated\n\
                   A,B,1745654400000,true\n\
                   \"Song, With Comma\",,2025-04-26T09:30:00,false\n";
        let batch = parse_plays(csv, utc()).unwrap();
        assert!(batch.rejects.is_empty());
        assert_eq!(batch.records.len(), 2);

        let ContentRecord::Music(first) = &batch.records[0] else {
            panic!("expected music");
        };
        assert_eq!(first.track, "A");
        assert_eq!(first.played_at.to_string(), "2025-04-26 08:00:00");

        let ContentRecord::Music(second) = &batch.records[1] else {
            panic!("expected music");
        };
        assert_eq!(second.track, "Song, With Comma");
        assert_eq!(second.artist, "");
    }

    #[test]
    fn bad_rows_are_rejected_individually() {
        let csv = "Track Name,Last Played Date\n\
                   ,1745654400000\n\
                   A,not-a-date\n\
                   B,1745654400000\n";
        let batch = parse_plays(csv, utc()).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.rejects.len(), 2);
        assert!(batch.rejects[0].contains("row 2"));
    }

    #[test]
    fn missing_required_column_fails_the_source() {
        assert!(parse_plays("Title,Date\nA,2025-04-26\n", utc()).is_err());
    }

    #[tokio::test]
    async fn fetch_reads_the_export_file() {
        let path = write_export("Track Name,Last Played Date\nA,2025-04-26 08:00:00\n");
        let adapter = MusicAdapter::new(ExportFile::new(&path, false));
        let ctx = RunContext {
            run_date: "2025-04-27".parse().unwrap(),
            utc_offset: utc(),
        };

        let batch = adapter.fetch(&ctx).await.unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].date().to_string(), "2025-04-26");

        fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[tokio::test]
    async fn missing_export_fails_fetch() {
        let adapter = MusicAdapter::new(ExportFile::new("/nonexistent/daybook/plays.csv", false));
        let ctx = RunContext {
            run_date: "2025-04-27".parse().unwrap(),
            utc_offset: utc(),
        };
        assert!(adapter.fetch(&ctx).await.is_err());
    }
}
