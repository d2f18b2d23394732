use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDateTime};

use daybook_core::{RunOptions, SilentProgress, run};
use daybook_shared::{ContentRecord, DateKey, DaybookError, MusicPlay, RecordKind, Result};
use daybook_sources::{RunContext, SourceAdapter, SourceBatch, SourcePlan};

/// Source that returns canned records and counts consume calls.
struct FakeSource {
    kind: RecordKind,
    records: Vec<ContentRecord>,
    rejects: Vec<String>,
    fail: bool,
    consumed: Arc<AtomicUsize>,
}

impl FakeSource {
    fn music(records: Vec<ContentRecord>) -> Self {
        Self {
            kind: RecordKind::Music,
            records,
            rejects: Vec::new(),
            fail: false,
            consumed: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing(kind: RecordKind) -> Self {
        Self {
            fail: true,
            kind,
            ..Self::music(Vec::new())
        }
    }
}

#[async_trait]
impl SourceAdapter for FakeSource {
    fn name(&self) -> &str {
        self.kind.tag()
    }

    fn kind(&self) -> RecordKind {
        self.kind
    }

    async fn fetch(&self, _ctx: &RunContext) -> Result<SourceBatch> {
        if self.fail {
            return Err(DaybookError::Network("connection refused".into()));
        }
        Ok(SourceBatch {
            records: self.records.clone(),
            rejects: self.rejects.clone(),
        })
    }

    fn consume(&self) -> Result<Option<PathBuf>> {
        self.consumed.fetch_add(1, Ordering::SeqCst);
        Ok(Some(PathBuf::from("plays.csv")))
    }
}

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("daybook-run-test-{}", uuid::Uuid::now_v7()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn play(track: &str, at: &str) -> ContentRecord {
    ContentRecord::Music(MusicPlay {
        track: track.into(),
        artist: "B".into(),
        played_at: NaiveDateTime::parse_from_str(at, "%Y-%m-%dT%H:%M").unwrap(),
    })
}

fn options(dir: &Path, dry_run: bool) -> RunOptions {
    RunOptions {
        target_dir: dir.to_path_buf(),
        extension: "md".into(),
        recursive: false,
        run_date: DateKey::parse_strict("2025-04-26").unwrap(),
        utc_offset: FixedOffset::east_opt(0).unwrap(),
        dry_run,
    }
}

fn plan(sources: Vec<FakeSource>) -> SourcePlan {
    SourcePlan {
        enabled: sources
            .into_iter()
            .map(|s| Box::new(s) as Box<dyn SourceAdapter>)
            .collect(),
        disabled: Vec::new(),
    }
}

#[tokio::test]
async fn records_without_a_note_are_dropped() {
    let dir = temp_dir();
    let note = dir.join("2025-04-26.md");
    fs::write(&note, "# Notes\n").unwrap();

    let source = FakeSource::music(vec![
        play("A", "2025-04-26T08:00"),
        play("A", "2025-04-27T08:00"),
    ]);
    let summary = run(&plan(vec![source]), &options(&dir, false), &SilentProgress)
        .await
        .unwrap();

    assert_eq!(summary.targets, 1);
    assert_eq!(summary.inserted(), 1);
    assert_eq!(summary.orphaned(), 1);
    assert!(
        summary
            .missing_dates
            .contains(&DateKey::parse_strict("2025-04-27").unwrap())
    );
    assert!(!dir.join("2025-04-27.md").exists());

    let text = fs::read_to_string(&note).unwrap();
    assert!(text.starts_with("# Notes\n"));
    assert!(text.contains("**A** by B"));
    assert!(!text.contains("2025-04-27"));
    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn failing_source_does_not_stop_the_others() {
    let dir = temp_dir();
    let note = dir.join("2025-04-26.md");
    fs::write(&note, "").unwrap();

    let sources = vec![
        FakeSource::failing(RecordKind::News),
        FakeSource::music(vec![play("A", "2025-04-26T08:00")]),
    ];
    let summary = run(&plan(sources), &options(&dir, false), &SilentProgress)
        .await
        .unwrap();

    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].name, "news");
    assert_eq!(summary.sources.len(), 1);
    assert_eq!(summary.inserted(), 1);
    assert!(!fs::read_to_string(&note).unwrap().contains("daybook:section news"));
    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn second_run_changes_nothing() {
    let dir = temp_dir();
    let note = dir.join("2025-04-26.md");
    fs::write(&note, "Dear diary.\n").unwrap();
    let records = vec![play("A", "2025-04-26T08:00"), play("C", "2025-04-26T21:00")];

    let first = run(
        &plan(vec![FakeSource::music(records.clone())]),
        &options(&dir, false),
        &SilentProgress,
    )
    .await
    .unwrap();
    assert_eq!(first.inserted(), 2);
    assert_eq!(first.documents_written, 1);
    let after_first = fs::read_to_string(&note).unwrap();

    let second = run(
        &plan(vec![FakeSource::music(records)]),
        &options(&dir, false),
        &SilentProgress,
    )
    .await
    .unwrap();
    assert_eq!(second.inserted(), 0);
    assert_eq!(second.duplicates(), 2);
    assert_eq!(second.documents_written, 0);
    assert_eq!(fs::read_to_string(&note).unwrap(), after_first);
    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn dry_run_writes_and_consumes_nothing() {
    let dir = temp_dir();
    let note = dir.join("2025-04-26.md");
    fs::write(&note, "# Notes\n").unwrap();

    let source = FakeSource::music(vec![play("A", "2025-04-26T08:00")]);
    let consumed = source.consumed.clone();
    let summary = run(&plan(vec![source]), &options(&dir, true), &SilentProgress)
        .await
        .unwrap();

    assert!(summary.dry_run);
    assert_eq!(summary.inserted(), 1);
    assert_eq!(summary.documents_written, 1);
    assert!(summary.consumed.is_empty());
    assert_eq!(consumed.load(Ordering::SeqCst), 0);
    assert_eq!(fs::read_to_string(&note).unwrap(), "# Notes\n");
    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn export_is_consumed_only_when_every_record_landed() {
    let dir = temp_dir();
    fs::write(dir.join("2025-04-26.md"), "").unwrap();

    let complete = FakeSource::music(vec![play("A", "2025-04-26T08:00")]);
    let complete_count = complete.consumed.clone();
    let summary = run(&plan(vec![complete]), &options(&dir, false), &SilentProgress)
        .await
        .unwrap();
    assert_eq!(complete_count.load(Ordering::SeqCst), 1);
    assert_eq!(summary.consumed, vec![PathBuf::from("plays.csv")]);

    let orphaned = FakeSource::music(vec![
        play("B", "2025-04-26T09:00"),
        play("B", "2025-05-01T09:00"),
    ]);
    let orphaned_count = orphaned.consumed.clone();
    let summary = run(&plan(vec![orphaned]), &options(&dir, false), &SilentProgress)
        .await
        .unwrap();
    assert_eq!(orphaned_count.load(Ordering::SeqCst), 0);
    assert!(summary.consumed.is_empty());

    let mut rejecting = FakeSource::music(vec![play("C", "2025-04-26T10:00")]);
    rejecting.rejects = vec!["music row 3: bad date".into()];
    let rejecting_count = rejecting.consumed.clone();
    let summary = run(&plan(vec![rejecting]), &options(&dir, false), &SilentProgress)
        .await
        .unwrap();
    assert_eq!(summary.sources[0].rejected, 1);
    assert_eq!(rejecting_count.load(Ordering::SeqCst), 0);
    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn unreadable_directory_is_fatal() {
    let dir = temp_dir().join("missing");
    let result = run(&plan(Vec::new()), &options(&dir, false), &SilentProgress).await;
    assert!(matches!(result, Err(DaybookError::Discovery { .. })));
}

#[tokio::test]
async fn unreadable_note_does_not_affect_other_notes() {
    let dir = temp_dir();
    let bad = dir.join("2025-04-26.md");
    let good = dir.join("2025-04-27.md");
    let bad_bytes = [0xff, 0xfe, b'\n'];
    fs::write(&bad, bad_bytes).unwrap();
    fs::write(&good, "# Sunday\n").unwrap();

    let source = FakeSource::music(vec![
        play("A", "2025-04-26T08:00"),
        play("B", "2025-04-27T08:00"),
    ]);
    let consumed = source.consumed.clone();
    let summary = run(&plan(vec![source]), &options(&dir, false), &SilentProgress)
        .await
        .unwrap();

    let stats = &summary.sources[0];
    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.write_errors, 1);
    assert_eq!(summary.documents_written, 1);
    assert_eq!(fs::read(&bad).unwrap(), bad_bytes);
    assert!(fs::read_to_string(&good).unwrap().contains("**B** by B"));
    assert!(summary.consumed.is_empty());
    assert_eq!(consumed.load(Ordering::SeqCst), 0);
    let _ = fs::remove_dir_all(&dir);
}
