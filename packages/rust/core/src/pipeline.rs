//! Run orchestration: sources → formatter → insertion engine → writer.
//!
//! 1. Discover the daily notes (fatal if the directory is unreadable)
//! 2. Fetch every enabled source; a failing source contributes nothing
//! 3. Render each record and route it to the note for its date
//! 4. Per note: read once, merge in emission order, commit once
//! 5. Consume the exports of sources whose records were all handled

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::FixedOffset;
use tracing::{debug, info, instrument, warn};

use daybook_discovery::{DiscoveryOptions, discover};
use daybook_markdown::{CanonicalBlock, render};
use daybook_shared::{DateKey, DaybookError, RecordKind, Result};
use daybook_sources::{DisabledSource, RunContext, SourceAdapter, SourcePlan};

use crate::merge::{MergeOutcome, merge};
use crate::writer::DocumentSnapshot;

/// Inputs of one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub target_dir: PathBuf,
    /// Extension of daily notes, without the dot.
    pub extension: String,
    pub recursive: bool,
    /// Date stamped on live snapshots.
    pub run_date: DateKey,
    pub utc_offset: FixedOffset,
    /// Do everything except writing notes and consuming exports.
    pub dry_run: bool,
}

impl RunOptions {
    pub fn discovery(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            extension: self.extension.clone(),
            recursive: self.recursive,
        }
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Per-source counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub name: String,
    pub kind: Option<RecordKind>,
    /// Records the source produced.
    pub records: usize,
    pub inserted: usize,
    pub duplicates: usize,
    /// Records whose date has no note.
    pub orphaned: usize,
    /// Unreadable export rows plus records the formatter refused.
    pub rejected: usize,
    /// Records whose note changed on disk before the commit.
    pub conflicts: usize,
    /// Records whose note could not be read or written.
    pub write_errors: usize,
}

impl SourceStats {
    fn new(adapter: &dyn SourceAdapter) -> Self {
        Self {
            name: adapter.name().to_string(),
            kind: Some(adapter.kind()),
            ..Default::default()
        }
    }

    /// Every record made it into a note, or was already there.
    pub fn fully_handled(&self) -> bool {
        self.rejected == 0 && self.inserted + self.duplicates == self.records
    }
}

/// A source that failed, or whose export could not be consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedSource {
    pub name: String,
    pub error: String,
}

/// Result of a run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub run_date: Option<DateKey>,
    pub dry_run: bool,
    /// Number of notes discovered.
    pub targets: usize,
    /// Sources that fetched successfully, in run order.
    pub sources: Vec<SourceStats>,
    pub disabled: Vec<DisabledSource>,
    pub failed: Vec<FailedSource>,
    /// Dates that had records but no note.
    pub missing_dates: BTreeSet<DateKey>,
    /// Notes written (or, in a dry run, that would have been).
    pub documents_written: usize,
    pub consumed: Vec<PathBuf>,
    pub consume_failures: Vec<FailedSource>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn inserted(&self) -> usize {
        self.sources.iter().map(|s| s.inserted).sum()
    }

    pub fn duplicates(&self) -> usize {
        self.sources.iter().map(|s| s.duplicates).sum()
    }

    pub fn orphaned(&self) -> usize {
        self.sources.iter().map(|s| s.orphaned).sum()
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each record is merged into its note.
    fn record_merged(&self, source: &str, outcome: MergeOutcome, current: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn record_merged(&self, _source: &str, _outcome: MergeOutcome, _current: usize, _total: usize) {}
    fn done(&self, _summary: &RunSummary) {}
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// A rendered record waiting for its note.
struct Pending {
    source: usize,
    block: CanonicalBlock,
}

/// Run every enabled source of `plan` against the notes in `options.target_dir`.
///
/// Only discovery failure is fatal; everything else is counted in the summary.
#[instrument(skip_all, fields(dir = %options.target_dir.display(), date = %options.run_date))]
pub async fn run(
    plan: &SourcePlan,
    options: &RunOptions,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let start = Instant::now();
    let mut summary = RunSummary {
        run_date: Some(options.run_date),
        dry_run: options.dry_run,
        disabled: plan.disabled.clone(),
        ..Default::default()
    };

    // --- Phase 1: Discovery ---
    progress.phase("Discovering notes");
    let targets = discover(&options.target_dir, &options.discovery())?;
    summary.targets = targets.len();

    // --- Phase 2: Fetch and render ---
    let ctx = RunContext {
        run_date: options.run_date,
        utc_offset: options.utc_offset,
    };
    let mut fetched: Vec<usize> = Vec::new();
    let mut pending: BTreeMap<DateKey, Vec<Pending>> = BTreeMap::new();

    for (index, adapter) in plan.enabled.iter().enumerate() {
        progress.phase(&format!("Fetching {}", adapter.name()));
        let batch = match adapter.fetch(&ctx).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!(source = adapter.name(), error = %e, "source failed, skipping");
                summary.failed.push(FailedSource {
                    name: adapter.name().to_string(),
                    error: e.to_string(),
                });
                continue;
            }
        };

        let source = summary.sources.len();
        let mut stats = SourceStats::new(adapter.as_ref());
        stats.records = batch.records.len();
        stats.rejected = batch.rejects.len();
        for reject in &batch.rejects {
            warn!(source = adapter.name(), "{reject}");
        }

        for record in &batch.records {
            let date = record.date();
            let Some(target) = targets.get(date) else {
                let skipped = DaybookError::NoTargetDocument { date };
                debug!(source = adapter.name(), "{skipped}, record dropped");
                stats.orphaned += 1;
                summary.missing_dates.insert(date);
                continue;
            };
            match render(record) {
                Ok(block) => pending
                    .entry(target.date)
                    .or_default()
                    .push(Pending { source, block }),
                Err(e) => {
                    warn!(source = adapter.name(), error = %e, "record skipped");
                    stats.rejected += 1;
                }
            }
        }

        summary.sources.push(stats);
        fetched.push(index);
    }

    // --- Phase 3: Merge and write ---
    progress.phase("Merging into notes");
    let total: usize = pending.values().map(Vec::len).sum();
    let mut current = 0;
    for (date, items) in &pending {
        let Some(target) = targets.get(*date) else {
            continue;
        };
        match merge_document(&target.path, items, options.dry_run) {
            Ok((outcomes, changed)) => {
                if changed {
                    summary.documents_written += 1;
                }
                for (item, outcome) in items.iter().zip(outcomes) {
                    let stats = &mut summary.sources[item.source];
                    match outcome {
                        MergeOutcome::Inserted => stats.inserted += 1,
                        MergeOutcome::SkippedDuplicate => stats.duplicates += 1,
                    }
                    current += 1;
                    progress.record_merged(&stats.name, outcome, current, total);
                }
            }
            Err(e) => {
                warn!(path = %target.path.display(), error = %e, "note left unchanged");
                let conflict = matches!(e, DaybookError::WriteConflict { .. });
                for item in items {
                    let stats = &mut summary.sources[item.source];
                    if conflict {
                        stats.conflicts += 1;
                    } else {
                        stats.write_errors += 1;
                    }
                }
                current += items.len();
            }
        }
    }

    // --- Phase 4: Consume exports ---
    if !options.dry_run {
        for (source, &index) in fetched.iter().enumerate() {
            if !summary.sources[source].fully_handled() {
                continue;
            }
            let adapter = &plan.enabled[index];
            match adapter.consume() {
                Ok(Some(path)) => summary.consumed.push(path),
                Ok(None) => {}
                Err(e) => {
                    warn!(source = adapter.name(), error = %e, "could not consume export");
                    summary.consume_failures.push(FailedSource {
                        name: adapter.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    summary.elapsed = start.elapsed();
    info!(
        targets = summary.targets,
        inserted = summary.inserted(),
        duplicates = summary.duplicates(),
        orphaned = summary.orphaned(),
        written = summary.documents_written,
        failed = summary.failed.len(),
        elapsed_ms = summary.elapsed.as_millis(),
        "run completed"
    );
    progress.done(&summary);
    Ok(summary)
}

/// Merge every pending block into one note, committing once if anything
/// was inserted. Returns the per-block outcomes and whether the note changed.
#[instrument(skip_all, fields(path = %path.display(), blocks = items.len()))]
fn merge_document(
    path: &Path,
    items: &[Pending],
    dry_run: bool,
) -> Result<(Vec<MergeOutcome>, bool)> {
    let snapshot = DocumentSnapshot::read(path)?;
    let mut text = snapshot.text().to_string();
    let mut outcomes = Vec::with_capacity(items.len());

    for item in items {
        let (merged, outcome) = merge(&text, &item.block);
        text = merged;
        outcomes.push(outcome);
    }

    let changed = outcomes.contains(&MergeOutcome::Inserted);
    if changed && !dry_run {
        snapshot.commit(&text)?;
    }
    debug!(changed, dry_run, "note merged");
    Ok((outcomes, changed))
}
