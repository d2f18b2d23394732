//! Source adapter trait and the built-in adapters.
//!
//! An adapter produces the records of one source for one run. Live adapters
//! call a JSON API; history adapters read an export file the user downloaded.

mod export;
mod feeds;
mod http;
mod music;
mod reviews;
mod streaming;

use async_trait::async_trait;
use chrono::FixedOffset;

use daybook_shared::{ContentRecord, DateKey, RecordKind, Result};

pub use export::ExportFile;
pub use http::{ApiAdapter, ApiClient, Feed};
pub use music::MusicAdapter;
pub use reviews::ReviewsAdapter;
pub use streaming::StreamingAdapter;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Per-run inputs shared by every adapter.
#[derive(Debug, Clone, Copy)]
pub struct RunContext {
    /// Date stamped on live snapshots.
    pub run_date: DateKey,
    /// Offset used to read epoch and zoned timestamps as local wall-clock time.
    pub utc_offset: FixedOffset,
}

/// What one adapter produced for a run.
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    pub records: Vec<ContentRecord>,
    /// One message per row or item that could not be read.
    pub rejects: Vec<String>,
}

impl SourceBatch {
    pub(crate) fn reject(&mut self, message: impl Into<String>) {
        self.rejects.push(message.into());
    }
}

/// A source of records.
///
/// `fetch` failing means the source contributes nothing this run; the
/// orchestrator reports it and moves on.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Source name for tracing and the run summary.
    fn name(&self) -> &str;

    fn kind(&self) -> RecordKind;

    /// Produce this run's records.
    async fn fetch(&self, ctx: &RunContext) -> Result<SourceBatch>;

    /// Post-consumption step, called only after every record from the last
    /// `fetch` was inserted or recognized as a duplicate. Returns the export
    /// that was removed, if any.
    fn consume(&self) -> Result<Option<std::path::PathBuf>> {
        Ok(None)
    }
}
