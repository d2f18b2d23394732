//! Source adapters: where the records of a run come from.
//!
//! This crate provides:
//! - [`SourceAdapter`] — the capability every source implements
//! - [`adapters`] — live API sources and history export readers
//! - [`SourcePlan`] — config gating that decides which sources run

pub mod adapters;
pub mod plan;

pub use adapters::{
    ApiAdapter, ApiClient, ExportFile, Feed, MusicAdapter, ReviewsAdapter, RunContext,
    SourceAdapter, SourceBatch, StreamingAdapter,
};
pub use plan::{DisabledSource, SourcePlan};
