//! Core run logic for Daybook.
//!
//! This crate ties together discovery, the sources, rendering and the
//! insertion engine into one end-to-end run (see [`pipeline::run`]).

pub mod merge;
pub mod pipeline;
pub mod writer;

pub use merge::{MergeOutcome, merge};
pub use pipeline::{
    FailedSource, ProgressReporter, RunOptions, RunSummary, SilentProgress, SourceStats, run,
};
pub use writer::DocumentSnapshot;
