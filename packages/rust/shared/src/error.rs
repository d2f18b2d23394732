//! Error types for Daybook.
//!
//! Library crates use [`DaybookError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use crate::record::DateKey;

/// Top-level error type for all Daybook operations.
#[derive(Debug, thiserror::Error)]
pub enum DaybookError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while a source was fetching.
    #[error("fetch error: {0}")]
    Network(String),

    /// A single record in a source export or API response could not be read.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A record carried a payload the formatter cannot render.
    #[error("format error: {0}")]
    Format(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The target directory could not be listed. Fatal for a run.
    #[error("cannot read target directory {path:?}: {source}")]
    Discovery {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The document changed on disk between read and write.
    #[error("write conflict: {path:?} changed since it was read")]
    WriteConflict { path: PathBuf },

    /// No target document exists for a record's date.
    #[error("no target document for {date}")]
    NoTargetDocument { date: DateKey },

    /// Data validation error (invalid value, bad format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DaybookError>;

impl DaybookError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
