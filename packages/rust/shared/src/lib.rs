//! Shared types, error model, and configuration for Daybook.
//!
//! This crate is the foundation depended on by all other Daybook crates.
//! It provides:
//! - [`DaybookError`] — the unified error type
//! - The record model ([`ContentRecord`], [`RecordKind`], [`DateKey`], [`IdentityMarker`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod record;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiConfig, AppConfig, ChartsConfig, EndpointConfig, ExportConfig, ParamValue,
    WeatherConfig, config_dir, config_file_path, expand_tilde, init_config, load_config,
    load_config_from, parse_endpoint, parse_utc_offset,
};
pub use error::{DaybookError, Result};
pub use record::{
    ChartEntry, ChartPosition, ContentRecord, DateKey, ForecastDay, Headline, IdentityMarker,
    Movie, MovieListItem, MusicPlay, NaturalKey, NewsItem, ORDER_TIMESTAMP_FORMAT, RecordKind,
    Review, StreamingView, WeatherReport, slugify,
};
