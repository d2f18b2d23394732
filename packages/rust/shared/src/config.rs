//! Application configuration for Daybook.
//!
//! User config lives at `~/.daybook/daybook.toml`; `--config` overrides the path.
//! Every section and field is optional: a missing value disables only the
//! source that needs it, never the whole run.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::format::{self, Parsed, StrftimeItems};
use chrono::{FixedOffset, Local};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DaybookError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "daybook.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".daybook";

/// Env var consulted for the shared API key when `[api].key` is absent.
pub const DEFAULT_API_KEY_ENV: &str = "DAYBOOK_API_KEY";

/// Commented template written by `daybook config init`.
const CONFIG_TEMPLATE: &str = r#"# Daybook configuration.
# Any missing value disables only the source that needs it.

# Directory holding the daily notes (YYYY-MM-DD.md).
target_dir = "~/Journal/daily"
extension = "md"
recursive = false

# Offset used to turn epoch timestamps in exports into local dates.
# utc_offset = "-05:00"

[api]
# Shared key for every API source. Without it, all API sources are disabled.
# key = "..."
key_env = "DAYBOOK_API_KEY"
timeout_secs = 15

# [news]
# endpoint = "https://real-time-news-data.p.rapidapi.com/top-headlines"
# params = { country = "US", lang = "en", limit = 5 }

# [weather]
# endpoint = "https://weatherkit.p.rapidapi.com/api/v1/weather"
# latitude = 40.71
# longitude = -74.0

# [movies]
# endpoint = "https://box-office.p.rapidapi.com/weekend"

# [charts]
# endpoint = "https://billboard-api.p.rapidapi.com/hot-100"
# name = "Billboard Hot 100"

# [music]
# export_path = "~/Downloads/Apple Music - Play History Daily Tracks.csv"
# delete_after_import = false

# [streaming]
# export_path = "~/Downloads/NetflixViewingHistory.csv"
# delete_after_import = false

# [reviews]
# export_path = "~/Downloads/yelp_reviews.html"
# delete_after_import = false
"#;

// ---------------------------------------------------------------------------
// Config structs (matching daybook.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory containing the daily notes.
    #[serde(default)]
    pub target_dir: Option<String>,

    /// Extension of daily notes, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Also look for notes in subdirectories of `target_dir`.
    #[serde(default)]
    pub recursive: bool,

    /// Fixed UTC offset such as `+02:00`; defaults to the local offset.
    #[serde(default)]
    pub utc_offset: Option<String>,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub news: Option<EndpointConfig>,

    #[serde(default)]
    pub weather: Option<WeatherConfig>,

    #[serde(default)]
    pub movies: Option<EndpointConfig>,

    #[serde(default)]
    pub charts: Option<ChartsConfig>,

    #[serde(default)]
    pub music: Option<ExportConfig>,

    #[serde(default)]
    pub streaming: Option<ExportConfig>,

    #[serde(default)]
    pub reviews: Option<ExportConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target_dir: None,
            extension: default_extension(),
            recursive: false,
            utc_offset: None,
            api: ApiConfig::default(),
            news: None,
            weather: None,
            movies: None,
            charts: None,
            music: None,
            streaming: None,
            reviews: None,
        }
    }
}

fn default_extension() -> String {
    "md".into()
}

/// `[api]` section shared by all API-backed sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// The key itself. Prefer `key_env` to keep secrets out of the file.
    #[serde(default)]
    pub key: Option<String>,

    /// Name of the env var holding the key.
    #[serde(default = "default_api_key_env")]
    pub key_env: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: None,
            key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.into()
}
fn default_timeout_secs() -> u64 {
    15
}

/// `[news]` / `[movies]`: a plain endpoint with query params.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

/// `[weather]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub latitude: Option<f64>,

    #[serde(default)]
    pub longitude: Option<f64>,

    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

/// `[charts]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartsConfig {
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Display name of the chart; also part of its identity.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

/// `[music]` / `[streaming]` / `[reviews]`: a local export file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub export_path: Option<String>,

    /// Remove the export once every record from it has been handled.
    #[serde(default)]
    pub delete_after_import: bool,
}

/// A scalar query parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Float(x) => write!(f, "{x}"),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolved values
// ---------------------------------------------------------------------------

impl AppConfig {
    /// The target directory with `~` expanded. Required for a run.
    pub fn target_dir(&self) -> Result<PathBuf> {
        let raw = self
            .target_dir
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| DaybookError::config("target_dir is not set"))?;
        Ok(expand_tilde(raw))
    }

    /// The shared API key, from the file or from the configured env var.
    pub fn api_key(&self) -> Option<String> {
        if let Some(key) = self.api.key.as_deref().filter(|k| !k.is_empty()) {
            return Some(key.to_string());
        }
        std::env::var(&self.api.key_env)
            .ok()
            .filter(|k| !k.is_empty())
    }

    /// Offset applied to epoch timestamps in exports.
    pub fn utc_offset(&self) -> Result<FixedOffset> {
        match self.utc_offset.as_deref() {
            Some(raw) => parse_utc_offset(raw),
            None => Ok(*Local::now().offset()),
        }
    }
}

/// Parse `+HH:MM` / `-HH:MM` / `Z`.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0)
            .ok_or_else(|| DaybookError::config("invalid utc_offset"));
    }
    let mut parsed = Parsed::new();
    format::parse(&mut parsed, raw, StrftimeItems::new("%:z"))
        .and_then(|()| parsed.to_fixed_offset())
        .map_err(|e| DaybookError::config(format!("invalid utc_offset {raw:?}: {e}")))
}

/// Validate and parse a configured endpoint.
pub fn parse_endpoint(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| DaybookError::config(format!("invalid endpoint '{raw}': {e}")))?;
    if url.host_str().is_none() {
        return Err(DaybookError::config(format!("endpoint has no host: {raw}")));
    }
    Ok(url)
}

/// Expand a leading `~/` to the home directory.
pub fn expand_tilde(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.daybook/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DaybookError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.daybook/daybook.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DaybookError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DaybookError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write the commented template.
/// Returns the path to the created file. An existing file is left alone.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DaybookError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        tracing::info!(?path, "config file already exists");
        return Ok(path);
    }

    std::fs::write(&path, CONFIG_TEMPLATE).map_err(|e| DaybookError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
