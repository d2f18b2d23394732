//! Which sources run, decided from the config before anything is fetched.
//!
//! A source whose settings are missing is disabled with a reason. That is a
//! skipped capability, not a failure.

use std::time::Duration;

use tracing::{debug, warn};

use daybook_shared::{AppConfig, ExportConfig, RecordKind, expand_tilde, parse_endpoint};

use crate::adapters::{
    ApiAdapter, ApiClient, ExportFile, Feed, MusicAdapter, ReviewsAdapter, SourceAdapter,
    StreamingAdapter,
};

/// Chart name used when `[charts].name` is absent.
const DEFAULT_CHART_NAME: &str = "Chart";

/// A source that will not run, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisabledSource {
    pub kind: RecordKind,
    pub reason: String,
}

/// Enabled adapters in section order, plus the disabled ones.
#[derive(Default)]
pub struct SourcePlan {
    pub enabled: Vec<Box<dyn SourceAdapter>>,
    pub disabled: Vec<DisabledSource>,
}

impl SourcePlan {
    /// Build the plan from config. `only`, when non-empty, restricts the run
    /// to the listed sources.
    pub fn from_config(config: &AppConfig, only: &[RecordKind]) -> Self {
        let mut plan = SourcePlan::default();
        let api = api_client(config);

        for kind in RecordKind::ALL {
            if !only.is_empty() && !only.contains(&kind) {
                plan.disable(kind, "not selected with --only");
                continue;
            }
            let built = if kind.is_history() {
                export_adapter(config, kind)
            } else {
                api.clone().and_then(|client| api_adapter(config, kind, client))
            };
            match built {
                Ok(adapter) => {
                    debug!(source = %kind, "source enabled");
                    plan.enabled.push(adapter);
                }
                Err(reason) => plan.disable(kind, reason),
            }
        }
        plan
    }

    fn disable(&mut self, kind: RecordKind, reason: impl Into<String>) {
        let reason = reason.into();
        debug!(source = %kind, %reason, "source disabled");
        self.disabled.push(DisabledSource { kind, reason });
    }
}

type Built = std::result::Result<Box<dyn SourceAdapter>, String>;

fn api_client(config: &AppConfig) -> std::result::Result<ApiClient, String> {
    let key = config.api_key().ok_or_else(|| {
        format!(
            "no API key ([api].key or ${} is unset)",
            config.api.key_env
        )
    })?;
    ApiClient::new(key, Duration::from_secs(config.api.timeout_secs)).map_err(|e| {
        warn!(error = %e, "HTTP client unavailable");
        e.to_string()
    })
}

fn api_adapter(config: &AppConfig, kind: RecordKind, client: ApiClient) -> Built {
    let (endpoint, params, feed) = match kind {
        RecordKind::News => {
            let section = config.news.as_ref().ok_or("no [news] section")?;
            (section.endpoint.as_deref(), section.params.clone(), Feed::News)
        }
        RecordKind::Movies => {
            let section = config.movies.as_ref().ok_or("no [movies] section")?;
            (section.endpoint.as_deref(), section.params.clone(), Feed::Movies)
        }
        RecordKind::Weather => {
            let section = config.weather.as_ref().ok_or("no [weather] section")?;
            let (Some(latitude), Some(longitude)) = (section.latitude, section.longitude) else {
                return Err("weather needs latitude and longitude".into());
            };
            let feed = Feed::Weather {
                latitude,
                longitude,
            };
            (section.endpoint.as_deref(), section.params.clone(), feed)
        }
        RecordKind::Charts => {
            let section = config.charts.as_ref().ok_or("no [charts] section")?;
            let name = section
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .unwrap_or(DEFAULT_CHART_NAME);
            let feed = Feed::Chart {
                name: name.to_string(),
            };
            (section.endpoint.as_deref(), section.params.clone(), feed)
        }
        history => return Err(format!("{history} is not an API source")),
    };

    let raw = endpoint
        .filter(|e| !e.trim().is_empty())
        .ok_or("no endpoint configured")?;
    let endpoint = parse_endpoint(raw).map_err(|e| e.to_string())?;
    let adapter: Box<dyn SourceAdapter> =
        Box::new(ApiAdapter::new(feed, client, endpoint, params));
    Ok(adapter)
}

fn export_adapter(config: &AppConfig, kind: RecordKind) -> Built {
    let section: Option<&ExportConfig> = match kind {
        RecordKind::Music => config.music.as_ref(),
        RecordKind::Streaming => config.streaming.as_ref(),
        RecordKind::Reviews => config.reviews.as_ref(),
        live => return Err(format!("{live} is not an export source")),
    };
    let section = section.ok_or_else(|| format!("no [{kind}] section"))?;
    let path = section
        .export_path
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .ok_or("no export_path configured")?;
    let export = ExportFile::new(expand_tilde(path), section.delete_after_import);

    let adapter: Box<dyn SourceAdapter> = match kind {
        RecordKind::Music => Box::new(MusicAdapter::new(export)),
        RecordKind::Streaming => Box::new(StreamingAdapter::new(export)),
        _ => Box::new(ReviewsAdapter::new(export)),
    };
    Ok(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use daybook_shared::{EndpointConfig, WeatherConfig};

    fn kinds(plan: &SourcePlan) -> Vec<RecordKind> {
        plan.enabled.iter().map(|a| a.kind()).collect()
    }

    fn reason(plan: &SourcePlan, kind: RecordKind) -> String {
        plan.disabled
            .iter()
            .find(|d| d.kind == kind)
            .map(|d| d.reason.clone())
            .unwrap_or_default()
    }

    fn keyed_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.api.key = Some("k".into());
        config
    }

    #[test]
    fn empty_config_disables_everything() {
        let mut config = AppConfig::default();
        config.api.key_env = "DAYBOOK_TEST_KEY_THAT_IS_NEVER_SET".into();
        let plan = SourcePlan::from_config(&config, &[]);
        assert!(plan.enabled.is_empty());
        assert_eq!(plan.disabled.len(), RecordKind::ALL.len());
        assert!(reason(&plan, RecordKind::News).contains("no API key"));
        assert!(reason(&plan, RecordKind::Music).contains("[music]"));
    }

    #[test]
    fn missing_key_disables_only_api_sources() {
        let mut config = AppConfig::default();
        config.api.key_env = "DAYBOOK_TEST_KEY_THAT_IS_NEVER_SET".into();
        config.news = Some(EndpointConfig {
            endpoint: Some("https://news.example.com/top".into()),
            ..Default::default()
        });
        config.music = Some(ExportConfig {
            export_path: Some("/tmp/plays.csv".into()),
            delete_after_import: false,
        });
        let plan = SourcePlan::from_config(&config, &[]);
        assert_eq!(kinds(&plan), vec![RecordKind::Music]);
        assert!(reason(&plan, RecordKind::News).contains("no API key"));
    }

    #[test]
    fn weather_needs_coordinates() {
        let mut config = keyed_config();
        config.weather = Some(WeatherConfig {
            endpoint: Some("https://weather.example.com/api".into()),
            latitude: Some(40.7),
            ..Default::default()
        });
        let plan = SourcePlan::from_config(&config, &[]);
        assert!(kinds(&plan).is_empty());
        assert!(reason(&plan, RecordKind::Weather).contains("latitude"));
    }

    #[test]
    fn bad_endpoint_disables_source() {
        let mut config = keyed_config();
        config.movies = Some(EndpointConfig {
            endpoint: Some("not a url".into()),
            ..Default::default()
        });
        let plan = SourcePlan::from_config(&config, &[]);
        assert!(reason(&plan, RecordKind::Movies).contains("invalid endpoint"));
    }

    #[test]
    fn only_restricts_sources() {
        let mut config = keyed_config();
        config.news = Some(EndpointConfig {
            endpoint: Some("https://news.example.com/top".into()),
            ..Default::default()
        });
        config.movies = Some(EndpointConfig {
            endpoint: Some("https://movies.example.com/weekend".into()),
            ..Default::default()
        });
        let plan = SourcePlan::from_config(&config, &[RecordKind::Movies]);
        assert_eq!(kinds(&plan), vec![RecordKind::Movies]);
        assert!(reason(&plan, RecordKind::News).contains("--only"));
    }
}
