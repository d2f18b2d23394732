//! HTTP client and the live API adapters.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, instrument};
use url::Url;

use daybook_shared::{DaybookError, ParamValue, RecordKind, Result};

use super::{RunContext, SourceAdapter, SourceBatch, feeds};

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("Daybook/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// ApiClient
// ---------------------------------------------------------------------------

/// Shared client for the RapidAPI-style endpoints. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    key: String,
}

impl ApiClient {
    pub fn new(key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(timeout)
            .build()
            .map_err(|e| DaybookError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            key: key.into(),
        })
    }

    /// GET `endpoint` with `params` appended to its query and decode JSON.
    ///
    /// Non-2xx statuses, transport errors, timeouts and undecodable bodies
    /// all surface as [`DaybookError::Network`].
    #[instrument(skip_all, fields(host = %rapidapi_host(endpoint)))]
    pub async fn get_json(
        &self,
        endpoint: &Url,
        params: &BTreeMap<String, ParamValue>,
    ) -> Result<Value> {
        let mut url = endpoint.clone();
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in params {
                pairs.append_pair(name, &value.to_string());
            }
        }

        debug!(path = url.path(), "requesting");

        let response = self
            .client
            .get(url.as_str())
            .header("x-rapidapi-key", &self.key)
            .header("x-rapidapi-host", rapidapi_host(endpoint))
            .send()
            .await
            .map_err(|e| DaybookError::Network(format!("{}: {e}", endpoint.path())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DaybookError::Network(format!(
                "{}: HTTP {status}",
                endpoint.path()
            )));
        }

        response.json::<Value>().await.map_err(|e| {
            DaybookError::Network(format!("{}: invalid JSON body: {e}", endpoint.path()))
        })
    }
}

/// `host[:port]` of the endpoint, as RapidAPI expects it.
fn rapidapi_host(endpoint: &Url) -> String {
    let host = endpoint.host_str().unwrap_or_default();
    match endpoint.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

// ---------------------------------------------------------------------------
// ApiAdapter
// ---------------------------------------------------------------------------

/// Which response shape an endpoint returns.
#[derive(Debug, Clone, PartialEq)]
pub enum Feed {
    News,
    Weather { latitude: f64, longitude: f64 },
    Movies,
    Chart { name: String },
}

impl Feed {
    pub fn kind(&self) -> RecordKind {
        match self {
            Feed::News => RecordKind::News,
            Feed::Weather { .. } => RecordKind::Weather,
            Feed::Movies => RecordKind::Movies,
            Feed::Chart { .. } => RecordKind::Charts,
        }
    }
}

/// A live snapshot source backed by one endpoint.
#[derive(Debug, Clone)]
pub struct ApiAdapter {
    feed: Feed,
    client: ApiClient,
    endpoint: Url,
    params: BTreeMap<String, ParamValue>,
}

impl ApiAdapter {
    pub fn new(
        feed: Feed,
        client: ApiClient,
        endpoint: Url,
        params: BTreeMap<String, ParamValue>,
    ) -> Self {
        Self {
            feed,
            client,
            endpoint,
            params,
        }
    }

    /// Configured params plus coordinates for weather, unless the user
    /// already set either of them.
    fn request_params(&self) -> BTreeMap<String, ParamValue> {
        let mut params = self.params.clone();
        if let Feed::Weather {
            latitude,
            longitude,
        } = self.feed
        {
            if !params.contains_key("latitude") && !params.contains_key("longitude") {
                params.insert("latitude".into(), ParamValue::Float(latitude));
                params.insert("longitude".into(), ParamValue::Float(longitude));
            }
        }
        params
    }
}

#[async_trait]
impl SourceAdapter for ApiAdapter {
    fn name(&self) -> &str {
        self.feed.kind().tag()
    }

    fn kind(&self) -> RecordKind {
        self.feed.kind()
    }

    #[instrument(skip_all, fields(source = %self.feed.kind()))]
    async fn fetch(&self, ctx: &RunContext) -> Result<SourceBatch> {
        let json = self
            .client
            .get_json(&self.endpoint, &self.request_params())
            .await?;

        let date = ctx.run_date;
        let batch = match &self.feed {
            Feed::News => feeds::parse_news(&json, date),
            Feed::Weather { .. } => feeds::parse_weather(&json, date),
            Feed::Movies => feeds::parse_movies(&json, date),
            Feed::Chart { name } => feeds::parse_chart(&json, date, name),
        }?;

        info!(
            records = batch.records.len(),
            rejects = batch.rejects.len(),
            "fetched snapshot"
        );
        Ok(batch)
    }
}
