//! HTTP client for the vitals backend.
//!
//! Implements [`IngestBackend`] over `POST {base}/samples` and exposes the
//! read-side endpoints the presentation layer consumes (24h dashboard and the
//! correlation trigger). Correlation itself runs on the backend.

use crate::sync::{IngestBackend, IngestRequest, IngestResponse, SyncError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Default backend base URL (includes the `/api` prefix).
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8001/api";

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL including any path prefix
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Optional bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            token: None,
        }
    }
}

impl BackendConfig {
    /// Create a configuration for `base_url` with default timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Get the health probe URL.
    pub fn root_url(&self) -> String {
        format!("{}/", self.base())
    }

    /// Get the ingest endpoint URL.
    pub fn samples_url(&self) -> String {
        format!("{}/samples", self.base())
    }

    /// Get the 24h dashboard URL.
    pub fn dashboard_url(&self) -> String {
        format!("{}/dashboard/24h", self.base())
    }

    /// Get the correlation trigger URL.
    pub fn correlation_url(&self) -> String {
        format!("{}/correlation/run", self.base())
    }
}

/// Activity series the backend correlates glucose against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityMetric {
    #[default]
    StepsPerMin,
    ExerciseMinutes,
}

impl ActivityMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityMetric::StepsPerMin => "steps_per_min",
            ActivityMetric::ExerciseMinutes => "exercise_minutes",
        }
    }
}

impl FromStr for ActivityMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "steps_per_min" | "steps" => Ok(ActivityMetric::StepsPerMin),
            "exercise_minutes" | "exercise" => Ok(ActivityMetric::ExerciseMinutes),
            other => Err(format!("unknown activity metric '{other}'")),
        }
    }
}

/// Window bounds as reported by the dashboard endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardWindow {
    pub start: String,
    pub end: String,
}

/// One glucose spike paired with an activity dip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationEvent {
    pub spike: serde_json::Value,
    pub activity_dip: serde_json::Value,
}

/// Response of `GET {base}/dashboard/24h`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub window: DashboardWindow,
    /// Per-series points keyed by series name
    pub series: serde_json::Map<String, serde_json::Value>,
    pub correlations: Vec<CorrelationEvent>,
}

impl Dashboard {
    /// Number of points in a named series.
    pub fn series_len(&self, name: &str) -> usize {
        self.series
            .get(name)
            .and_then(|v| v.as_array())
            .map(|points| points.len())
            .unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
struct CorrelationRunResponse {
    events_created: u64,
}

/// reqwest-backed backend client.
pub struct HttpBackend {
    config: BackendConfig,
    client: reqwest::Client,
    client_id: String,
}

impl HttpBackend {
    /// Create a new backend client.
    pub fn new(config: BackendConfig) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncError::Config(format!("failed to create HTTP client: {e}")))?;

        // Client ID from hostname + instance
        let hostname: String = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string())
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();
        let client_id = format!(
            "vital-sync-{}-{}",
            hostname,
            &uuid::Uuid::new_v4().simple().to_string()[..8]
        );

        Ok(Self {
            config,
            client,
            client_id,
        })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Get the client ID sent with every request.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("X-Client-Id", self.client_id.as_str());
        match &self.config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and decode a JSON body, mapping non-2xx to `SyncError::Server`.
    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, SyncError> {
        let response = builder
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SyncError::Server {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| SyncError::Serialization(e.to_string()))
    }

    /// Test connection to the backend.
    pub async fn test_connection(&self) -> Result<bool, SyncError> {
        let response = self
            .request(reqwest::Method::GET, self.config.root_url())
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }

    /// Fetch the rolling 24h dashboard for `user_id`.
    pub async fn dashboard_24h(
        &self,
        user_id: &str,
        metric: ActivityMetric,
    ) -> Result<Dashboard, SyncError> {
        let builder = self
            .request(reqwest::Method::GET, self.config.dashboard_url())
            .query(&[("user_id", user_id), ("activity_metric", metric.as_str())]);
        self.send_json(builder).await
    }

    /// Ask the backend to run correlation over the last 24h; returns events created.
    pub async fn run_correlation(
        &self,
        user_id: &str,
        metric: ActivityMetric,
    ) -> Result<u64, SyncError> {
        let builder = self
            .request(reqwest::Method::POST, self.config.correlation_url())
            .query(&[("user_id", user_id), ("activity_metric", metric.as_str())]);
        let response: CorrelationRunResponse = self.send_json(builder).await?;
        Ok(response.events_created)
    }
}

#[async_trait]
impl IngestBackend for HttpBackend {
    async fn post_samples(&self, request: &IngestRequest) -> Result<IngestResponse, SyncError> {
        let builder = self
            .request(reqwest::Method::POST, self.config.samples_url())
            .header("X-Request-Id", request.request_id.to_string())
            .json(request);
        self.send_json(builder).await
    }
}
