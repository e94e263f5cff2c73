//! Sync pipeline: canonical samples to the backend ingest endpoint.
//!
//! The storage mode can suppress transmission entirely. Otherwise one batch
//! request is sent and the backend's `inserted` count decides how many
//! samples are reported uploaded; the rest are reported skipped. The backend
//! does not say which samples it skipped, only how many.

use crate::sample::{CanonicalSample, Category};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::str::FromStr;
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

/// User-chosen policy for whether and how samples leave the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    #[default]
    Raw,
    Aggregated,
    LocalOnly,
}

impl StorageMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageMode::Raw => "raw",
            StorageMode::Aggregated => "aggregated",
            StorageMode::LocalOnly => "local_only",
        }
    }
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "raw" => Ok(StorageMode::Raw),
            "aggregated" => Ok(StorageMode::Aggregated),
            "local_only" => Ok(StorageMode::LocalOnly),
            other => Err(format!("unknown storage mode '{other}'")),
        }
    }
}

/// Counts reported by an upload. `uploaded + skipped` always equals the
/// number of samples handed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub uploaded: usize,
    pub skipped: usize,
}

impl SyncResult {
    pub fn total(&self) -> usize {
        self.uploaded + self.skipped
    }
}

/// Upload failures. The batch fails as a single unit.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("backend config error: {0}")]
    Config(String),
    #[error("backend network error: {0}")]
    Network(String),
    #[error("backend server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("backend serialization error: {0}")]
    Serialization(String),
}

/// One sample in the ingest wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSample {
    #[serde(rename = "type")]
    pub sample_type: Category,
    /// ISO-8601
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub data: Map<String, Value>,
}

fn iso(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl From<&CanonicalSample> for WireSample {
    fn from(sample: &CanonicalSample) -> Self {
        let mut data = Map::new();
        match sample {
            CanonicalSample::BloodGlucose { mg_dl, source, .. } => {
                data.insert("mg_dl".into(), json!(mg_dl));
                data.insert("source".into(), json!(source.as_str()));
            }
            CanonicalSample::HeartRate { bpm, .. } => {
                data.insert("bpm".into(), json!(bpm));
            }
            CanonicalSample::BloodPressure {
                systolic_mmhg,
                diastolic_mmhg,
                ..
            } => {
                data.insert("systolic_mmhg".into(), json!(systolic_mmhg));
                data.insert("diastolic_mmhg".into(), json!(diastolic_mmhg));
            }
            CanonicalSample::Steps {
                spm,
                interval_minutes,
                ..
            } => {
                data.insert("spm".into(), json!(spm));
                data.insert("interval_minutes".into(), json!(interval_minutes));
            }
            CanonicalSample::ExerciseMinutes { minutes, .. } => {
                data.insert("minutes".into(), json!(minutes));
            }
            CanonicalSample::Ecg {
                average_bpm,
                classification,
                sampling_hz,
                voltages,
                ..
            } => {
                if let Some(bpm) = average_bpm {
                    data.insert("average_bpm".into(), json!(bpm));
                }
                if let Some(label) = classification {
                    data.insert("classification".into(), json!(label));
                }
                if let Some(hz) = sampling_hz {
                    data.insert("sampling_hz".into(), json!(hz));
                }
                if let Some(points) = voltages {
                    let pairs: Vec<[f64; 2]> =
                        points.iter().map(|p| [p.offset_secs, p.voltage]).collect();
                    data.insert("voltages".into(), json!(pairs));
                }
            }
        }

        Self {
            sample_type: sample.category(),
            timestamp: iso(sample.timestamp()),
            end_time: sample.end_time().map(iso),
            data,
        }
    }
}

/// Body of `POST /samples`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Correlates this batch in logs and the `X-Request-Id` header
    #[serde(skip)]
    pub request_id: Uuid,
    pub user_id: String,
    pub storage_mode: StorageMode,
    pub samples: Vec<WireSample>,
}

/// Response of `POST /samples`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResponse {
    pub inserted: u64,
}

/// Destination for ingest batches.
#[async_trait]
pub trait IngestBackend: Send + Sync {
    /// Send one batch. Any non-2xx response is an error.
    async fn post_samples(&self, request: &IngestRequest) -> Result<IngestResponse, SyncError>;
}

#[async_trait]
impl<T: IngestBackend + ?Sized> IngestBackend for Box<T> {
    async fn post_samples(&self, request: &IngestRequest) -> Result<IngestResponse, SyncError> {
        (**self).post_samples(request).await
    }
}

/// Arguments of an upload as issued by the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub user_id: String,
    pub storage_mode: StorageMode,
    pub samples: Vec<CanonicalSample>,
}

/// Applies the storage policy and uploads in a single attempt.
pub struct SyncPipeline<T> {
    backend: T,
}

impl<T: IngestBackend> SyncPipeline<T> {
    pub fn new(backend: T) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &T {
        &self.backend
    }

    /// Upload `samples` for `user_id` under `storage_mode`.
    ///
    /// `LocalOnly` returns immediately without building a payload.
    pub async fn upload(
        &self,
        user_id: &str,
        storage_mode: StorageMode,
        samples: &[CanonicalSample],
    ) -> Result<SyncResult, SyncError> {
        let total = samples.len();

        if storage_mode == StorageMode::LocalOnly {
            tracing::debug!(total, "local_only storage, nothing sent");
            return Ok(SyncResult {
                uploaded: 0,
                skipped: total,
            });
        }

        let request = IngestRequest {
            request_id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            storage_mode,
            samples: samples.iter().map(WireSample::from).collect(),
        };

        let span = tracing::info_span!(
            "upload",
            sync_id = %request.request_id,
            %storage_mode,
            total
        );

        async {
            let response = self.backend.post_samples(&request).await?;

            let reported = usize::try_from(response.inserted).unwrap_or(usize::MAX);
            if reported > total {
                tracing::warn!(reported, total, "backend reported more inserts than sent, clamping");
            }
            let uploaded = reported.min(total);
            let result = SyncResult {
                uploaded,
                skipped: total - uploaded,
            };

            tracing::info!(uploaded = result.uploaded, skipped = result.skipped, "sync complete");
            Ok::<_, SyncError>(result)
        }
        .instrument(span)
        .await
    }

    /// [`upload`](Self::upload) taking the presentation-layer request shape.
    pub async fn upload_request(&self, request: &UploadRequest) -> Result<SyncResult, SyncError> {
        self.upload(&request.user_id, request.storage_mode, &request.samples)
            .await
    }
}
