//! Local ingest server for development.
//!
//! Speaks the backend wire contract so the sync pipeline can be exercised
//! end to end without the real backend. Samples are kept in memory only.
//!
//! # Endpoints
//!
//! ```text
//! GET  /health          liveness
//! GET  /api/            connection probe
//! POST /api/samples     batch ingest → {inserted}
//! ```

use crate::connector::normalize::parse_instant;
use crate::sync::{IngestRequest, IngestResponse, StorageMode, WireSample};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};

/// Samples stamped further than this into the future are rejected.
const FUTURE_TOLERANCE_MINUTES: i64 = 5;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
}

impl ServerConfig {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

/// One accepted sample.
#[derive(Debug, Clone, Serialize)]
pub struct StoredSample {
    pub user_id: String,
    pub storage_mode: StorageMode,
    pub received_at: DateTime<Utc>,
    pub sample: WireSample,
}

/// In-memory sample store shared by the handlers.
#[derive(Debug, Default)]
pub struct SampleStore {
    samples: RwLock<Vec<StoredSample>>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.samples.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Stored samples for one user.
    pub async fn for_user(&self, user_id: &str) -> Vec<StoredSample> {
        self.samples
            .read()
            .await
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: String) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error,
            code: code.to_string(),
        }),
    )
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/
async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "vital-sync dev ingest" }))
}

/// POST /api/samples
async fn ingest(
    State(store): State<Arc<SampleStore>>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    if request.storage_mode == StorageMode::LocalOnly {
        return Ok(Json(IngestResponse { inserted: 0 }));
    }

    let now = Utc::now();
    let horizon = now + Duration::minutes(FUTURE_TOLERANCE_MINUTES);

    for sample in &request.samples {
        let timestamp = parse_instant(&sample.timestamp).ok_or_else(|| {
            api_error(
                StatusCode::BAD_REQUEST,
                "INVALID_TIMESTAMP",
                format!("Invalid sample timestamp '{}'", sample.timestamp),
            )
        })?;
        if timestamp > horizon {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "FUTURE_TIMESTAMP",
                "Sample timestamp is in the future".to_string(),
            ));
        }
    }

    let inserted = request.samples.len();
    let mut samples = store.samples.write().await;
    samples.extend(request.samples.into_iter().map(|sample| StoredSample {
        user_id: request.user_id.clone(),
        storage_mode: request.storage_mode,
        received_at: now,
        sample,
    }));

    tracing::info!(
        user_id = %request.user_id,
        storage_mode = %request.storage_mode,
        inserted,
        "ingested samples"
    );

    Ok(Json(IngestResponse {
        inserted: inserted as u64,
    }))
}

/// Build the router over `store`.
pub fn router(store: Arc<SampleStore>) -> Router {
    let api = Router::new()
        .route("/", get(root))
        .route("/samples", post(ingest));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(store)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
    store: Arc<SampleStore>,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = router(store);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Dev ingest server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
