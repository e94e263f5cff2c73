//! vital-sync - health sample acquisition, normalization and backend sync.
//!
//! Reads a rolling window of health records from a platform health store,
//! normalizes the vendor shapes into one canonical sample model, and uploads
//! them to a vitals backend according to the user's storage mode.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          vital-sync                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐         │
//! │  │  Platform   │──▶│  Connector  │──▶│  Canonical  │         │
//! │  │   Bridge    │   │ (A: HK/B:HC)│   │   Samples   │         │
//! │  └─────────────┘   └─────────────┘   └─────────────┘         │
//! │                                             │                │
//! │                                             ▼                │
//! │                    ┌─────────────┐   ┌─────────────┐         │
//! │                    │   Backend   │◀──│    Sync     │         │
//! │                    │   (HTTP)    │   │  Pipeline   │         │
//! │                    └─────────────┘   └─────────────┘         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use vital_sync::{
//!     backend::{BackendConfig, HttpBackend},
//!     connector::{for_platform, NoopBridge, PlatformKind},
//!     sample::ReadWindow,
//!     service::VitalsService,
//!     sync::StorageMode,
//! };
//!
//! # async fn run() -> anyhow::Result<()> {
//! let connector = for_platform(PlatformKind::HealthKit, NoopBridge);
//! let backend = HttpBackend::new(BackendConfig::default())?;
//! let service = VitalsService::new(connector, backend);
//!
//! let window = ReadWindow::last_hours(chrono::Utc::now(), 24)?;
//! let outcome = service.sync_window("u_123", StorageMode::Raw, &window).await;
//! println!("read {} samples", outcome.read.samples.len());
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod connector;
pub mod sample;
pub mod service;
pub mod summary;
pub mod sync;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use backend::{ActivityMetric, BackendConfig, Dashboard, HttpBackend};
pub use config::{Config, ConfigError};
pub use connector::{
    for_platform, HealthConnector, PermissionOutcome, PlatformBridge, PlatformKind, ReadOutcome,
};
pub use sample::{CanonicalSample, Category, ConnectorStatus, ReadWindow, WindowError};
pub use service::{VitalsService, WindowSync};
pub use summary::{summarize, CategorySummary};
pub use sync::{StorageMode, SyncError, SyncPipeline, SyncResult, UploadRequest};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
