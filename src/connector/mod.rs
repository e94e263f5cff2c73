//! Platform connectors.
//!
//! A connector wraps one platform's health-data framework behind a uniform
//! contract: availability probe, permission request, and windowed batch read.
//! Each variant owns the vendor-specific mapping from raw records to
//! [`CanonicalSample`]s; the read orchestration is shared.

pub mod bridge;
pub mod fixture;
pub mod health_connect;
pub mod healthkit;
pub mod noop;
pub mod normalize;

pub use bridge::{BridgeError, PlatformBridge, QueryOptions, SortOrder};
pub use fixture::FixtureBridge;
pub use health_connect::HealthConnectAdapter;
pub use healthkit::HealthKitAdapter;
pub use noop::NoopBridge;

use crate::sample::{CanonicalSample, Category, ConnectorStatus, ReadWindow};
use async_trait::async_trait;
use futures_util::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::str::FromStr;

/// The two supported health platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformKind {
    /// Apple HealthKit (connector A)
    HealthKit,
    /// Android Health Connect (connector B)
    HealthConnect,
}

impl PlatformKind {
    /// The platform native to the compile target, if any.
    pub fn detect() -> Option<Self> {
        if cfg!(any(target_os = "ios", target_os = "macos")) {
            Some(PlatformKind::HealthKit)
        } else if cfg!(target_os = "android") {
            Some(PlatformKind::HealthConnect)
        } else {
            None
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PlatformKind::HealthKit => "Apple HealthKit",
            PlatformKind::HealthConnect => "Health Connect",
        }
    }
}

impl FromStr for PlatformKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "healthkit" | "apple" | "ios" => Ok(PlatformKind::HealthKit),
            "health-connect" | "healthconnect" | "android" => Ok(PlatformKind::HealthConnect),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}

/// Outcome of a permission request. Never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionOutcome {
    pub granted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub granted_categories: Vec<Category>,
}

impl PermissionOutcome {
    fn denied(reason: impl Into<String>) -> Self {
        Self {
            granted: false,
            reason: Some(reason.into()),
            granted_categories: Vec::new(),
        }
    }
}

/// Outcome of a windowed read.
///
/// When `unavailable` is set the platform could not be read at all and
/// `samples` is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadOutcome {
    pub samples: Vec<CanonicalSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable: Option<String>,
}

impl ReadOutcome {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            samples: Vec::new(),
            unavailable: Some(reason.into()),
        }
    }

    pub fn is_available(&self) -> bool {
        self.unavailable.is_none()
    }
}

/// Uniform contract over a platform health-data source.
#[async_trait]
pub trait HealthConnector: Send + Sync {
    fn platform(&self) -> PlatformKind;

    /// Probe the platform. Absence is reported as `Unavailable`, never as an error.
    async fn check_availability(&self) -> ConnectorStatus;

    /// Request read access to all categories in one batch.
    async fn request_permissions(&self) -> PermissionOutcome;

    /// Read every category over `window`, one concurrent query per category.
    async fn read_window(&self, window: &ReadWindow) -> ReadOutcome;
}

/// Vendor-specific mapping from raw records to canonical samples.
pub trait VendorAdapter: Send + Sync {
    fn platform(&self) -> PlatformKind;

    /// Normalize one record. `None` means the record is dropped.
    fn normalize(&self, category: Category, record: &Value) -> Option<CanonicalSample>;
}

/// A connector built from a bridge and a vendor adapter.
pub struct Connector<B, A> {
    bridge: B,
    adapter: A,
    options: QueryOptions,
}

/// Connector A.
pub type HealthKitConnector<B> = Connector<B, HealthKitAdapter>;

/// Connector B.
pub type HealthConnectConnector<B> = Connector<B, HealthConnectAdapter>;

impl<B: PlatformBridge, A: VendorAdapter> Connector<B, A> {
    pub fn new(bridge: B, adapter: A) -> Self {
        Self {
            bridge,
            adapter,
            options: QueryOptions::default(),
        }
    }

    /// Override the per-category query bounds.
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    fn normalize_all(&self, category: Category, records: &[Value]) -> Vec<CanonicalSample> {
        let samples: Vec<CanonicalSample> = records
            .iter()
            .filter_map(|record| self.adapter.normalize(category, record))
            .collect();

        let dropped = records.len() - samples.len();
        if dropped > 0 {
            tracing::debug!(%category, dropped, kept = samples.len(), "skipped unusable records");
        }
        samples
    }
}

#[async_trait]
impl<B: PlatformBridge, A: VendorAdapter> HealthConnector for Connector<B, A> {
    fn platform(&self) -> PlatformKind {
        self.adapter.platform()
    }

    async fn check_availability(&self) -> ConnectorStatus {
        match self.bridge.is_available().await {
            Ok(true) => ConnectorStatus::Available,
            Ok(false) => ConnectorStatus::Unavailable {
                reason: format!(
                    "{} is not available on this device",
                    self.platform().display_name()
                ),
            },
            Err(e) => ConnectorStatus::Unavailable {
                reason: e.to_string(),
            },
        }
    }

    async fn request_permissions(&self) -> PermissionOutcome {
        if let ConnectorStatus::Unavailable { reason } = self.check_availability().await {
            return PermissionOutcome::denied(reason);
        }

        let granted = match self.bridge.request_access(&Category::ALL).await {
            Ok(granted) => granted,
            Err(e) => return PermissionOutcome::denied(e.to_string()),
        };

        let missing: Vec<&str> = Category::ALL
            .iter()
            .filter(|c| !granted.contains(c))
            .map(|c| c.as_str())
            .collect();

        let granted_categories: Vec<Category> = Category::ALL
            .iter()
            .copied()
            .filter(|c| granted.contains(c))
            .collect();

        if missing.is_empty() {
            PermissionOutcome {
                granted: true,
                reason: None,
                granted_categories,
            }
        } else {
            PermissionOutcome {
                granted: false,
                reason: Some(format!("access not granted for: {}", missing.join(", "))),
                granted_categories,
            }
        }
    }

    async fn read_window(&self, window: &ReadWindow) -> ReadOutcome {
        if let ConnectorStatus::Unavailable { reason } = self.check_availability().await {
            return ReadOutcome::unavailable(reason);
        }

        let options = self.options;
        let reads = Category::ALL.iter().map(|&category| async move {
            (category, self.bridge.query(category, window, options).await)
        });
        let results = join_all(reads).await;

        let mut samples = Vec::new();
        for (category, result) in results {
            match result {
                Ok(records) => samples.extend(self.normalize_all(category, &records)),
                Err(BridgeError::Unavailable(reason)) => {
                    tracing::warn!(%category, %reason, "platform became unavailable during read");
                    return ReadOutcome::unavailable(reason);
                }
                Err(e) => {
                    tracing::warn!(%category, error = %e, "category read failed, contributing no samples");
                }
            }
        }

        ReadOutcome {
            samples,
            unavailable: None,
        }
    }
}

/// Build the connector for `kind` over `bridge`.
pub fn for_platform<B>(kind: PlatformKind, bridge: B) -> Box<dyn HealthConnector>
where
    B: PlatformBridge + 'static,
{
    for_platform_with(kind, bridge, QueryOptions::default())
}

/// [`for_platform`] with explicit per-category query options.
pub fn for_platform_with<B>(
    kind: PlatformKind,
    bridge: B,
    options: QueryOptions,
) -> Box<dyn HealthConnector>
where
    B: PlatformBridge + 'static,
{
    match kind {
        PlatformKind::HealthKit => {
            Box::new(Connector::new(bridge, HealthKitAdapter).with_options(options))
        }
        PlatformKind::HealthConnect => {
            Box::new(Connector::new(bridge, HealthConnectAdapter).with_options(options))
        }
    }
}
