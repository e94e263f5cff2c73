//! The narrow boundary to a native health-data framework.
//!
//! Bridges hand back vendor records as loosely-typed JSON bags. Connectors
//! parse them eagerly; nothing past a connector ever sees a `serde_json::Value`
//! record.

use crate::sample::{Category, ReadWindow};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors raised by a platform bridge.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// Module missing or the OS denies the capability entirely
    #[error("{0}")]
    Unavailable(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// A single category query failed
    #[error("query failed: {0}")]
    Query(String),
}

/// Result ordering requested from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Bounds for one category query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub limit: usize,
    pub order: SortOrder,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            limit: crate::config::DEFAULT_QUERY_LIMIT,
            order: SortOrder::Ascending,
        }
    }
}

/// Capability provider for one platform's native health framework.
#[async_trait]
pub trait PlatformBridge: Send + Sync {
    /// Probe whether the framework is present and usable.
    async fn is_available(&self) -> Result<bool, BridgeError>;

    /// Request read access; returns the categories actually granted.
    async fn request_access(&self, categories: &[Category]) -> Result<Vec<Category>, BridgeError>;

    /// Fetch raw vendor records for one category.
    async fn query(
        &self,
        category: Category,
        window: &ReadWindow,
        options: QueryOptions,
    ) -> Result<Vec<Value>, BridgeError>;
}

#[async_trait]
impl<B: PlatformBridge + ?Sized> PlatformBridge for Box<B> {
    async fn is_available(&self) -> Result<bool, BridgeError> {
        (**self).is_available().await
    }

    async fn request_access(&self, categories: &[Category]) -> Result<Vec<Category>, BridgeError> {
        (**self).request_access(categories).await
    }

    async fn query(
        &self,
        category: Category,
        window: &ReadWindow,
        options: QueryOptions,
    ) -> Result<Vec<Value>, BridgeError> {
        (**self).query(category, window, options).await
    }
}
