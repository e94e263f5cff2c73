//! Bridge used when no native health framework exists for the target.
//!
//! This exists so the crate (and binary) can run on desktop targets where
//! neither HealthKit nor Health Connect is present.

use super::bridge::{BridgeError, PlatformBridge, QueryOptions};
use crate::sample::{Category, ReadWindow};
use async_trait::async_trait;
use serde_json::Value;

/// Reason reported by [`NoopBridge`].
pub const NO_MODULE_REASON: &str = "no native health module on this platform";

/// A bridge that is never available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBridge;

#[async_trait]
impl PlatformBridge for NoopBridge {
    async fn is_available(&self) -> Result<bool, BridgeError> {
        Err(BridgeError::Unavailable(NO_MODULE_REASON.to_string()))
    }

    async fn request_access(&self, _categories: &[Category]) -> Result<Vec<Category>, BridgeError> {
        Err(BridgeError::Unavailable(NO_MODULE_REASON.to_string()))
    }

    async fn query(
        &self,
        _category: Category,
        _window: &ReadWindow,
        _options: QueryOptions,
    ) -> Result<Vec<Value>, BridgeError> {
        Err(BridgeError::Unavailable(NO_MODULE_REASON.to_string()))
    }
}
