//! File-backed platform bridge.
//!
//! Serves canned vendor records in place of a native framework, for the CLI
//! and for tests. A fixture document looks like:
//!
//! ```json
//! {
//!   "available": true,
//!   "granted": ["blood_glucose", "heart_rate"],
//!   "records": { "heart_rate": [{ "value": 72, "startDate": "2024-01-15T09:00:00Z" }] },
//!   "failures": { "ecg": "query timed out" }
//! }
//! ```
//!
//! Records are served as stored (assumed ascending). The window is not applied;
//! `limit` and `order` are.

use super::bridge::{BridgeError, PlatformBridge, QueryOptions, SortOrder};
use crate::sample::{Category, ReadWindow};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Errors loading a fixture document.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixture {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid fixture: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct FixtureDocument {
    #[serde(default = "default_available")]
    available: bool,
    #[serde(default)]
    unavailable_reason: Option<String>,
    #[serde(default)]
    granted: Option<Vec<Category>>,
    #[serde(default)]
    records: HashMap<Category, Vec<Value>>,
    #[serde(default)]
    failures: HashMap<Category, String>,
}

fn default_available() -> bool {
    true
}

/// A bridge backed by in-memory vendor records.
#[derive(Debug)]
pub struct FixtureBridge {
    availability: Result<bool, BridgeError>,
    granted: Vec<Category>,
    records: HashMap<Category, Vec<Value>>,
    failures: HashMap<Category, BridgeError>,
    queries: AtomicUsize,
}

impl FixtureBridge {
    /// An available bridge holding `records`, granting every category.
    pub fn with_records(records: HashMap<Category, Vec<Value>>) -> Self {
        Self {
            availability: Ok(true),
            granted: Category::ALL.to_vec(),
            records,
            failures: HashMap::new(),
            queries: AtomicUsize::new(0),
        }
    }

    /// A bridge whose module is missing.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let mut bridge = Self::with_records(HashMap::new());
        bridge.availability = Err(BridgeError::Unavailable(reason.into()));
        bridge
    }

    /// Restrict which categories a permission request grants.
    pub fn granting(mut self, categories: Vec<Category>) -> Self {
        self.granted = categories;
        self
    }

    /// Make every query for `category` fail with `error`.
    pub fn fail_category(mut self, category: Category, error: BridgeError) -> Self {
        self.failures.insert(category, error);
        self
    }

    /// Parse a fixture document.
    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        let doc: FixtureDocument = serde_json::from_str(json)?;

        let availability = match (doc.available, doc.unavailable_reason) {
            (true, _) => Ok(true),
            (false, Some(reason)) => Err(BridgeError::Unavailable(reason)),
            (false, None) => Ok(false),
        };

        Ok(Self {
            availability,
            granted: doc.granted.unwrap_or_else(|| Category::ALL.to_vec()),
            records: doc.records,
            failures: doc
                .failures
                .into_iter()
                .map(|(category, message)| (category, BridgeError::Query(message)))
                .collect(),
            queries: AtomicUsize::new(0),
        })
    }

    /// Load a fixture document from disk.
    pub fn from_path(path: &Path) -> Result<Self, FixtureError> {
        let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Number of category queries served so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PlatformBridge for FixtureBridge {
    async fn is_available(&self) -> Result<bool, BridgeError> {
        self.availability.clone()
    }

    async fn request_access(&self, categories: &[Category]) -> Result<Vec<Category>, BridgeError> {
        if !self.is_available().await? {
            return Err(BridgeError::PermissionDenied(
                "health framework not present".to_string(),
            ));
        }
        Ok(categories
            .iter()
            .copied()
            .filter(|c| self.granted.contains(c))
            .collect())
    }

    async fn query(
        &self,
        category: Category,
        _window: &ReadWindow,
        options: QueryOptions,
    ) -> Result<Vec<Value>, BridgeError> {
        self.queries.fetch_add(1, Ordering::Relaxed);

        if let Some(error) = self.failures.get(&category) {
            return Err(error.clone());
        }

        let mut records = self.records.get(&category).cloned().unwrap_or_default();
        if options.order == SortOrder::Descending {
            records.reverse();
        }
        records.truncate(options.limit);
        Ok(records)
    }
}
