//! Configuration for vital-sync.

use crate::backend::{ActivityMetric, BackendConfig};
use crate::sample::ReadWindow;
use crate::sync::StorageMode;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default number of records fetched per category.
pub const DEFAULT_QUERY_LIMIT: usize = 5000;

/// Default rolling window length.
pub const DEFAULT_WINDOW_HOURS: i64 = 24;

/// Main configuration, holding already-resolved user preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identifier sent with every upload
    pub user_id: String,

    /// Whether and how samples leave the device
    pub storage_mode: StorageMode,

    /// Activity series used for dashboard correlation
    pub activity_metric: ActivityMetric,

    /// Length of the rolling read window
    pub window_hours: i64,

    /// Maximum records fetched per category
    pub query_limit: usize,

    /// Backend connection
    pub backend: BackendConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: "local-user".to_string(),
            storage_mode: StorageMode::default(),
            activity_metric: ActivityMetric::default(),
            window_hours: DEFAULT_WINDOW_HOURS,
            query_limit: DEFAULT_QUERY_LIMIT,
            backend: BackendConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vital-sync")
            .join("config.json")
    }

    /// Apply a `key=value` assignment as used by `config set`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidValue {
            key: key.to_string(),
            reason,
        };

        match key {
            "user_id" => self.user_id = value.to_string(),
            "storage_mode" => self.storage_mode = value.parse().map_err(invalid)?,
            "activity_metric" => self.activity_metric = value.parse().map_err(invalid)?,
            "window_hours" => {
                let hours: i64 = value.parse().map_err(|e| invalid(format!("{e}")))?;
                ReadWindow::last_hours(Utc::now(), hours).map_err(|e| invalid(e.to_string()))?;
                self.window_hours = hours;
            }
            "query_limit" => {
                self.query_limit = value.parse().map_err(|e| invalid(format!("{e}")))?
            }
            "backend.base_url" => self.backend.base_url = value.to_string(),
            "backend.timeout_secs" => {
                self.backend.timeout_secs = value.parse().map_err(|e| invalid(format!("{e}")))?
            }
            "backend.token" => {
                self.backend.token = (!value.is_empty()).then(|| value.to_string());
            }
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Serialize error: {0}")]
    Serialize(serde_json::Error),
    #[error("unknown config key '{0}'")]
    UnknownKey(String),
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}
