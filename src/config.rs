//! Engine configuration, loaded from TOML.

use crate::application::submission::{
    DEFAULT_KEY_TTL_HOURS, DEFAULT_STORE_TIMEOUT, SubmissionPolicy,
};
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Idempotency window for multi-resource submissions without an explicit expiry.
    #[serde(default = "default_key_ttl_hours")]
    pub idempotency_key_ttl_hours: i64,

    /// Budget for a single store call, in milliseconds.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub log_json: bool,

    /// Persistent store location. In-memory storage when absent.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idempotency_key_ttl_hours: default_key_ttl_hours(),
            store_timeout_ms: default_store_timeout_ms(),
            log_level: default_log_level(),
            log_json: false,
            db_path: None,
        }
    }
}

const fn default_key_ttl_hours() -> i64 {
    DEFAULT_KEY_TTL_HOURS
}

fn default_store_timeout_ms() -> u64 {
    DEFAULT_STORE_TIMEOUT.as_millis() as u64
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.idempotency_key_ttl_hours <= 0 {
            return Err(EngineError::Config(
                "idempotency_key_ttl_hours must be positive".to_string(),
            ));
        }
        if self.store_timeout_ms == 0 {
            return Err(EngineError::Config(
                "store_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn key_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.idempotency_key_ttl_hours)
    }

    pub fn multi_resource_policy(&self) -> SubmissionPolicy {
        SubmissionPolicy::MultiResourcePerConsent {
            default_key_ttl: self.key_ttl(),
        }
    }
}
