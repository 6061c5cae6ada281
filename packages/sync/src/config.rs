use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{SyncError, SyncResult};

pub const DEFAULT_CONFIG_NAME: &str = "flowdoc.config.json";

/// Tuning for the document server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    /// Attempts per read-modify-write loop before giving up
    pub max_attempts: u32,

    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,

    /// Presence entries not refreshed within this window are dropped
    pub presence_ttl_secs: u64,

    /// Changes older than this move to archival chunks
    pub trim_retention_secs: u64,

    /// Most changes kept in the head regardless of age
    pub trim_max_recent: usize,

    /// Smallest run worth archiving
    pub trim_min_batch: usize,

    pub trim_debounce_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff_base_ms: 20,
            backoff_cap_ms: 2000,
            presence_ttl_secs: 60,
            trim_retention_secs: 3600,
            trim_max_recent: 2000,
            trim_min_batch: 1,
            trim_debounce_ms: 1000,
        }
    }
}

impl SyncConfig {
    /// Load config from a directory, falling back to defaults when the
    /// directory has no config file
    pub fn load(dir: &Path) -> SyncResult<Self> {
        let config_path = dir.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| SyncError::Config(format!("{}: {}", config_path.display(), e)))?;
            let config: SyncConfig = serde_json::from_str(&content)
                .map_err(|e| SyncError::Config(format!("{}: {}", config_path.display(), e)))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(SyncConfig::default())
        }
    }

    fn validate(&self) -> SyncResult<()> {
        if self.max_attempts == 0 {
            return Err(SyncError::Config("maxAttempts must be at least 1".into()));
        }
        if self.backoff_cap_ms < self.backoff_base_ms {
            return Err(SyncError::Config(
                "backoffCapMs must not be below backoffBaseMs".into(),
            ));
        }
        Ok(())
    }

    pub fn presence_ttl(&self) -> Duration {
        Duration::from_secs(self.presence_ttl_secs)
    }

    pub fn trim_retention(&self) -> Duration {
        Duration::from_secs(self.trim_retention_secs)
    }

    pub fn trim_debounce(&self) -> Duration {
        Duration::from_millis(self.trim_debounce_ms)
    }
}
