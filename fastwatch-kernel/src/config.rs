use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path, time::Duration};
use tokio::fs;
use tracing::warn;

use crate::models::{BYTES_RECEIVED, BYTES_SENT};

pub const CONFIG_ENV: &str = "FASTWATCH_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "fastwatch.yaml";

const WAN_BYTES_RECEIVED: &str = "Device/IP/Interfaces/Interface[Alias='IP_DATA']/Stats/BytesReceived";
const WAN_BYTES_SENT: &str = "Device/IP/Interfaces/Interface[Alias='IP_DATA']/Stats/BytesSent";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct FastConfig {
    pub name: String,
    pub update_interval_secs: u64,
    pub refresh_timeout_secs: u64,
    /// metric key -> device path
    pub metrics: BTreeMap<String, String>,
    /// Prune inactive hosts unseen for this long; unbounded when absent
    pub host_retention_secs: Option<u64>,
}

impl Default for FastConfig {
    fn default() -> Self {
        Self {
            name: "sagemcom_fast".into(),
            update_interval_secs: 10,
            refresh_timeout_secs: 10,
            metrics: default_metrics(),
            host_retention_secs: None,
        }
    }
}

pub fn default_metrics() -> BTreeMap<String, String> {
    BTreeMap::from([
        (BYTES_RECEIVED.to_string(), WAN_BYTES_RECEIVED.to_string()),
        (BYTES_SENT.to_string(), WAN_BYTES_SENT.to_string()),
    ])
}

impl FastConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    pub fn host_retention(&self) -> Option<Duration> {
        self.host_retention_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.update_interval_secs == 0 {
            return Err(ConfigError::Invalid("update_interval_secs must be > 0".into()));
        }
        if self.refresh_timeout_secs == 0 {
            return Err(ConfigError::Invalid("refresh_timeout_secs must be > 0".into()));
        }
        if self.metrics.is_empty() {
            return Err(ConfigError::Invalid("at least one metric path is required".into()));
        }
        if let Some((key, _)) = self.metrics.iter().find(|(_, path)| path.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("metric '{key}' has an empty path")));
        }
        Ok(())
    }
}

/// Reads the file named by `FASTWATCH_CONFIG` (or `fastwatch.yaml`).
/// A missing or empty file yields the defaults.
pub async fn load_config() -> Result<FastConfig> {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    load_config_from(&path).await
}

pub async fn load_config_from(path: impl AsRef<Path>) -> Result<FastConfig> {
    let path = path.as_ref();
    if !path.exists() {
        warn!("No config at {}, using defaults", path.display());
        return Ok(FastConfig::default());
    }

    let txt = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if txt.trim().is_empty() {
        return Ok(FastConfig::default());
    }

    let config: FastConfig = serde_yaml::from_str(&txt)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config.validate()?;
    Ok(config)
}
