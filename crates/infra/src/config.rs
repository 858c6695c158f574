//! Board configuration: store collection, stall timezone, polling, menu.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stallboard_orders::Menu;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "STALLBOARD_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StallConfig {
    /// Store collection holding the order documents.
    pub collection: String,
    /// Separator placed between item notes when an order is submitted.
    pub note_separator: String,
    /// Stall timezone as a fixed UTC offset; decides what "today" is.
    pub utc_offset_hours: i32,
    /// How often the presentation layer polls for open orders.
    pub poll_interval_secs: u64,
    pub menu: Menu,
}

impl Default for StallConfig {
    fn default() -> Self {
        Self {
            collection: "orders".to_string(),
            note_separator: " / ".to_string(),
            utc_offset_hours: 8,
            poll_interval_secs: 10,
            menu: Menu::default(),
        }
    }
}

impl StallConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {path:?}"))?;
        let config = Self::from_json_str(&raw)
            .with_context(|| format!("failed to load config at {path:?}"))?;
        tracing::info!("Loaded stall config from {:?}", path);
        Ok(config)
    }

    /// Load from the file named by `STALLBOARD_CONFIG`, or fall back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_env_value(std::env::var(CONFIG_ENV).ok().as_deref())
    }

    fn from_env_value(value: Option<&str>) -> anyhow::Result<Self> {
        match value.map(str::trim) {
            Some(path) if !path.is_empty() => Self::load(path),
            _ => {
                tracing::debug!("{} not set; using default stall config", CONFIG_ENV);
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collection.trim().is_empty() {
            return Err(ConfigError::Invalid("collection must not be empty".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_secs must be positive".to_string(),
            ));
        }
        if self.utc_offset().is_none() {
            return Err(ConfigError::Invalid(format!(
                "utc_offset_hours out of range: {}",
                self.utc_offset_hours
            )));
        }
        self.menu
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn utc_offset(&self) -> Option<FixedOffset> {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
