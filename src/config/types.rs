//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::defaults::{
    default_cache_ttl_secs, default_database_path, default_link_cooldown_secs,
    default_minimum_delay_secs,
};
use super::sync::SyncSection;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Bridge configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Bridge identity and endpoints.
    pub bridge: BridgeConfig,
    /// Link table storage.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Identity resolver caching and link cooldown.
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Timer sweep scheduling.
    #[serde(default)]
    pub timer: SchedulerConfig,
    /// Sync sets.
    #[serde(default)]
    pub sync: SyncSection,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Bridge identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Name used in logs.
    pub name: String,
    /// Prometheus metrics HTTP port. Unset or 0 disables the endpoint.
    pub metrics_port: Option<u16>,
}

impl BridgeConfig {
    pub fn metrics_port(&self) -> Option<u16> {
        self.metrics_port.filter(|port| *port != 0)
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Identity resolver configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Lifetime of cached link lookups, in seconds. 0 disables caching.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Minimum seconds between link queries for one player. 0 disables.
    #[serde(default = "default_link_cooldown_secs")]
    pub link_cooldown_secs: u64,
}

impl IdentityConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn link_cooldown(&self) -> Duration {
        Duration::from_secs(self.link_cooldown_secs)
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            link_cooldown_secs: default_link_cooldown_secs(),
        }
    }
}

/// Timer sweep scheduling.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Shortest allowed cycle, and the first-fire delay after a (re)schedule.
    #[serde(default = "default_minimum_delay_secs")]
    pub minimum_delay_secs: u64,
}

impl SchedulerConfig {
    pub fn minimum_delay(&self) -> Duration {
        Duration::from_secs(self.minimum_delay_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            minimum_delay_secs: default_minimum_delay_secs(),
        }
    }
}
