//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, BridgeConfig, IdentityConfig)
//! - [`sync`]: Sync set definitions (groups, bans, mutes, linked and online roles)
//! - [`defaults`]: serde default values
//! - [`validation`]: load-time checks, global and per sync set

mod defaults;
mod sync;
mod types;
pub mod validation;

pub use sync::{
    BanSyncConfig, GroupPairConfig, GroupSetConfig, MuteSyncConfig, RoleProjectionConfig,
    SyncSection,
};
pub use types::{
    BridgeConfig, Config, ConfigError, DatabaseConfig, IdentityConfig, SchedulerConfig,
};
pub use validation::{
    ValidationError, validate, validate_group_set, validate_projection, validate_sync_config,
};
