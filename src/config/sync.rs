//! Sync set configuration.
//!
//! ```toml
//! [[sync.groups]]
//! name = "staff"
//! direction = "bidirectional"
//! timer = { cycle_secs = 600, side = "chat" }
//! tie_breakers = { link = "chat", game_join = "game", command = "game", api = "game", timer = "game" }
//! unlink_behaviour = "remove_discord"
//! pairs = [{ group = "vip", role_id = 123 }]
//!
//! [sync.bans]
//! server_id = 42
//! direction = "game_to_chat"
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::sync::{SyncConfig, TimerConfig};

/// The `[sync]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncSection {
    /// Group ↔ role sets.
    #[serde(default)]
    pub groups: Vec<GroupSetConfig>,
    /// Game bans ↔ chat bans or a banned role.
    pub bans: Option<BanSyncConfig>,
    /// Game mutes ↔ chat timeouts or a muted role.
    pub mutes: Option<MuteSyncConfig>,
    /// Link status → roles.
    pub linked_role: Option<RoleProjectionConfig>,
    /// Presence → roles.
    pub online_role: Option<RoleProjectionConfig>,
}

/// One group sync set.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupSetConfig {
    pub name: String,
    #[serde(flatten)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub pairs: Vec<GroupPairConfig>,
}

/// One (group, role) pairing.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupPairConfig {
    pub group: String,
    #[serde(default)]
    pub role_id: u64,
    /// Permission contexts the group is scoped to (world, server, ...).
    #[serde(default)]
    pub contexts: BTreeMap<String, String>,
}

/// Ban sync.
#[derive(Debug, Clone, Deserialize)]
pub struct BanSyncConfig {
    pub server_id: u64,
    /// When non-zero, a role marks chat-side bans instead of a server ban.
    #[serde(default)]
    pub banned_role_id: u64,
    #[serde(flatten)]
    pub sync: SyncConfig,
}

/// Mute sync.
#[derive(Debug, Clone, Deserialize)]
pub struct MuteSyncConfig {
    pub server_id: u64,
    /// When non-zero, a role marks chat-side mutes instead of a timeout.
    #[serde(default)]
    pub muted_role_id: u64,
    #[serde(flatten)]
    pub sync: SyncConfig,
}

/// A one-way projection of a game fact onto chat roles.
///
/// Direction and tie-breakers are fixed; only the roles and the timer are
/// configurable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleProjectionConfig {
    #[serde(default)]
    pub role_ids: Vec<u64>,
    #[serde(default)]
    pub timer: TimerConfig,
}
