//! Narrow interfaces over the chat platform and the game platform.
//!
//! The bridge never talks to a platform client directly. Each sync kind
//! reads and writes through these traits, so a platform integration only has
//! to provide role, ban, timeout, group, mute and presence primitives.
//!
//! [`memory`] provides in-process implementations (and an in-process link
//! provider) used for standalone operation and tests.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::error::PlatformError;

pub use memory::{MemoryChat, MemoryGame, MemoryLinks};

/// Chat-account identifier (snowflake).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub u64);

/// Chat role identifier. Zero means "not configured".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleId(pub u64);

/// Chat server (guild) identifier. Zero means "not configured".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "role:{}", self.0)
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server:{}", self.0)
    }
}

/// A permission group, optionally scoped by context (world, server, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub group: String,
    pub contexts: BTreeMap<String, String>,
}

impl GroupKey {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            contexts: BTreeMap::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.contexts.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.group)?;
        if !self.contexts.is_empty() {
            let contexts: Vec<String> = self
                .contexts
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            write!(f, "[{}]", contexts.join(","))?;
        }
        Ok(())
    }
}

/// An active ban, mute or timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Punishment {
    /// Expiry; `None` is permanent.
    pub until: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub punisher: Option<String>,
}

impl Punishment {
    pub fn permanent() -> Self {
        Self {
            until: None,
            reason: None,
            punisher: None,
        }
    }

    pub fn until(until: DateTime<Utc>) -> Self {
        Self {
            until: Some(until),
            ..Self::permanent()
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.until.is_some_and(|until| until <= now)
    }

    /// Expiry equality at second precision. Platforms round differently.
    pub fn same_expiry(&self, other: &Punishment) -> bool {
        self.until.map(|t| t.timestamp()) == other.until.map(|t| t.timestamp())
    }
}

/// Compare two optional punishments by presence, and by expiry when asked.
pub fn punishments_match(
    a: &Option<Punishment>,
    b: &Option<Punishment>,
    compare_expiry: bool,
) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => !compare_expiry || a.same_expiry(b),
        _ => false,
    }
}

/// Chat-side primitives consumed by the sync kinds.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn has_role(&self, user: UserId, role: RoleId) -> Result<bool, PlatformError>;

    async fn add_role(&self, user: UserId, role: RoleId) -> Result<(), PlatformError>;

    async fn remove_role(&self, user: UserId, role: RoleId) -> Result<(), PlatformError>;

    async fn get_ban(&self, server: ServerId, user: UserId)
    -> Result<Option<Punishment>, PlatformError>;

    async fn ban(
        &self,
        server: ServerId,
        user: UserId,
        punishment: &Punishment,
    ) -> Result<(), PlatformError>;

    async fn unban(&self, server: ServerId, user: UserId) -> Result<(), PlatformError>;

    async fn get_timeout(
        &self,
        server: ServerId,
        user: UserId,
    ) -> Result<Option<Punishment>, PlatformError>;

    async fn timeout(
        &self,
        server: ServerId,
        user: UserId,
        punishment: &Punishment,
    ) -> Result<(), PlatformError>;

    async fn remove_timeout(&self, server: ServerId, user: UserId) -> Result<(), PlatformError>;
}

/// Game-side primitives consumed by the sync kinds.
///
/// Game platforms that only allow mutation on their main thread hop
/// executors inside the returned futures; the engine stays executor-agnostic.
#[async_trait]
pub trait GamePlatform: Send + Sync {
    async fn has_group(&self, player: Uuid, group: &GroupKey) -> Result<bool, PlatformError>;

    async fn add_group(&self, player: Uuid, group: &GroupKey) -> Result<(), PlatformError>;

    async fn remove_group(&self, player: Uuid, group: &GroupKey) -> Result<(), PlatformError>;

    async fn get_ban(&self, player: Uuid) -> Result<Option<Punishment>, PlatformError>;

    /// Ban a player, disconnecting them if online.
    async fn ban(&self, player: Uuid, punishment: &Punishment) -> Result<(), PlatformError>;

    async fn pardon(&self, player: Uuid) -> Result<(), PlatformError>;

    async fn get_mute(&self, player: Uuid) -> Result<Option<Punishment>, PlatformError>;

    async fn mute(&self, player: Uuid, punishment: &Punishment) -> Result<(), PlatformError>;

    async fn unmute(&self, player: Uuid) -> Result<(), PlatformError>;

    async fn is_online(&self, player: Uuid) -> Result<bool, PlatformError>;

    async fn online_players(&self) -> Result<Vec<Uuid>, PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn group_key_display_includes_contexts() {
        assert_eq!(GroupKey::new("vip").to_string(), "vip");
        let scoped = GroupKey::new("vip").with_context("server", "lobby");
        assert_eq!(scoped.to_string(), "vip[server=lobby]");
    }

    #[test]
    fn punishment_matching() {
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        let a = Some(Punishment::until(at));
        let b = Some(Punishment::until(later).with_reason("spam"));

        assert!(punishments_match(&None, &None, true));
        assert!(!punishments_match(&a, &None, false));
        assert!(punishments_match(&a, &b, false));
        assert!(!punishments_match(&a, &b, true));
        assert!(punishments_match(&a, &Some(Punishment::until(at)), true));
    }

    #[test]
    fn permanent_punishment_never_expires() {
        let now = Utc::now();
        assert!(!Punishment::permanent().is_expired(now));
        assert!(Punishment::until(now - chrono::Duration::seconds(1)).is_expired(now));
    }
}
