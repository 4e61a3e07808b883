//! Concrete pairings materialized from a sync set.

use std::sync::Arc;

use super::types::SyncConfig;
use crate::platform::{GroupKey, RoleId};

/// An identifier on one side of a pairing.
///
/// Unit (`()`) is the identifier for singleton kinds where the game side is
/// "the player" rather than a named object.
pub trait SyncId: Clone + PartialEq + Send + Sync + 'static {
    /// Whether this side of the pairing is configured.
    fn is_set(&self) -> bool;

    /// Short label used in `describe()`.
    fn label(&self) -> String;
}

impl SyncId for () {
    fn is_set(&self) -> bool {
        true
    }

    fn label(&self) -> String {
        "player".to_string()
    }
}

impl SyncId for RoleId {
    fn is_set(&self) -> bool {
        self.0 != 0
    }

    fn label(&self) -> String {
        self.to_string()
    }
}

impl SyncId for GroupKey {
    fn is_set(&self) -> bool {
        !self.group.trim().is_empty()
    }

    fn label(&self) -> String {
        self.to_string()
    }
}

/// One concrete (game identifier, chat identifier) pairing.
#[derive(Debug, Clone)]
pub struct SyncEntry<G, D> {
    pub game_id: G,
    pub chat_id: D,
    pub config: Arc<SyncConfig>,
}

impl<G: SyncId, D: SyncId> SyncEntry<G, D> {
    pub fn new(game_id: G, chat_id: D, config: Arc<SyncConfig>) -> Self {
        Self {
            game_id,
            chat_id,
            config,
        }
    }

    /// Both sides of the pairing are configured.
    pub fn is_set(&self) -> bool {
        self.game_id.is_set() && self.chat_id.is_set()
    }

    /// "game → chat", used in logs and result messages.
    pub fn describe(&self) -> String {
        format!("{} → {}", self.game_id.label(), self.chat_id.label())
    }

    /// Targets the same pair, regardless of which set it came from.
    pub fn is_same_as(&self, other: &Self) -> bool {
        self.game_id == other.game_id && self.chat_id == other.chat_id
    }
}

/// A named group of entries sharing one [`SyncConfig`].
#[derive(Debug, Clone)]
pub struct SyncSet<G, D> {
    pub name: String,
    pub config: Arc<SyncConfig>,
    pub entries: Vec<SyncEntry<G, D>>,
}

impl<G: SyncId, D: SyncId> SyncSet<G, D> {
    pub fn new(name: impl Into<String>, config: SyncConfig) -> Self {
        Self {
            name: name.into(),
            config: Arc::new(config),
            entries: Vec::new(),
        }
    }

    /// Add a pairing. Pairs already present in the set are skipped.
    pub fn with_entry(mut self, game_id: G, chat_id: D) -> Self {
        let entry = SyncEntry::new(game_id, chat_id, Arc::clone(&self.config));
        if !self.entries.iter().any(|e| e.is_same_as(&entry)) {
            self.entries.push(entry);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_needs_both_sides() {
        let set = SyncSet::new("staff", SyncConfig::default())
            .with_entry(GroupKey::new("vip"), RoleId(123))
            .with_entry(GroupKey::new(""), RoleId(5))
            .with_entry(GroupKey::new("mod"), RoleId(0));
        let set_flags: Vec<bool> = set.entries.iter().map(|e| e.is_set()).collect();
        assert_eq!(set_flags, vec![true, false, false]);
    }

    #[test]
    fn describe_shows_both_sides() {
        let entry = SyncEntry::new(
            GroupKey::new("vip").with_context("world", "nether"),
            RoleId(123),
            Arc::new(SyncConfig::default()),
        );
        assert_eq!(entry.describe(), "vip[world=nether] → role:123");

        let singleton = SyncEntry::new((), RoleId(9), Arc::new(SyncConfig::default()));
        assert_eq!(singleton.describe(), "player → role:9");
    }

    #[test]
    fn same_pair_ignores_config() {
        let a = SyncEntry::new(GroupKey::new("vip"), RoleId(1), Arc::new(SyncConfig::default()));
        let b = SyncEntry::new(GroupKey::new("vip"), RoleId(1), Arc::new(SyncConfig::default()));
        let c = SyncEntry::new(
            GroupKey::new("vip").with_context("server", "lobby"),
            RoleId(1),
            Arc::new(SyncConfig::default()),
        );
        assert!(a.is_same_as(&b));
        assert!(!a.is_same_as(&c));
    }

    #[test]
    fn duplicate_pairs_are_collapsed() {
        let set = SyncSet::new("dupes", SyncConfig::default())
            .with_entry(GroupKey::new("vip"), RoleId(1))
            .with_entry(GroupKey::new("vip"), RoleId(1));
        assert_eq!(set.entries.len(), 1);
    }
}
