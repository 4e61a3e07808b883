//! In-process chat and game platforms.
//!
//! Used by the standalone daemon and by tests. Both keep their state in
//! DashMaps, count every write that actually changed something, and can be
//! told to fail reads for specific accounts or to add read latency.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::{ChatPlatform, GamePlatform, GroupKey, Punishment, RoleId, ServerId, UserId};
use crate::error::PlatformError;
use crate::identity::LinkProvider;

/// Shared knobs for the in-memory platforms.
#[derive(Debug, Default)]
struct Faults {
    /// Read latency in milliseconds.
    latency_ms: AtomicU64,
    writes: AtomicUsize,
}

impl Faults {
    async fn delay(&self) {
        let ms = self.latency_ms.load(Ordering::Relaxed);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    fn wrote(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn active(punishment: Option<Punishment>) -> Option<Punishment> {
    punishment.filter(|p| !p.is_expired(Utc::now()))
}

// ============================================================================
// Chat
// ============================================================================

/// In-memory chat platform.
#[derive(Debug, Default)]
pub struct MemoryChat {
    roles: DashMap<UserId, HashSet<RoleId>>,
    bans: DashMap<(ServerId, UserId), Punishment>,
    timeouts: DashMap<(ServerId, UserId), Punishment>,
    failing_users: DashSet<UserId>,
    faults: Faults,
}

impl MemoryChat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes that changed chat-side state.
    pub fn write_count(&self) -> usize {
        self.faults.writes.load(Ordering::SeqCst)
    }

    /// Make every read for `user` fail.
    pub fn fail_reads_for(&self, user: UserId) {
        self.failing_users.insert(user);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.faults
            .latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Seed a role without counting it as a sync write.
    pub fn grant_role(&self, user: UserId, role: RoleId) {
        self.roles.entry(user).or_default().insert(role);
    }

    pub fn roles_of(&self, user: UserId) -> HashSet<RoleId> {
        self.roles.get(&user).map(|r| r.clone()).unwrap_or_default()
    }

    /// Seed a ban without counting it as a sync write.
    pub fn seed_ban(&self, server: ServerId, user: UserId, punishment: Punishment) {
        self.bans.insert((server, user), punishment);
    }

    pub fn ban_of(&self, server: ServerId, user: UserId) -> Option<Punishment> {
        active(self.bans.get(&(server, user)).map(|p| p.clone()))
    }

    pub fn timeout_of(&self, server: ServerId, user: UserId) -> Option<Punishment> {
        active(self.timeouts.get(&(server, user)).map(|p| p.clone()))
    }

    async fn read(&self, user: UserId) -> Result<(), PlatformError> {
        self.faults.delay().await;
        if self.failing_users.contains(&user) {
            return Err(PlatformError::Unavailable(format!("chat lookup for {user}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for MemoryChat {
    async fn has_role(&self, user: UserId, role: RoleId) -> Result<bool, PlatformError> {
        self.read(user).await?;
        Ok(self.roles.get(&user).is_some_and(|r| r.contains(&role)))
    }

    async fn add_role(&self, user: UserId, role: RoleId) -> Result<(), PlatformError> {
        if self.roles.entry(user).or_default().insert(role) {
            self.faults.wrote();
            debug!(user = %user, role = %role, "role added");
        }
        Ok(())
    }

    async fn remove_role(&self, user: UserId, role: RoleId) -> Result<(), PlatformError> {
        if let Some(mut roles) = self.roles.get_mut(&user)
            && roles.remove(&role)
        {
            self.faults.wrote();
            debug!(user = %user, role = %role, "role removed");
        }
        Ok(())
    }

    async fn get_ban(
        &self,
        server: ServerId,
        user: UserId,
    ) -> Result<Option<Punishment>, PlatformError> {
        self.read(user).await?;
        Ok(self.ban_of(server, user))
    }

    async fn ban(
        &self,
        server: ServerId,
        user: UserId,
        punishment: &Punishment,
    ) -> Result<(), PlatformError> {
        self.bans.insert((server, user), punishment.clone());
        self.faults.wrote();
        Ok(())
    }

    async fn unban(&self, server: ServerId, user: UserId) -> Result<(), PlatformError> {
        if self.bans.remove(&(server, user)).is_some() {
            self.faults.wrote();
        }
        Ok(())
    }

    async fn get_timeout(
        &self,
        server: ServerId,
        user: UserId,
    ) -> Result<Option<Punishment>, PlatformError> {
        self.read(user).await?;
        Ok(self.timeout_of(server, user))
    }

    async fn timeout(
        &self,
        server: ServerId,
        user: UserId,
        punishment: &Punishment,
    ) -> Result<(), PlatformError> {
        self.timeouts.insert((server, user), punishment.clone());
        self.faults.wrote();
        Ok(())
    }

    async fn remove_timeout(&self, server: ServerId, user: UserId) -> Result<(), PlatformError> {
        if self.timeouts.remove(&(server, user)).is_some() {
            self.faults.wrote();
        }
        Ok(())
    }
}

// ============================================================================
// Game
// ============================================================================

/// In-memory game platform.
#[derive(Debug, Default)]
pub struct MemoryGame {
    groups: DashMap<Uuid, HashSet<GroupKey>>,
    bans: DashMap<Uuid, Punishment>,
    mutes: DashMap<Uuid, Punishment>,
    online: DashSet<Uuid>,
    kicks: DashMap<Uuid, usize>,
    failing_players: DashSet<Uuid>,
    faults: Faults,
}

impl MemoryGame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes that changed game-side state.
    pub fn write_count(&self) -> usize {
        self.faults.writes.load(Ordering::SeqCst)
    }

    /// Make every read for `player` fail.
    pub fn fail_reads_for(&self, player: Uuid) {
        self.failing_players.insert(player);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.faults
            .latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn set_online(&self, player: Uuid, online: bool) {
        if online {
            self.online.insert(player);
        } else {
            self.online.remove(&player);
        }
    }

    /// Seed a group without counting it as a sync write.
    pub fn grant_group(&self, player: Uuid, group: GroupKey) {
        self.groups.entry(player).or_default().insert(group);
    }

    pub fn groups_of(&self, player: Uuid) -> HashSet<GroupKey> {
        self.groups.get(&player).map(|g| g.clone()).unwrap_or_default()
    }

    /// Seed a ban without counting it as a sync write.
    pub fn seed_ban(&self, player: Uuid, punishment: Punishment) {
        self.bans.insert(player, punishment);
    }

    pub fn ban_of(&self, player: Uuid) -> Option<Punishment> {
        active(self.bans.get(&player).map(|p| p.clone()))
    }

    pub fn mute_of(&self, player: Uuid) -> Option<Punishment> {
        active(self.mutes.get(&player).map(|p| p.clone()))
    }

    /// Times `player` was disconnected by a ban.
    pub fn kick_count(&self, player: Uuid) -> usize {
        self.kicks.get(&player).map(|k| *k).unwrap_or(0)
    }

    async fn read(&self, player: Uuid) -> Result<(), PlatformError> {
        self.faults.delay().await;
        if self.failing_players.contains(&player) {
            return Err(PlatformError::Unavailable(format!("game lookup for {player}")));
        }
        Ok(())
    }
}

#[async_trait]
impl GamePlatform for MemoryGame {
    async fn has_group(&self, player: Uuid, group: &GroupKey) -> Result<bool, PlatformError> {
        self.read(player).await?;
        Ok(self.groups.get(&player).is_some_and(|g| g.contains(group)))
    }

    async fn add_group(&self, player: Uuid, group: &GroupKey) -> Result<(), PlatformError> {
        if self.groups.entry(player).or_default().insert(group.clone()) {
            self.faults.wrote();
            debug!(player = %player, group = %group, "group added");
        }
        Ok(())
    }

    async fn remove_group(&self, player: Uuid, group: &GroupKey) -> Result<(), PlatformError> {
        if let Some(mut groups) = self.groups.get_mut(&player)
            && groups.remove(group)
        {
            self.faults.wrote();
            debug!(player = %player, group = %group, "group removed");
        }
        Ok(())
    }

    async fn get_ban(&self, player: Uuid) -> Result<Option<Punishment>, PlatformError> {
        self.read(player).await?;
        Ok(self.ban_of(player))
    }

    async fn ban(&self, player: Uuid, punishment: &Punishment) -> Result<(), PlatformError> {
        self.bans.insert(player, punishment.clone());
        self.faults.wrote();
        if self.online.remove(&player).is_some() {
            *self.kicks.entry(player).or_default() += 1;
            debug!(player = %player, "banned player disconnected");
        }
        Ok(())
    }

    async fn pardon(&self, player: Uuid) -> Result<(), PlatformError> {
        if self.bans.remove(&player).is_some() {
            self.faults.wrote();
        }
        Ok(())
    }

    async fn get_mute(&self, player: Uuid) -> Result<Option<Punishment>, PlatformError> {
        self.read(player).await?;
        Ok(self.mute_of(player))
    }

    async fn mute(&self, player: Uuid, punishment: &Punishment) -> Result<(), PlatformError> {
        self.mutes.insert(player, punishment.clone());
        self.faults.wrote();
        Ok(())
    }

    async fn unmute(&self, player: Uuid) -> Result<(), PlatformError> {
        if self.mutes.remove(&player).is_some() {
            self.faults.wrote();
        }
        Ok(())
    }

    async fn is_online(&self, player: Uuid) -> Result<bool, PlatformError> {
        self.read(player).await?;
        Ok(self.online.contains(&player))
    }

    async fn online_players(&self) -> Result<Vec<Uuid>, PlatformError> {
        Ok(self.online.iter().map(|p| *p).collect())
    }
}

// ============================================================================
// Link provider
// ============================================================================

/// In-memory link provider: accounts offered here are found by `query-link`.
#[derive(Debug, Default)]
pub struct MemoryLinks {
    offers: DashMap<Uuid, UserId>,
}

impl MemoryLinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offer(&self, player: Uuid, user: UserId) {
        self.offers.insert(player, user);
    }
}

#[async_trait]
impl LinkProvider for MemoryLinks {
    async fn lookup(&self, player: Uuid) -> Result<Option<UserId>, PlatformError> {
        Ok(self.offers.get(&player).map(|u| *u))
    }
}
