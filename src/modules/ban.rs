//! Game bans ↔ chat server bans (or a "banned" role).

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::error::SyncError;
use crate::identity::ResolvedIdentity;
use crate::platform::{ChatPlatform, GamePlatform, Punishment, RoleId, ServerId, punishments_match};
use crate::sync::{EntryOf, Side, SyncId, SyncKind, SyncModule};

/// Chat side of a ban or mute pairing: a server, and optionally a role that
/// stands in for the punishment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PunishmentTarget {
    pub server: ServerId,
    pub role: Option<RoleId>,
}

impl PunishmentTarget {
    pub fn new(server: u64, role: u64) -> Self {
        Self {
            server: ServerId(server),
            role: (role != 0).then_some(RoleId(role)),
        }
    }

    /// Roles carry no expiry, so only presence can be compared.
    pub fn compares_expiry(&self) -> bool {
        self.role.is_none()
    }
}

impl SyncId for PunishmentTarget {
    fn is_set(&self) -> bool {
        self.server.0 != 0
    }

    fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PunishmentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            Some(role) => write!(f, "{} {}", self.server, role),
            None => write!(f, "{}", self.server),
        }
    }
}

/// Read a role-backed punishment: holding the role is a permanent one.
pub(super) async fn role_punishment(
    chat: &dyn ChatPlatform,
    identity: &ResolvedIdentity,
    role: RoleId,
) -> Result<Option<Punishment>, crate::error::PlatformError> {
    Ok(chat
        .has_role(identity.user, role)
        .await?
        .then(Punishment::permanent))
}

/// Mirrors bans between the game and one chat server.
pub struct BanSync {
    chat: Arc<dyn ChatPlatform>,
    game: Arc<dyn GamePlatform>,
    compare_expiry: bool,
}

impl BanSync {
    pub fn new(
        chat: Arc<dyn ChatPlatform>,
        game: Arc<dyn GamePlatform>,
        target: PunishmentTarget,
    ) -> Self {
        Self {
            chat,
            game,
            compare_expiry: target.compares_expiry(),
        }
    }
}

#[async_trait]
impl SyncModule for BanSync {
    type GameId = ();
    type ChatId = PunishmentTarget;
    type State = Option<Punishment>;

    fn kind(&self) -> SyncKind {
        SyncKind::Bans
    }

    async fn fetch_game_state(
        &self,
        _entry: &EntryOf<Self>,
        identity: &ResolvedIdentity,
    ) -> Result<Option<Punishment>, SyncError> {
        self.game
            .get_ban(identity.player)
            .await
            .map_err(SyncError::fetch(Side::Game))
    }

    async fn fetch_chat_state(
        &self,
        entry: &EntryOf<Self>,
        identity: &ResolvedIdentity,
    ) -> Result<Option<Punishment>, SyncError> {
        let target = entry.chat_id;
        let fetched = match target.role {
            Some(role) => role_punishment(self.chat.as_ref(), identity, role).await,
            None => self.chat.get_ban(target.server, identity.user).await,
        };
        fetched.map_err(SyncError::fetch(Side::Chat))
    }

    async fn apply_game_state(
        &self,
        _entry: &EntryOf<Self>,
        identity: &ResolvedIdentity,
        state: &Option<Punishment>,
    ) -> Result<(), SyncError> {
        let current = self
            .game
            .get_ban(identity.player)
            .await
            .map_err(SyncError::apply(Side::Game))?;
        if punishments_match(&current, state, self.compare_expiry) {
            return Ok(());
        }
        let written = match state {
            Some(punishment) => self.game.ban(identity.player, punishment).await,
            None => self.game.pardon(identity.player).await,
        };
        written.map_err(SyncError::apply(Side::Game))
    }

    async fn apply_chat_state(
        &self,
        entry: &EntryOf<Self>,
        identity: &ResolvedIdentity,
        state: &Option<Punishment>,
    ) -> Result<(), SyncError> {
        let target = entry.chat_id;
        if let Some(role) = target.role {
            return super::apply_role(self.chat.as_ref(), identity, role, state.is_some()).await;
        }

        let current = self
            .chat
            .get_ban(target.server, identity.user)
            .await
            .map_err(SyncError::apply(Side::Chat))?;
        if punishments_match(&current, state, self.compare_expiry) {
            return Ok(());
        }
        let written = match state {
            Some(punishment) => self.chat.ban(target.server, identity.user, punishment).await,
            None => self.chat.unban(target.server, identity.user).await,
        };
        written.map_err(SyncError::apply(Side::Chat))
    }

    fn states_equal(&self, a: &Option<Punishment>, b: &Option<Punishment>) -> bool {
        punishments_match(a, b, self.compare_expiry)
    }

    fn removed_state(&self) -> Option<Punishment> {
        None
    }
}
