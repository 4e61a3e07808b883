//! Game mutes ↔ chat timeouts (or a "muted" role).

use async_trait::async_trait;
use std::sync::Arc;

use super::ban::{PunishmentTarget, role_punishment};
use crate::error::SyncError;
use crate::identity::ResolvedIdentity;
use crate::platform::{ChatPlatform, GamePlatform, Punishment, punishments_match};
use crate::sync::{EntryOf, Side, SyncKind, SyncModule};

pub struct MuteSync {
    chat: Arc<dyn ChatPlatform>,
    game: Arc<dyn GamePlatform>,
    compare_expiry: bool,
}

impl MuteSync {
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
impl SyncModule for MuteSync {
    type GameId = ();
    type ChatId = PunishmentTarget;
    type State = Option<Punishment>;

    fn kind(&self) -> SyncKind {
        SyncKind::Mutes
    }

    async fn fetch_game_state(
        &self,
        _entry: &EntryOf<Self>,
        identity: &ResolvedIdentity,
    ) -> Result<Option<Punishment>, SyncError> {
        self.game
            .get_mute(identity.player)
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
            None => self.chat.get_timeout(target.server, identity.user).await,
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
            .get_mute(identity.player)
            .await
            .map_err(SyncError::apply(Side::Game))?;
        if punishments_match(&current, state, self.compare_expiry) {
            return Ok(());
        }
        let written = match state {
            Some(punishment) => self.game.mute(identity.player, punishment).await,
            None => self.game.unmute(identity.player).await,
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
            .get_timeout(target.server, identity.user)
            .await
            .map_err(SyncError::apply(Side::Chat))?;
        if punishments_match(&current, state, self.compare_expiry) {
            return Ok(());
        }
        let written = match state {
            Some(punishment) => {
                self.chat
                    .timeout(target.server, identity.user, punishment)
                    .await
            }
            None => self.chat.remove_timeout(target.server, identity.user).await,
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
