//! Permission group ↔ chat role.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::SyncError;
use crate::identity::ResolvedIdentity;
use crate::platform::{ChatPlatform, GamePlatform, GroupKey, RoleId};
use crate::sync::{EntryOf, Side, SyncKind, SyncModule};

/// Membership of one group mirrored as one role. State is "has it".
pub struct GroupSync {
    chat: Arc<dyn ChatPlatform>,
    game: Arc<dyn GamePlatform>,
}

impl GroupSync {
    pub fn new(chat: Arc<dyn ChatPlatform>, game: Arc<dyn GamePlatform>) -> Self {
        Self { chat, game }
    }
}

#[async_trait]
impl SyncModule for GroupSync {
    type GameId = GroupKey;
    type ChatId = RoleId;
    type State = bool;

    fn kind(&self) -> SyncKind {
        SyncKind::Groups
    }

    async fn fetch_game_state(
        &self,
        entry: &EntryOf<Self>,
        identity: &ResolvedIdentity,
    ) -> Result<bool, SyncError> {
        self.game
            .has_group(identity.player, &entry.game_id)
            .await
            .map_err(SyncError::fetch(Side::Game))
    }

    async fn fetch_chat_state(
        &self,
        entry: &EntryOf<Self>,
        identity: &ResolvedIdentity,
    ) -> Result<bool, SyncError> {
        self.chat
            .has_role(identity.user, entry.chat_id)
            .await
            .map_err(SyncError::fetch(Side::Chat))
    }

    async fn apply_game_state(
        &self,
        entry: &EntryOf<Self>,
        identity: &ResolvedIdentity,
        state: &bool,
    ) -> Result<(), SyncError> {
        let current = self
            .game
            .has_group(identity.player, &entry.game_id)
            .await
            .map_err(SyncError::apply(Side::Game))?;
        if current == *state {
            return Ok(());
        }
        let written = if *state {
            self.game.add_group(identity.player, &entry.game_id).await
        } else {
            self.game.remove_group(identity.player, &entry.game_id).await
        };
        written.map_err(SyncError::apply(Side::Game))
    }

    async fn apply_chat_state(
        &self,
        entry: &EntryOf<Self>,
        identity: &ResolvedIdentity,
        state: &bool,
    ) -> Result<(), SyncError> {
        super::apply_role(self.chat.as_ref(), identity, entry.chat_id, *state).await
    }

    fn states_equal(&self, a: &bool, b: &bool) -> bool {
        a == b
    }

    fn removed_state(&self) -> bool {
        false
    }
}
