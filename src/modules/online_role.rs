//! Presence → chat role.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::SyncError;
use crate::identity::ResolvedIdentity;
use crate::platform::{ChatPlatform, GamePlatform, RoleId};
use crate::sync::{EntryOf, Side, SweepScope, SyncKind, SyncModule};

/// Grants the role while the player is online. Sweeps cover every linked
/// account so offline players lose a stale role too.
pub struct OnlineRoleSync {
    chat: Arc<dyn ChatPlatform>,
    game: Arc<dyn GamePlatform>,
}

impl OnlineRoleSync {
    pub fn new(chat: Arc<dyn ChatPlatform>, game: Arc<dyn GamePlatform>) -> Self {
        Self { chat, game }
    }
}

#[async_trait]
impl SyncModule for OnlineRoleSync {
    type GameId = ();
    type ChatId = RoleId;
    type State = bool;

    fn kind(&self) -> SyncKind {
        SyncKind::OnlineRole
    }

    fn sweep_scope(&self) -> SweepScope {
        SweepScope::AllLinked
    }

    async fn fetch_game_state(
        &self,
        _entry: &EntryOf<Self>,
        identity: &ResolvedIdentity,
    ) -> Result<bool, SyncError> {
        self.game
            .is_online(identity.player)
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
        _entry: &EntryOf<Self>,
        _identity: &ResolvedIdentity,
        _state: &bool,
    ) -> Result<(), SyncError> {
        Err(SyncError::Unsupported { side: Side::Game })
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
