//! Link status → chat role.
//!
//! Game-authoritative projection: the role is granted while the account is
//! linked and removed when it is not. Nothing is ever written to the game.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::SyncError;
use crate::identity::{IdentityResolver, ResolvedIdentity};
use crate::platform::{ChatPlatform, RoleId};
use crate::sync::{
    EntryOf, Side, SweepScope, SyncConfig, SyncDirection, SyncKind, SyncModule, TieBreaker,
    TieBreakers, TimerConfig, UnlinkBehaviour,
};

/// Fixed configuration for game → chat role projections.
pub fn projection_config(timer: TimerConfig) -> SyncConfig {
    SyncConfig {
        direction: SyncDirection::GameToChat,
        timer,
        tie_breakers: TieBreakers::all(TieBreaker::Game),
        unlink_behaviour: UnlinkBehaviour::RemoveDiscord,
    }
}

pub struct LinkedRoleSync {
    chat: Arc<dyn ChatPlatform>,
    resolver: Arc<IdentityResolver>,
}

impl LinkedRoleSync {
    pub fn new(chat: Arc<dyn ChatPlatform>, resolver: Arc<IdentityResolver>) -> Self {
        Self { chat, resolver }
    }
}

#[async_trait]
impl SyncModule for LinkedRoleSync {
    type GameId = ();
    type ChatId = RoleId;
    type State = bool;

    fn kind(&self) -> SyncKind {
        SyncKind::LinkedRole
    }

    fn sweep_scope(&self) -> SweepScope {
        SweepScope::AllLinked
    }

    async fn fetch_game_state(
        &self,
        _entry: &EntryOf<Self>,
        identity: &ResolvedIdentity,
    ) -> Result<bool, SyncError> {
        let user = self.resolver.user_for_player(identity.player).await?;
        Ok(user == Some(identity.user))
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
