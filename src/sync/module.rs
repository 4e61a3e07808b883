//! The capability interface each sync kind provides to the engine.

use async_trait::async_trait;
use std::fmt;

use super::entry::{SyncEntry, SyncId};
use super::types::{SweepScope, SyncKind};
use crate::error::SyncError;
use crate::identity::ResolvedIdentity;

/// Entry type of a module.
pub type EntryOf<M> = SyncEntry<<M as SyncModule>::GameId, <M as SyncModule>::ChatId>;

/// Fetch, apply and compare primitives for one sync kind.
///
/// Apply calls must be idempotent: writing a state the side already holds
/// must neither fail nor fire downstream effects a second time.
#[async_trait]
pub trait SyncModule: Send + Sync + 'static {
    type GameId: SyncId;
    type ChatId: SyncId;
    type State: Clone + fmt::Debug + Send + Sync + 'static;

    fn kind(&self) -> SyncKind;

    /// Identities visited by timer sweeps.
    fn sweep_scope(&self) -> SweepScope {
        SweepScope::Online
    }

    async fn fetch_game_state(
        &self,
        entry: &SyncEntry<Self::GameId, Self::ChatId>,
        identity: &ResolvedIdentity,
    ) -> Result<Self::State, SyncError>;

    async fn fetch_chat_state(
        &self,
        entry: &SyncEntry<Self::GameId, Self::ChatId>,
        identity: &ResolvedIdentity,
    ) -> Result<Self::State, SyncError>;

    async fn apply_game_state(
        &self,
        entry: &SyncEntry<Self::GameId, Self::ChatId>,
        identity: &ResolvedIdentity,
        state: &Self::State,
    ) -> Result<(), SyncError>;

    async fn apply_chat_state(
        &self,
        entry: &SyncEntry<Self::GameId, Self::ChatId>,
        identity: &ResolvedIdentity,
        state: &Self::State,
    ) -> Result<(), SyncError>;

    fn states_equal(&self, a: &Self::State, b: &Self::State) -> bool;

    /// The canonical "absent" value, applied on unlink.
    fn removed_state(&self) -> Self::State;
}
