//! Identity resolution between game accounts and chat accounts.
//!
//! The link table itself is owned by a [`LinkStore`] (the SQLite
//! [`Database`](crate::db::Database) in the daemon). [`IdentityResolver`]
//! reads through short-TTL caches, creates and severs links, and publishes
//! [`LinkEvent`]s. [`Roster`] turns the resolver plus game presence into
//! the identity lists that sweeps iterate.

mod cache;
mod resolver;
mod roster;

pub use cache::TtlCache;
pub use resolver::{IdentityResolver, ResolverParams};
pub use roster::Roster;

use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

use crate::db::DbError;
use crate::error::{IdentityError, PlatformError};
use crate::platform::UserId;

/// A player whose chat account is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedIdentity {
    pub player: Uuid,
    pub user: UserId,
}

impl ResolvedIdentity {
    pub fn new(player: Uuid, user: UserId) -> Self {
        Self { player, user }
    }
}

impl fmt::Display for ResolvedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ↔ {}", self.player, self.user)
    }
}

/// A change to the link table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Linked(ResolvedIdentity),
    Unlinked(ResolvedIdentity),
}

impl LinkEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LinkEvent::Linked(_) => "linked",
            LinkEvent::Unlinked(_) => "unlinked",
        }
    }

    pub fn identity(&self) -> ResolvedIdentity {
        match self {
            LinkEvent::Linked(identity) | LinkEvent::Unlinked(identity) => *identity,
        }
    }
}

/// Persistent storage of the link table.
#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn user_for_player(&self, player: Uuid) -> Result<Option<UserId>, DbError>;

    async fn player_for_user(&self, user: UserId) -> Result<Option<Uuid>, DbError>;

    /// Fails with [`DbError::AlreadyLinked`] if either side is taken.
    async fn create_link(&self, player: Uuid, user: UserId) -> Result<(), DbError>;

    /// Returns the user the player was linked to, if any.
    async fn remove_link(&self, player: Uuid) -> Result<Option<UserId>, DbError>;

    async fn touch(&self, player: Uuid) -> Result<(), DbError>;

    async fn linked_accounts(&self) -> Result<Vec<ResolvedIdentity>, DbError>;

    async fn link_count(&self) -> Result<i64, DbError>;
}

/// Confirms that a resolved pair is still linked.
///
/// The engine asks this under the pair's in-flight guard, so a sweep working
/// from an older identity snapshot never writes to a severed pair.
#[async_trait]
pub trait LinkCheck: Send + Sync {
    async fn is_linked(&self, identity: &ResolvedIdentity) -> Result<bool, IdentityError>;
}

/// External source of links, asked by `query-link`.
#[async_trait]
pub trait LinkProvider: Send + Sync {
    async fn lookup(&self, player: Uuid) -> Result<Option<UserId>, PlatformError>;
}
