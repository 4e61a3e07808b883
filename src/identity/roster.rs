//! Identity lists for sweeps.

use async_trait::async_trait;
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::warn;

use super::{IdentityResolver, ResolvedIdentity};
use crate::platform::GamePlatform;
use crate::sync::{IdentitySource, SweepScope};

/// Combines game presence with the link table.
pub struct Roster {
    resolver: Arc<IdentityResolver>,
    game: Arc<dyn GamePlatform>,
}

impl Roster {
    pub fn new(resolver: Arc<IdentityResolver>, game: Arc<dyn GamePlatform>) -> Self {
        Self { resolver, game }
    }

    /// Online players that have a linked chat account.
    ///
    /// Players whose link lookup fails are left out and logged.
    pub async fn online(&self) -> Vec<ResolvedIdentity> {
        let players = match self.game.online_players().await {
            Ok(players) => players,
            Err(e) => {
                warn!(error = %e, "failed to list online players");
                return Vec::new();
            }
        };

        let lookups = players.iter().map(|player| self.resolver.resolve_player(*player));
        let mut identities = Vec::with_capacity(players.len());
        for (player, resolved) in players.iter().zip(join_all(lookups).await) {
            match resolved {
                Ok(Some(identity)) => identities.push(identity),
                Ok(None) => {}
                Err(e) => warn!(player = %player, error = %e, "failed to resolve online player"),
            }
        }
        identities
    }

    /// Every linked account, online or not.
    pub async fn all_linked(&self) -> Vec<ResolvedIdentity> {
        match self.resolver.linked_accounts().await {
            Ok(identities) => identities,
            Err(e) => {
                warn!(error = %e, "failed to list linked accounts");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl IdentitySource for Roster {
    async fn identities(&self, scope: SweepScope) -> Vec<ResolvedIdentity> {
        match scope {
            SweepScope::Online => self.online().await,
            SweepScope::AllLinked => self.all_linked().await,
        }
    }
}
