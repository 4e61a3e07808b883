//! Read-through identity resolver with link management.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{Instrument, debug, info};
use uuid::Uuid;

use super::cache::TtlCache;
use super::{LinkCheck, LinkEvent, LinkProvider, LinkStore, ResolvedIdentity};
use crate::db::DbError;
use crate::error::IdentityError;
use crate::platform::UserId;
use crate::security::LinkCooldown;
use crate::telemetry::spans;

/// Link events buffered per subscriber.
const EVENT_CAPACITY: usize = 256;

/// Construction parameters for [`IdentityResolver`].
pub struct ResolverParams {
    pub store: Arc<dyn LinkStore>,
    pub provider: Option<Arc<dyn LinkProvider>>,
    pub cache_ttl: Duration,
    pub link_cooldown: Duration,
}

/// Resolves players to chat accounts and back.
pub struct IdentityResolver {
    store: Arc<dyn LinkStore>,
    provider: Option<Arc<dyn LinkProvider>>,
    by_player: TtlCache<Uuid, Option<UserId>>,
    by_user: TtlCache<UserId, Option<Uuid>>,
    cooldown: LinkCooldown,
    events: broadcast::Sender<LinkEvent>,
    /// Bumped on every link change; store reads that straddle a change are
    /// not cached.
    generation: AtomicU64,
}

impl IdentityResolver {
    pub fn new(params: ResolverParams) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store: params.store,
            provider: params.provider,
            by_player: TtlCache::new(params.cache_ttl),
            by_user: TtlCache::new(params.cache_ttl),
            cooldown: LinkCooldown::new(params.link_cooldown),
            events,
            generation: AtomicU64::new(0),
        }
    }

    /// Receive every link and unlink from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.events.subscribe()
    }

    pub async fn user_for_player(&self, player: Uuid) -> Result<Option<UserId>, IdentityError> {
        if let Some(cached) = self.by_player.get(&player) {
            return Ok(cached);
        }
        let generation = self.generation.load(Ordering::Acquire);
        let user = self.store.user_for_player(player).await?;
        if self.generation.load(Ordering::Acquire) == generation {
            self.by_player.insert(player, user);
            if let Some(user) = user {
                self.by_user.insert(user, Some(player));
            }
        }
        Ok(user)
    }

    pub async fn player_for_user(&self, user: UserId) -> Result<Option<Uuid>, IdentityError> {
        if let Some(cached) = self.by_user.get(&user) {
            return Ok(cached);
        }
        let generation = self.generation.load(Ordering::Acquire);
        let player = self.store.player_for_user(user).await?;
        if self.generation.load(Ordering::Acquire) == generation {
            self.by_user.insert(user, player);
            if let Some(player) = player {
                self.by_player.insert(player, Some(user));
            }
        }
        Ok(player)
    }

    /// Cache-only lookup for hot paths.
    ///
    /// `None` means "not cached"; `Some(None)` means "cached as unlinked".
    pub fn cached_user_for_player(&self, player: Uuid) -> Option<Option<UserId>> {
        self.by_player.get(&player)
    }

    pub async fn resolve_player(
        &self,
        player: Uuid,
    ) -> Result<Option<ResolvedIdentity>, IdentityError> {
        Ok(self
            .user_for_player(player)
            .await?
            .map(|user| ResolvedIdentity::new(player, user)))
    }

    pub async fn resolve_user(&self, user: UserId) -> Result<Option<ResolvedIdentity>, IdentityError> {
        Ok(self
            .player_for_user(user)
            .await?
            .map(|player| ResolvedIdentity::new(player, user)))
    }

    /// Persist a link and publish [`LinkEvent::Linked`].
    pub async fn link(&self, player: Uuid, user: UserId) -> Result<ResolvedIdentity, IdentityError> {
        async {
            match self.store.create_link(player, user).await {
                Ok(()) => {}
                Err(DbError::AlreadyLinked) => {
                    return Err(IdentityError::AlreadyLinked { player, user });
                }
                Err(e) => return Err(e.into()),
            }
            self.invalidate(player, user);

            let identity = ResolvedIdentity::new(player, user);
            info!(user = %user, "account linked");
            self.publish(LinkEvent::Linked(identity));
            Ok::<_, IdentityError>(identity)
        }
        .instrument(spans::link("linked", &player))
        .await
    }

    /// Remove a player's link and publish [`LinkEvent::Unlinked`].
    ///
    /// Returns the severed identity, or `None` if the player was not linked.
    pub async fn unlink_player(
        &self,
        player: Uuid,
    ) -> Result<Option<ResolvedIdentity>, IdentityError> {
        async {
            let Some(user) = self.store.remove_link(player).await? else {
                debug!("unlink requested for unlinked player");
                self.by_player.invalidate(&player);
                return Ok(None);
            };
            self.invalidate(player, user);
            self.cooldown.forget(player);

            let identity = ResolvedIdentity::new(player, user);
            info!(user = %user, "account unlinked");
            self.publish(LinkEvent::Unlinked(identity));
            Ok::<_, IdentityError>(Some(identity))
        }
        .instrument(spans::link("unlinked", &player))
        .await
    }

    /// Ask the link provider for the player's chat account and link it.
    ///
    /// One attempt per player per cooldown window, counted before anything
    /// else is looked up. An existing link is returned as is.
    pub async fn query_link(&self, player: Uuid) -> Result<Option<ResolvedIdentity>, IdentityError> {
        if !self.cooldown.check(player) {
            crate::metrics::record_link_rate_limited();
            return Err(IdentityError::RateLimited(player));
        }
        if let Some(existing) = self.resolve_player(player).await? {
            return Ok(Some(existing));
        }
        let provider = self.provider.as_ref().ok_or(IdentityError::NoProvider)?;
        match provider.lookup(player).await? {
            Some(user) => self.link(player, user).await.map(Some),
            None => {
                debug!(player = %player, "link provider has no account for player");
                Ok(None)
            }
        }
    }

    /// Record that a linked player was seen.
    pub async fn touch(&self, player: Uuid) -> Result<(), IdentityError> {
        self.store.touch(player).await?;
        Ok(())
    }

    pub async fn linked_accounts(&self) -> Result<Vec<ResolvedIdentity>, IdentityError> {
        Ok(self.store.linked_accounts().await?)
    }

    pub async fn link_count(&self) -> Result<i64, IdentityError> {
        Ok(self.store.link_count().await?)
    }

    fn invalidate(&self, player: Uuid, user: UserId) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.by_player.invalidate(&player);
        self.by_user.invalidate(&user);
    }

    fn publish(&self, event: LinkEvent) {
        crate::metrics::record_link_event(event.name());
        // Fails only when nobody is subscribed.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl LinkCheck for IdentityResolver {
    async fn is_linked(&self, identity: &ResolvedIdentity) -> Result<bool, IdentityError> {
        Ok(self.user_for_player(identity.player).await? == Some(identity.user))
    }
}
