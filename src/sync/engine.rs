//! The reconciliation engine.
//!
//! [`Reconciler::reconcile`] runs one entry for one identity:
//!
//! 1. entry not set → `NotConfigured`
//! 2. tie-break disabled for the cause → `NoCauseMatch`, nothing fetched
//! 3. pair already in flight → `InProgress`; pair no longer linked → `NotLinked`
//! 4. fetch both sides concurrently; either failing → `Error`
//! 5. equal → `BothMatch`
//! 6. the losing side is read-only (direction, or timer side) → `WrongDirection`
//! 7. apply the authoritative value → `AppliedToGame` / `AppliedToChat`
//!
//! Failures are logged with the entry and cause and returned as `Error`;
//! nothing escapes into a surrounding sweep.

use async_trait::async_trait;
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{Instrument, debug, error, info, warn};

use super::entry::SyncSet;
use super::inflight::{InFlightSet, PairKey};
use super::module::{EntryOf, SyncModule};
use super::registry::{SetSummary, SyncHandle};
use super::result::{ResultKind, ResultTally, SyncResult};
use super::tiebreak::{self, Resolution};
use super::types::{Cause, Side, SweepScope, SyncKind};
use crate::error::SyncError;
use crate::identity::{LinkCheck, ResolvedIdentity};
use crate::telemetry::{ReconcileTimer, spans};

/// Drives one sync kind over its configured sets.
pub struct Reconciler<M: SyncModule> {
    module: Arc<M>,
    sets: Arc<Vec<SyncSet<M::GameId, M::ChatId>>>,
    inflight: InFlightSet<PairKey>,
    links: Arc<dyn LinkCheck>,
}

impl<M: SyncModule> Clone for Reconciler<M> {
    fn clone(&self) -> Self {
        Self {
            module: Arc::clone(&self.module),
            sets: Arc::clone(&self.sets),
            inflight: self.inflight.clone(),
            links: Arc::clone(&self.links),
        }
    }
}

impl<M: SyncModule> Reconciler<M> {
    pub fn new(
        module: M,
        sets: Vec<SyncSet<M::GameId, M::ChatId>>,
        inflight: InFlightSet<PairKey>,
        links: Arc<dyn LinkCheck>,
    ) -> Self {
        Self {
            module: Arc::new(module),
            sets: Arc::new(sets),
            inflight,
            links,
        }
    }

    pub fn module(&self) -> &M {
        &self.module
    }

    pub fn sync_sets(&self) -> &[SyncSet<M::GameId, M::ChatId>] {
        &self.sets
    }

    fn pair_key(&self, entry: &EntryOf<M>, identity: &ResolvedIdentity) -> PairKey {
        PairKey::new(self.module.kind(), entry.describe(), identity.player)
    }

    /// Reconcile one entry for one identity.
    pub async fn reconcile(
        &self,
        entry: &EntryOf<M>,
        identity: &ResolvedIdentity,
        cause: Cause,
    ) -> SyncResult<M::State> {
        let kind = self.module.kind();
        let mut timer = ReconcileTimer::new(kind);
        let span = spans::reconcile(kind, &entry.describe(), &identity.player, cause);
        let result = self.reconcile_inner(entry, identity, cause).instrument(span).await;
        timer.finish(result.kind());
        result
    }

    async fn reconcile_inner(
        &self,
        entry: &EntryOf<M>,
        identity: &ResolvedIdentity,
        cause: Cause,
    ) -> SyncResult<M::State> {
        if !entry.is_set() {
            return SyncResult::NotConfigured;
        }

        let config = &entry.config;
        let authority = match tiebreak::resolve(cause, &config.tie_breakers, config.direction) {
            Resolution::Authority(side) => side,
            Resolution::Disabled => {
                debug!("tie-breaker disabled for cause");
                return SyncResult::NoCauseMatch;
            }
        };

        // Claimed before the first await so a concurrent call sees it.
        let Some(_guard) = self.inflight.try_acquire(self.pair_key(entry, identity)) else {
            crate::metrics::record_inflight_skipped(self.module.kind().flag());
            debug!("pair already in flight");
            return SyncResult::InProgress;
        };

        // Sweeps work from an identity snapshot; the link may be gone by now.
        match self.links.is_linked(identity).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("pair is no longer linked");
                return SyncResult::NotLinked;
            }
            Err(e) => {
                let e = SyncError::from(e);
                warn!(
                    kind = %self.module.kind(),
                    entry = %entry.describe(),
                    player = %identity.player,
                    cause = %cause,
                    error = %e,
                    "failed to confirm link"
                );
                return SyncResult::Error(e);
            }
        }

        let (game, chat) = tokio::join!(
            self.module.fetch_game_state(entry, identity),
            self.module.fetch_chat_state(entry, identity),
        );
        let (game, chat) = match (game, chat) {
            (Ok(game), Ok(chat)) => (game, chat),
            (Err(e), _) | (_, Err(e)) => {
                warn!(
                    kind = %self.module.kind(),
                    entry = %entry.describe(),
                    player = %identity.player,
                    cause = %cause,
                    error = %e,
                    "failed to fetch sync state"
                );
                return SyncResult::Error(e);
            }
        };

        if self.module.states_equal(&game, &chat) {
            debug!(state = ?game, "both sides match");
            return SyncResult::BothMatch(game);
        }

        let target = authority.opposite();
        if !config.direction.allows_write(target) {
            debug!(target = %target, "direction forbids writing");
            return SyncResult::WrongDirection;
        }
        if cause == Cause::Timer && !config.timer.side.allows_write(target) {
            debug!(target = %target, "timer may not write this side");
            return SyncResult::WrongDirection;
        }

        let (value, applied) = match authority {
            Side::Game => (game, SyncResult::AppliedToChat),
            Side::Chat => (chat, SyncResult::AppliedToGame),
        };
        let outcome = match target {
            Side::Game => self.module.apply_game_state(entry, identity, &value).await,
            Side::Chat => self.module.apply_chat_state(entry, identity, &value).await,
        };

        match outcome {
            Ok(()) => {
                info!(
                    kind = %self.module.kind(),
                    entry = %entry.describe(),
                    player = %identity.player,
                    cause = %cause,
                    target = %target,
                    state = ?value,
                    "applied sync state"
                );
                applied
            }
            Err(e) => {
                warn!(
                    kind = %self.module.kind(),
                    entry = %entry.describe(),
                    player = %identity.player,
                    cause = %cause,
                    error = %e,
                    "failed to apply sync state"
                );
                SyncResult::Error(e)
            }
        }
    }

    /// Remove synced state from the side named by the entry's unlink behaviour.
    ///
    /// Waits for any reconcile of the same pair to finish first, and writes
    /// only if the side does not already hold the removed state.
    pub async fn remove_synced_state(
        &self,
        entry: &EntryOf<M>,
        identity: &ResolvedIdentity,
    ) -> SyncResult<M::State> {
        let Some(side) = entry.config.unlink_behaviour.target() else {
            return SyncResult::NoCauseMatch;
        };
        if !entry.is_set() {
            return SyncResult::NotConfigured;
        }

        let _guard = self.inflight.acquire(self.pair_key(entry, identity)).await;

        let current = match side {
            Side::Game => self.module.fetch_game_state(entry, identity).await,
            Side::Chat => self.module.fetch_chat_state(entry, identity).await,
        };
        let current = match current {
            Ok(current) => current,
            Err(e) => {
                warn!(
                    kind = %self.module.kind(),
                    entry = %entry.describe(),
                    player = %identity.player,
                    error = %e,
                    "failed to fetch state for unlink"
                );
                return SyncResult::Error(e);
            }
        };

        let removed = self.module.removed_state();
        if self.module.states_equal(&current, &removed) {
            return SyncResult::BothMatch(current);
        }

        let outcome = match side {
            Side::Game => self.module.apply_game_state(entry, identity, &removed).await,
            Side::Chat => self.module.apply_chat_state(entry, identity, &removed).await,
        };
        match outcome {
            Ok(()) => {
                info!(
                    kind = %self.module.kind(),
                    entry = %entry.describe(),
                    player = %identity.player,
                    side = %side,
                    "removed synced state after unlink"
                );
                match side {
                    Side::Game => SyncResult::AppliedToGame,
                    Side::Chat => SyncResult::AppliedToChat,
                }
            }
            Err(e) => {
                warn!(
                    kind = %self.module.kind(),
                    entry = %entry.describe(),
                    player = %identity.player,
                    error = %e,
                    "failed to remove state after unlink"
                );
                SyncResult::Error(e)
            }
        }
    }

    /// Spawn one task per (entry, identity) and tally the outcomes.
    async fn fan_out(
        &self,
        entries: Vec<EntryOf<M>>,
        identities: Arc<[ResolvedIdentity]>,
        cause: Cause,
    ) -> ResultTally {
        let mut tasks = Vec::with_capacity(entries.len() * identities.len());
        for entry in entries {
            let entry = Arc::new(entry);
            for identity in identities.iter().copied() {
                let this = self.clone();
                let entry = Arc::clone(&entry);
                tasks.push(tokio::spawn(async move {
                    this.reconcile(&entry, &identity, cause).await.kind()
                }));
            }
        }

        let mut tally = ResultTally::new();
        for joined in join_all(tasks).await {
            match joined {
                Ok(kind) => tally.record(kind),
                Err(joined) => {
                    let e = SyncError::Task(joined.to_string());
                    error!(
                        kind = %self.module.kind(),
                        code = e.error_code(),
                        error = %e,
                        "reconcile task failed"
                    );
                    tally.record(ResultKind::Error);
                }
            }
        }
        tally
    }
}

#[async_trait]
impl<M: SyncModule> SyncHandle for Reconciler<M> {
    fn kind(&self) -> SyncKind {
        self.module.kind()
    }

    fn scope(&self) -> SweepScope {
        self.module.sweep_scope()
    }

    fn sets(&self) -> Vec<SetSummary> {
        self.sets
            .iter()
            .map(|set| SetSummary {
                name: set.name.clone(),
                entries: set.entries.len(),
                timer: set.config.timer,
            })
            .collect()
    }

    async fn sync_identity(&self, identity: &ResolvedIdentity, cause: Cause) -> ResultTally {
        let calls: Vec<_> = self
            .sets
            .iter()
            .flat_map(|set| set.entries.iter())
            .map(|entry| self.reconcile(entry, identity, cause))
            .collect();
        join_all(calls).await.iter().map(SyncResult::kind).collect()
    }

    async fn sweep_set(
        &self,
        set: usize,
        identities: Arc<[ResolvedIdentity]>,
        cause: Cause,
    ) -> ResultTally {
        let Some(sync_set) = self.sets.get(set) else {
            return ResultTally::new();
        };
        let kind = self.module.kind();
        crate::metrics::record_sweep(kind.flag(), cause.name());
        let span = spans::sweep(kind, &sync_set.name, cause);
        self.fan_out(sync_set.entries.clone(), identities, cause)
            .instrument(span)
            .await
    }

    async fn resync(&self, identities: Arc<[ResolvedIdentity]>, cause: Cause) -> ResultTally {
        let kind = self.module.kind();
        crate::metrics::record_sweep(kind.flag(), cause.name());
        let entries: Vec<_> = self
            .sets
            .iter()
            .flat_map(|set| set.entries.iter().cloned())
            .collect();
        let span = spans::sweep(kind, "*", cause);
        self.fan_out(entries, identities, cause).instrument(span).await
    }

    async fn unlink(&self, identity: &ResolvedIdentity) -> ResultTally {
        let calls = self
            .sets
            .iter()
            .filter(|set| set.config.unlink_behaviour.target().is_some())
            .flat_map(|set| set.entries.iter())
            .map(|entry| self.remove_synced_state(entry, identity))
            .collect::<Vec<_>>();
        join_all(calls).await.iter().map(SyncResult::kind).collect()
    }
}
