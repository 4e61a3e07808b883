//! The bridge: wires identity, sync kinds and triggers together.
//!
//! A [`Bridge`] owns the active [`SyncRegistry`] and the timer scheduler.
//! Triggers (player join/quit, link events, API calls, manual resync) all
//! enter here, resolve the identity, and hand the pair to the registry.

use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::command::ResyncRequest;
use crate::config::{Config, ValidationError, validate};
use crate::error::{CommandError, IdentityError};
use crate::identity::{IdentityResolver, LinkEvent, ResolvedIdentity, Roster};
use crate::modules::{ModuleContext, build_registry};
use crate::platform::{ChatPlatform, GamePlatform};
use crate::sync::{
    Cause, InFlightSet, PairKey, ResultKind, ResultTally, ResyncReport, SetSummary, SyncKind,
    SyncRegistry, TimerScheduler, resync_all,
};

/// Construction parameters for [`Bridge`].
pub struct BridgeParams<'a> {
    pub config: &'a Config,
    pub resolver: Arc<IdentityResolver>,
    pub chat: Arc<dyn ChatPlatform>,
    pub game: Arc<dyn GamePlatform>,
}

/// Snapshot for the `status` command.
#[derive(Debug, Clone)]
pub struct BridgeStatus {
    pub name: String,
    pub kinds: Vec<(SyncKind, Vec<SetSummary>)>,
    pub timers: usize,
    pub links: i64,
    pub inflight: usize,
}

impl BridgeStatus {
    pub fn render(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{}: {} linked accounts, {} timers, {} pairs in flight",
            self.name, self.links, self.timers, self.inflight
        )];
        if self.kinds.is_empty() {
            lines.push("  no sync kinds active".to_string());
        }
        for (kind, sets) in &self.kinds {
            for set in sets {
                let timer = if set.timer.side.is_enabled() {
                    format!("every {}s", set.timer.cycle_secs)
                } else {
                    "no timer".to_string()
                };
                lines.push(format!(
                    "  {kind}/{}: {} entries, {timer}",
                    set.name, set.entries
                ));
            }
        }
        lines
    }
}

pub struct Bridge {
    name: String,
    resolver: Arc<IdentityResolver>,
    roster: Arc<Roster>,
    modules: ModuleContext,
    registry: RwLock<Arc<SyncRegistry>>,
    scheduler: TimerScheduler,
    inflight: InFlightSet<PairKey>,
    minimum_delay: Mutex<Duration>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Bridge {
    /// Build the bridge and its initial registry. Nothing runs until
    /// [`Bridge::start`].
    pub fn new(params: BridgeParams<'_>) -> Arc<Self> {
        let modules = ModuleContext {
            chat: params.chat,
            game: Arc::clone(&params.game),
            resolver: Arc::clone(&params.resolver),
        };
        let roster = Arc::new(Roster::new(Arc::clone(&params.resolver), params.game));
        let inflight = InFlightSet::new();
        let registry = build_registry(&params.config.sync, &modules, &inflight);

        Arc::new(Self {
            name: params.config.bridge.name.clone(),
            resolver: params.resolver,
            roster,
            modules,
            registry: RwLock::new(Arc::new(registry)),
            scheduler: TimerScheduler::new(),
            inflight,
            minimum_delay: Mutex::new(params.config.timer.minimum_delay()),
            listener: Mutex::new(None),
        })
    }

    /// Start the link-event listener and the timer sweeps.
    pub fn start(self: &Arc<Self>) {
        let mut events = self.resolver.subscribe();
        let bridge: Weak<Bridge> = Arc::downgrade(self);
        let listener = tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "link event listener lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let Some(bridge) = bridge.upgrade() else {
                    break;
                };
                bridge.handle_link_event(event).await;
            }
            debug!("link event listener stopped");
        });
        if let Some(old) = self.listener.lock().replace(listener) {
            old.abort();
        }

        let timers = self.schedule_timers();
        info!(bridge = %self.name, timers, kinds = ?self.registry().active_kinds(), "bridge started");
    }

    /// Stop timers and the link-event listener.
    pub fn shutdown(&self) {
        self.scheduler.cancel_all();
        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
        }
        info!(bridge = %self.name, "bridge stopped");
    }

    pub fn resolver(&self) -> &Arc<IdentityResolver> {
        &self.resolver
    }

    /// The registry currently in effect.
    pub fn registry(&self) -> Arc<SyncRegistry> {
        Arc::clone(&self.registry.read())
    }

    pub fn active_timers(&self) -> usize {
        self.scheduler.active_timers()
    }

    fn schedule_timers(&self) -> usize {
        let registry = self.registry();
        let source = Arc::clone(&self.roster) as Arc<dyn crate::sync::IdentitySource>;
        self.scheduler
            .reschedule(&registry, source, *self.minimum_delay.lock())
    }

    /// React to a link change: LINK reconciliation on link, unlink behaviour
    /// on unlink.
    pub async fn handle_link_event(&self, event: LinkEvent) -> ResultTally {
        let identity = event.identity();
        let registry = self.registry();
        let mut tally = ResultTally::new();
        for handle in registry.handles() {
            let outcome = match event {
                LinkEvent::Linked(_) => handle.sync_identity(&identity, Cause::Link).await,
                LinkEvent::Unlinked(_) => handle.unlink(&identity).await,
            };
            tally.merge(&outcome);
        }
        info!(event = event.name(), identity = %identity, result = %tally, "link event handled");
        tally
    }

    /// A player joined the game.
    pub async fn on_player_join(&self, player: Uuid) -> ResultTally {
        let identity = match self.resolver.cached_user_for_player(player) {
            Some(Some(user)) => Some(ResolvedIdentity::new(player, user)),
            Some(None) => None,
            None => match self.resolver.resolve_player(player).await {
                Ok(identity) => identity,
                Err(e) => return lookup_failed(player, e),
            },
        };
        let Some(identity) = identity else {
            debug!(player = %player, "joined player is not linked");
            return not_linked();
        };

        if let Err(e) = self.resolver.touch(player).await {
            warn!(player = %player, error = %e, "failed to record last seen");
        }
        self.sync_identity(&identity, Cause::GameJoin, None).await
    }

    /// A player left the game. Only presence sync reacts.
    pub async fn on_player_quit(&self, player: Uuid) -> ResultTally {
        match self.resolver.resolve_player(player).await {
            Ok(Some(identity)) => {
                self.sync_identity(&identity, Cause::GameQuit, Some(SyncKind::OnlineRole))
                    .await
            }
            Ok(None) => not_linked(),
            Err(e) => lookup_failed(player, e),
        }
    }

    /// Reconcile every active kind for one player.
    pub async fn sync_player(&self, player: Uuid, cause: Cause) -> ResultTally {
        match self.resolver.resolve_player(player).await {
            Ok(Some(identity)) => self.sync_identity(&identity, cause, None).await,
            Ok(None) => not_linked(),
            Err(e) => lookup_failed(player, e),
        }
    }

    async fn sync_identity(
        &self,
        identity: &ResolvedIdentity,
        cause: Cause,
        only: Option<SyncKind>,
    ) -> ResultTally {
        let registry = self.registry();
        let mut tally = ResultTally::new();
        for handle in registry
            .handles()
            .iter()
            .filter(|h| only.is_none_or(|kind| h.kind() == kind))
        {
            tally.merge(&handle.sync_identity(identity, cause).await);
        }
        debug!(identity = %identity, cause = %cause, result = %tally, "identity synced");
        tally
    }

    /// Manual resync over every online linked player.
    pub async fn resync(
        &self,
        request: &ResyncRequest,
        cause: Cause,
    ) -> Result<ResyncReport, CommandError> {
        let registry = self.registry();
        let kinds = request.select(&registry)?;
        let identities = self.roster.online().await;
        Ok(resync_all(&registry, &kinds, identities, cause).await)
    }

    /// Swap in the sync sets of `config` and restart the timers.
    ///
    /// Fatal validation errors leave the running registry untouched. Sets
    /// with their own errors are left out of the new registry.
    pub fn reload(&self, config: &Config) -> Result<usize, Vec<ValidationError>> {
        if let Err(errors) = validate(config) {
            let fatal: Vec<ValidationError> =
                errors.into_iter().filter(ValidationError::is_fatal).collect();
            if !fatal.is_empty() {
                for e in &fatal {
                    error!(error = %e, "reload rejected");
                }
                return Err(fatal);
            }
        }

        let registry = build_registry(&config.sync, &self.modules, &self.inflight);
        *self.minimum_delay.lock() = config.timer.minimum_delay();
        *self.registry.write() = Arc::new(registry);
        let timers = self.schedule_timers();
        info!(bridge = %self.name, timers, kinds = ?self.registry().active_kinds(), "configuration reloaded");
        Ok(timers)
    }

    pub async fn status(&self) -> BridgeStatus {
        let registry = self.registry();
        let links = match self.resolver.link_count().await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "failed to count links");
                0
            }
        };
        BridgeStatus {
            name: self.name.clone(),
            kinds: registry
                .handles()
                .iter()
                .map(|handle| (handle.kind(), handle.sets()))
                .collect(),
            timers: self.scheduler.active_timers(),
            links,
            inflight: self.inflight.len(),
        }
    }
}

fn not_linked() -> ResultTally {
    [ResultKind::NotLinked].into_iter().collect()
}

fn lookup_failed(player: Uuid, e: IdentityError) -> ResultTally {
    warn!(player = %player, error = %e, "identity lookup failed");
    [ResultKind::Error].into_iter().collect()
}
