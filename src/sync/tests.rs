use super::*;
use crate::error::{IdentityError, PlatformError, SyncError};
use crate::identity::{LinkCheck, ResolvedIdentity};
use crate::platform::{RoleId, UserId};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// Boolean flag on both sides, counting every call.
#[derive(Default)]
struct CountingFlag {
    game: Mutex<HashMap<Uuid, bool>>,
    chat: Mutex<HashMap<UserId, bool>>,
    failing: Mutex<HashSet<Uuid>>,
    panicking: Mutex<HashSet<Uuid>>,
    latency: Duration,
    fetches: AtomicUsize,
    game_applies: AtomicUsize,
    chat_applies: AtomicUsize,
}

impl CountingFlag {
    fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    fn seed(&self, identity: &ResolvedIdentity, game: bool, chat: bool) {
        self.game.lock().insert(identity.player, game);
        self.chat.lock().insert(identity.user, chat);
    }

    fn fail_for(&self, identity: &ResolvedIdentity) {
        self.failing.lock().insert(identity.player);
    }

    fn panic_for(&self, identity: &ResolvedIdentity) {
        self.panicking.lock().insert(identity.player);
    }

    fn game_value(&self, identity: &ResolvedIdentity) -> bool {
        self.game.lock().get(&identity.player).copied().unwrap_or(false)
    }

    fn chat_value(&self, identity: &ResolvedIdentity) -> bool {
        self.chat.lock().get(&identity.user).copied().unwrap_or(false)
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn game_applies(&self) -> usize {
        self.game_applies.load(Ordering::SeqCst)
    }

    fn chat_applies(&self) -> usize {
        self.chat_applies.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl SyncModule for CountingFlag {
    type GameId = ();
    type ChatId = RoleId;
    type State = bool;

    fn kind(&self) -> SyncKind {
        SyncKind::LinkedRole
    }

    async fn fetch_game_state(
        &self,
        _entry: &EntryOf<Self>,
        identity: &ResolvedIdentity,
    ) -> Result<bool, SyncError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        if self.panicking.lock().contains(&identity.player) {
            panic!("game state unreadable");
        }
        if self.failing.lock().contains(&identity.player) {
            return Err(SyncError::fetch(Side::Game)(PlatformError::Unavailable(
                "test".into(),
            )));
        }
        Ok(self.game_value(identity))
    }

    async fn fetch_chat_state(
        &self,
        _entry: &EntryOf<Self>,
        identity: &ResolvedIdentity,
    ) -> Result<bool, SyncError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        Ok(self.chat_value(identity))
    }

    async fn apply_game_state(
        &self,
        _entry: &EntryOf<Self>,
        identity: &ResolvedIdentity,
        state: &bool,
    ) -> Result<(), SyncError> {
        self.game_applies.fetch_add(1, Ordering::SeqCst);
        self.game.lock().insert(identity.player, *state);
        Ok(())
    }

    async fn apply_chat_state(
        &self,
        _entry: &EntryOf<Self>,
        identity: &ResolvedIdentity,
        state: &bool,
    ) -> Result<(), SyncError> {
        self.chat_applies.fetch_add(1, Ordering::SeqCst);
        self.chat.lock().insert(identity.user, *state);
        Ok(())
    }

    fn states_equal(&self, a: &bool, b: &bool) -> bool {
        a == b
    }

    fn removed_state(&self) -> bool {
        false
    }
}

/// Every pair is linked until severed.
#[derive(Default)]
struct LinkTable {
    severed: Mutex<HashSet<Uuid>>,
}

impl LinkTable {
    fn sever(&self, identity: &ResolvedIdentity) {
        self.severed.lock().insert(identity.player);
    }
}

#[async_trait]
impl LinkCheck for LinkTable {
    async fn is_linked(&self, identity: &ResolvedIdentity) -> Result<bool, IdentityError> {
        Ok(!self.severed.lock().contains(&identity.player))
    }
}

fn identity(n: u64) -> ResolvedIdentity {
    ResolvedIdentity::new(Uuid::from_u128(n as u128), UserId(1000 + n))
}

fn reconciler(module: CountingFlag, config: SyncConfig) -> Reconciler<CountingFlag> {
    reconciler_with_links(module, config, Arc::new(LinkTable::default()))
}

fn reconciler_with_links(
    module: CountingFlag,
    config: SyncConfig,
    links: Arc<LinkTable>,
) -> Reconciler<CountingFlag> {
    let set = SyncSet::new("test", config).with_entry((), RoleId(123));
    Reconciler::new(module, vec![set], InFlightSet::new(), links)
}

fn entry(reconciler: &Reconciler<CountingFlag>) -> EntryOf<CountingFlag> {
    reconciler.sync_sets()[0].entries[0].clone()
}

fn config(direction: SyncDirection, tie_breakers: TieBreakers) -> SyncConfig {
    SyncConfig {
        direction,
        tie_breakers,
        ..SyncConfig::default()
    }
}

#[tokio::test]
async fn matching_states_are_idempotent() {
    let id = identity(1);
    let module = CountingFlag::default();
    module.seed(&id, true, true);
    let r = reconciler(module, config(SyncDirection::GameToChat, TieBreakers::new()));
    let entry = entry(&r);

    for _ in 0..2 {
        let result = r.reconcile(&entry, &id, Cause::Command).await;
        assert!(matches!(result, SyncResult::BothMatch(true)));
    }
    assert_eq!(r.module().game_applies() + r.module().chat_applies(), 0);
}

#[tokio::test]
async fn one_way_direction_falls_back_to_its_source() {
    let id = identity(1);
    let module = CountingFlag::default();
    module.seed(&id, true, false);
    let r = reconciler(module, config(SyncDirection::GameToChat, TieBreakers::new()));

    let result = r.reconcile(&entry(&r), &id, Cause::Link).await;
    assert_eq!(result.kind(), ResultKind::AppliedToChat);
    assert!(r.module().chat_value(&id));
    assert_eq!(r.module().game_applies(), 0);
}

#[tokio::test]
async fn game_to_chat_never_writes_game() {
    let id = identity(1);
    let module = CountingFlag::default();
    module.seed(&id, false, true);
    let table = TieBreakers::new().with(Cause::Link, TieBreaker::Chat);
    let r = reconciler(module, config(SyncDirection::GameToChat, table));

    let result = r.reconcile(&entry(&r), &id, Cause::Link).await;
    assert_eq!(result.kind(), ResultKind::WrongDirection);
    assert_eq!(r.module().game_applies(), 0);
    assert_eq!(r.module().chat_applies(), 0);
}

#[tokio::test]
async fn chat_to_game_never_writes_chat() {
    let id = identity(1);
    let module = CountingFlag::default();
    module.seed(&id, true, false);
    let table = TieBreakers::new().with(Cause::GameJoin, TieBreaker::Game);
    let r = reconciler(module, config(SyncDirection::ChatToGame, table));

    let result = r.reconcile(&entry(&r), &id, Cause::GameJoin).await;
    assert_eq!(result.kind(), ResultKind::WrongDirection);
    assert_eq!(r.module().chat_applies(), 0);
    assert_eq!(r.module().game_applies(), 0);
}

#[tokio::test]
async fn bidirectional_without_tie_breaker_does_nothing() {
    let id = identity(1);
    let module = CountingFlag::default();
    module.seed(&id, true, false);
    let table = TieBreakers::new().with(Cause::Link, TieBreaker::Chat);
    let r = reconciler(module, config(SyncDirection::Bidirectional, table));

    let result = r.reconcile(&entry(&r), &id, Cause::Command).await;
    assert_eq!(result.kind(), ResultKind::NoCauseMatch);
    assert_eq!(r.module().fetches(), 0);
    assert_eq!(r.module().game_applies() + r.module().chat_applies(), 0);
}

#[tokio::test]
async fn disabled_tie_breaker_skips_fetching() {
    let id = identity(1);
    let module = CountingFlag::default();
    module.seed(&id, true, false);
    let table = TieBreakers::new().with(Cause::GameJoin, TieBreaker::Disabled);
    let r = reconciler(module, config(SyncDirection::GameToChat, table));

    let result = r.reconcile(&entry(&r), &id, Cause::GameJoin).await;
    assert_eq!(result.kind(), ResultKind::NoCauseMatch);
    assert_eq!(r.module().fetches(), 0);
}

#[tokio::test]
async fn unset_entry_is_not_configured() {
    let id = identity(1);
    let set = SyncSet::new("test", SyncConfig::default()).with_entry((), RoleId(0));
    let r = Reconciler::new(
        CountingFlag::default(),
        vec![set],
        InFlightSet::new(),
        Arc::new(LinkTable::default()),
    );

    let result = r.reconcile(&entry(&r), &id, Cause::Link).await;
    assert_eq!(result.kind(), ResultKind::NotConfigured);
    assert_eq!(r.module().fetches(), 0);
}

#[tokio::test]
async fn fetch_failure_is_an_error_result() {
    let id = identity(1);
    let module = CountingFlag::default();
    module.seed(&id, true, false);
    module.fail_for(&id);
    let r = reconciler(module, config(SyncDirection::GameToChat, TieBreakers::new()));

    let result = r.reconcile(&entry(&r), &id, Cause::Command).await;
    assert!(matches!(
        result,
        SyncResult::Error(SyncError::Fetch {
            side: Side::Game,
            ..
        })
    ));
    assert_eq!(r.module().chat_applies(), 0);
    assert!(!r.module().chat_value(&id));
}

#[tokio::test(start_paused = true)]
async fn concurrent_calls_apply_at_most_once() {
    let id = identity(1);
    let module = CountingFlag::with_latency(Duration::from_millis(50));
    module.seed(&id, true, false);
    let r = reconciler(module, config(SyncDirection::GameToChat, TieBreakers::new()));
    let entry = entry(&r);

    let (first, second) = tokio::join!(
        r.reconcile(&entry, &id, Cause::GameJoin),
        r.reconcile(&entry, &id, Cause::Timer),
    );
    let mut kinds = vec![first.kind(), second.kind()];
    kinds.sort();
    assert_eq!(kinds, vec![ResultKind::AppliedToChat, ResultKind::InProgress]);
    assert_eq!(r.module().chat_applies(), 1);
}

#[tokio::test]
async fn timer_writes_only_to_its_side() {
    let id = identity(1);
    let table = TieBreakers::new().with(Cause::Timer, TieBreaker::Game);

    let module = CountingFlag::default();
    module.seed(&id, true, false);
    let mut gated = config(SyncDirection::Bidirectional, table.clone());
    gated.timer.side = TimerSide::Game;
    let r = reconciler(module, gated);
    let result = r.reconcile(&entry(&r), &id, Cause::Timer).await;
    assert_eq!(result.kind(), ResultKind::WrongDirection);
    assert_eq!(r.module().chat_applies(), 0);

    let module = CountingFlag::default();
    module.seed(&id, true, false);
    let mut open = config(SyncDirection::Bidirectional, table);
    open.timer.side = TimerSide::Both;
    let r = reconciler(module, open);
    let result = r.reconcile(&entry(&r), &id, Cause::Timer).await;
    assert_eq!(result.kind(), ResultKind::AppliedToChat);
}

#[tokio::test]
async fn unlink_removes_chat_state_once() {
    let id = identity(1);
    let module = CountingFlag::default();
    module.seed(&id, true, true);
    let mut cfg = config(SyncDirection::GameToChat, TieBreakers::new());
    cfg.unlink_behaviour = UnlinkBehaviour::RemoveDiscord;
    let r = reconciler(module, cfg);

    let tally = r.unlink(&id).await;
    assert_eq!(tally.get(ResultKind::AppliedToChat), 1);
    assert!(!r.module().chat_value(&id));
    assert!(r.module().game_value(&id));

    let tally = r.unlink(&id).await;
    assert_eq!(tally.get(ResultKind::BothMatch), 1);
    assert_eq!(r.module().chat_applies(), 1);
    assert_eq!(r.module().game_applies(), 0);
}

#[tokio::test]
async fn unlink_with_do_nothing_touches_nothing() {
    let id = identity(1);
    let module = CountingFlag::default();
    module.seed(&id, true, true);
    let r = reconciler(module, config(SyncDirection::GameToChat, TieBreakers::new()));

    assert_eq!(r.unlink(&id).await.total(), 0);
    assert_eq!(r.module().fetches(), 0);
}

#[tokio::test]
async fn sweep_counts_failures_without_stopping() {
    let module = CountingFlag::default();
    let identities: Vec<ResolvedIdentity> = (1..=50).map(identity).collect();
    for id in &identities {
        module.seed(id, true, false);
    }
    for id in &identities[..3] {
        module.fail_for(id);
    }
    let r = reconciler(module, config(SyncDirection::GameToChat, TieBreakers::new()));

    let tally = r.sweep_set(0, identities.into(), Cause::Command).await;
    assert_eq!(tally.errors(), 3);
    assert_eq!(tally.get(ResultKind::AppliedToChat), 47);
    assert_eq!(tally.total(), 50);
}

#[tokio::test]
async fn sweep_of_unknown_set_is_empty() {
    let r = reconciler(CountingFlag::default(), SyncConfig::default());
    let tally = r.sweep_set(7, Arc::from(vec![identity(1)]), Cause::Timer).await;
    assert_eq!(tally.total(), 0);
}

#[tokio::test]
async fn severed_pair_in_a_stale_snapshot_is_not_written() {
    let links = Arc::new(LinkTable::default());
    let kept = identity(1);
    let severed = identity(2);
    let module = CountingFlag::default();
    module.seed(&kept, true, false);
    module.seed(&severed, true, false);
    let r = reconciler_with_links(
        module,
        config(SyncDirection::GameToChat, TieBreakers::new()),
        Arc::clone(&links),
    );

    let snapshot: Arc<[ResolvedIdentity]> = Arc::from(vec![kept, severed]);
    links.sever(&severed);
    let tally = r.resync(snapshot, Cause::Command).await;

    assert_eq!(tally.get(ResultKind::AppliedToChat), 1);
    assert_eq!(tally.get(ResultKind::NotLinked), 1);
    assert!(!r.module().chat_value(&severed));
    assert_eq!(r.module().chat_applies(), 1);
    assert_eq!(r.module().fetches(), 2);
}

#[tokio::test]
async fn panicking_pair_counts_as_error() {
    let identities: Vec<ResolvedIdentity> = (1..=3).map(identity).collect();
    let module = CountingFlag::default();
    for id in &identities {
        module.seed(id, true, false);
    }
    module.panic_for(&identities[0]);
    let r = reconciler(module, config(SyncDirection::GameToChat, TieBreakers::new()));

    let tally = r.sweep_set(0, identities.into(), Cause::Command).await;
    assert_eq!(tally.errors(), 1);
    assert_eq!(tally.get(ResultKind::AppliedToChat), 2);
}
