//! Type-erased registry of active sync kinds.
//!
//! Each active kind is one [`Reconciler`](super::Reconciler) behind the
//! object-safe [`SyncHandle`] trait, so the bridge, the scheduler and the
//! aggregator can drive kinds with different state types uniformly.

use async_trait::async_trait;
use std::sync::Arc;

use super::result::ResultTally;
use super::types::{Cause, SweepScope, SyncKind, TimerConfig};
use crate::identity::ResolvedIdentity;

/// Summary of one configured set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetSummary {
    pub name: String,
    pub entries: usize,
    pub timer: TimerConfig,
}

/// Object-safe view of one active sync kind.
#[async_trait]
pub trait SyncHandle: Send + Sync {
    fn kind(&self) -> SyncKind;

    fn scope(&self) -> SweepScope;

    fn sets(&self) -> Vec<SetSummary>;

    /// Reconcile every entry of every set for one identity.
    async fn sync_identity(&self, identity: &ResolvedIdentity, cause: Cause) -> ResultTally;

    /// Reconcile every entry of one set for each identity, concurrently.
    async fn sweep_set(
        &self,
        set: usize,
        identities: Arc<[ResolvedIdentity]>,
        cause: Cause,
    ) -> ResultTally;

    /// Reconcile every entry of every set for each identity, concurrently.
    async fn resync(&self, identities: Arc<[ResolvedIdentity]>, cause: Cause) -> ResultTally;

    /// Apply the configured unlink behaviour for a severed identity.
    async fn unlink(&self, identity: &ResolvedIdentity) -> ResultTally;
}

/// A timer-enabled set, as seen by the scheduler.
#[derive(Clone)]
pub struct TimedSet {
    pub handle: Arc<dyn SyncHandle>,
    pub index: usize,
    pub name: String,
    pub timer: TimerConfig,
}

/// The active sync kinds, rebuilt on every reload.
#[derive(Clone, Default)]
pub struct SyncRegistry {
    handles: Vec<Arc<dyn SyncHandle>>,
}

impl SyncRegistry {
    pub fn new(handles: Vec<Arc<dyn SyncHandle>>) -> Self {
        Self { handles }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn handles(&self) -> &[Arc<dyn SyncHandle>] {
        &self.handles
    }

    pub fn get(&self, kind: SyncKind) -> Option<&Arc<dyn SyncHandle>> {
        self.handles.iter().find(|h| h.kind() == kind)
    }

    pub fn is_active(&self, kind: SyncKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn active_kinds(&self) -> Vec<SyncKind> {
        self.handles.iter().map(|h| h.kind()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Every set whose timer is enabled.
    pub fn timed_sets(&self) -> Vec<TimedSet> {
        self.handles
            .iter()
            .flat_map(|handle| {
                handle
                    .sets()
                    .into_iter()
                    .enumerate()
                    .filter(|(_, set)| set.timer.side.is_enabled())
                    .map(|(index, set)| TimedSet {
                        handle: Arc::clone(handle),
                        index,
                        name: set.name,
                        timer: set.timer,
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

impl std::fmt::Debug for SyncRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncRegistry")
            .field("kinds", &self.active_kinds())
            .finish()
    }
}
