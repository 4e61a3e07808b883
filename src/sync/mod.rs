//! Sync Module - bidirectional state synchronization.
//!
//! The engine pairs a game-side identifier with a chat-side identifier,
//! fetches both states, picks the authoritative side from the configured
//! direction and tie-breakers, and writes the winning state to the other
//! side. Each sync kind (see [`crate::modules`]) plugs in through
//! [`SyncModule`]; the [`SyncRegistry`] erases the state types so timers,
//! resyncs and link events can drive every kind uniformly.

mod aggregator;
mod engine;
mod entry;
mod inflight;
mod module;
mod registry;
mod result;
mod scheduler;
pub mod tiebreak;
mod types;

#[cfg(test)]
mod tests;

pub use aggregator::{ResyncReport, resync_all};
pub use engine::Reconciler;
pub use entry::{SyncEntry, SyncId, SyncSet};
pub use inflight::{InFlightGuard, InFlightSet, PairKey};
pub use module::{EntryOf, SyncModule};
pub use registry::{SetSummary, SyncHandle, SyncRegistry, TimedSet};
pub use result::{ResultKind, ResultTally, SyncResult};
pub use scheduler::{IdentitySource, TimerScheduler};
pub use tiebreak::{Resolution, TieBreaker, TieBreakers};
pub use types::{
    Cause, Side, SweepScope, SyncConfig, SyncDirection, SyncKind, TimerConfig, TimerSide,
    UnlinkBehaviour,
};
