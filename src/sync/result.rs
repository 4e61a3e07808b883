//! Reconcile outcomes and their tallies.

use std::collections::BTreeMap;
use std::fmt;

use super::types::Side;
use crate::error::SyncError;

/// Outcome of one reconcile call for one entry and identity.
///
/// Created fresh per call and never mutated.
#[derive(Debug)]
pub enum SyncResult<S> {
    /// Both sides already agree. No writes were made.
    BothMatch(S),
    AppliedToGame,
    AppliedToChat,
    /// The side that would need updating is read-only for this direction
    /// or this timer.
    WrongDirection,
    /// The tie-breaker disables this cause.
    NoCauseMatch,
    /// The entry is missing one side of its pairing.
    NotConfigured,
    /// The identity has no counterpart on the other platform.
    NotLinked,
    /// The same pair is already being reconciled.
    InProgress,
    Error(SyncError),
}

impl<S> SyncResult<S> {
    pub fn kind(&self) -> ResultKind {
        match self {
            SyncResult::BothMatch(_) => ResultKind::BothMatch,
            SyncResult::AppliedToGame => ResultKind::AppliedToGame,
            SyncResult::AppliedToChat => ResultKind::AppliedToChat,
            SyncResult::WrongDirection => ResultKind::WrongDirection,
            SyncResult::NoCauseMatch => ResultKind::NoCauseMatch,
            SyncResult::NotConfigured => ResultKind::NotConfigured,
            SyncResult::NotLinked => ResultKind::NotLinked,
            SyncResult::InProgress => ResultKind::InProgress,
            SyncResult::Error(_) => ResultKind::Error,
        }
    }

    /// The side that was written, if any.
    pub fn applied_side(&self) -> Option<Side> {
        match self {
            SyncResult::AppliedToGame => Some(Side::Game),
            SyncResult::AppliedToChat => Some(Side::Chat),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SyncResult::Error(_))
    }
}

/// State-free tag of a [`SyncResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResultKind {
    BothMatch,
    AppliedToGame,
    AppliedToChat,
    WrongDirection,
    NoCauseMatch,
    NotConfigured,
    NotLinked,
    InProgress,
    Error,
}

impl ResultKind {
    /// Metric label.
    pub fn label(self) -> &'static str {
        match self {
            ResultKind::BothMatch => "both_match",
            ResultKind::AppliedToGame => "applied_to_game",
            ResultKind::AppliedToChat => "applied_to_chat",
            ResultKind::WrongDirection => "wrong_direction",
            ResultKind::NoCauseMatch => "no_cause_match",
            ResultKind::NotConfigured => "not_configured",
            ResultKind::NotLinked => "not_linked",
            ResultKind::InProgress => "in_progress",
            ResultKind::Error => "error",
        }
    }

    /// Operator-facing description.
    pub fn description(self) -> &'static str {
        match self {
            ResultKind::BothMatch => "already in sync",
            ResultKind::AppliedToGame => "updated in game",
            ResultKind::AppliedToChat => "updated in chat",
            ResultKind::WrongDirection => "skipped (read-only side)",
            ResultKind::NoCauseMatch => "skipped (disabled for this cause)",
            ResultKind::NotConfigured => "skipped (not configured)",
            ResultKind::NotLinked => "skipped (not linked)",
            ResultKind::InProgress => "skipped (already running)",
            ResultKind::Error => "failed",
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Count of results per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultTally(BTreeMap<ResultKind, usize>);

impl ResultTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: ResultKind) {
        *self.0.entry(kind).or_default() += 1;
    }

    pub fn merge(&mut self, other: &ResultTally) {
        for (kind, count) in &other.0 {
            *self.0.entry(*kind).or_default() += count;
        }
    }

    pub fn get(&self, kind: ResultKind) -> usize {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn errors(&self) -> usize {
        self.get(ResultKind::Error)
    }

    pub fn applied(&self) -> usize {
        self.get(ResultKind::AppliedToGame) + self.get(ResultKind::AppliedToChat)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResultKind, usize)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

impl FromIterator<ResultKind> for ResultTally {
    fn from_iter<I: IntoIterator<Item = ResultKind>>(iter: I) -> Self {
        let mut tally = ResultTally::new();
        for kind in iter {
            tally.record(kind);
        }
        tally
    }
}

impl fmt::Display for ResultTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("nothing to do");
        }
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}={v}")).collect();
        f.write_str(&parts.join(", "))
    }
}
