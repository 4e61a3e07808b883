//! Tie-break resolution.
//!
//! Pure lookup, no I/O: maps a cause plus the set's tie-breaker table and
//! direction to the authoritative side, or to "no action".
//!
//! | tie-breaker[cause] | direction       | outcome        |
//! |--------------------|-----------------|----------------|
//! | `game` / `chat`    | any             | that side      |
//! | `disabled`         | any             | disabled       |
//! | unset              | `game_to_chat`  | game           |
//! | unset              | `chat_to_game`  | chat           |
//! | unset              | `bidirectional` | disabled       |
//!
//! The last row never silently guesses a side. Config validation rejects a
//! bidirectional set with an unset reachable cause before it activates.

use serde::Deserialize;
use std::collections::BTreeMap;

use super::types::{Cause, Side, SyncDirection};

/// Per-cause tie-breaker value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreaker {
    Game,
    Chat,
    Disabled,
}

/// Tie-breaker table keyed by cause.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, TieBreaker>")]
pub struct TieBreakers(BTreeMap<Cause, TieBreaker>);

impl TryFrom<BTreeMap<String, TieBreaker>> for TieBreakers {
    type Error = String;

    fn try_from(raw: BTreeMap<String, TieBreaker>) -> Result<Self, Self::Error> {
        raw.into_iter()
            .map(|(key, value)| match Cause::from_name(&key) {
                // Only presence syncs see game_quit, and their tables are fixed.
                Some(Cause::GameQuit) => Err(format!(
                    "cause '{key}' cannot be configured in tie_breakers"
                )),
                Some(cause) => Ok((cause, value)),
                None => Err(format!("unknown cause '{key}' in tie_breakers")),
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Self)
    }
}

impl TieBreakers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every cause maps to `value`. Used for the fixed tables of one-way kinds.
    pub fn all(value: TieBreaker) -> Self {
        Self(Cause::ALL.into_iter().map(|c| (c, value)).collect())
    }

    pub fn with(mut self, cause: Cause, value: TieBreaker) -> Self {
        self.0.insert(cause, value);
        self
    }

    pub fn get(&self, cause: Cause) -> Option<TieBreaker> {
        self.0.get(&cause).copied()
    }

    pub fn is_set(&self, cause: Cause) -> bool {
        self.0.contains_key(&cause)
    }
}

/// Outcome of tie-break resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// This side's state wins on conflict.
    Authority(Side),
    /// No action for this cause.
    Disabled,
}

/// Resolve the authoritative side for `cause`.
pub fn resolve(cause: Cause, tie_breakers: &TieBreakers, direction: SyncDirection) -> Resolution {
    match tie_breakers.get(cause) {
        Some(TieBreaker::Game) => Resolution::Authority(Side::Game),
        Some(TieBreaker::Chat) => Resolution::Authority(Side::Chat),
        Some(TieBreaker::Disabled) => Resolution::Disabled,
        None => match direction.source() {
            Some(side) => Resolution::Authority(side),
            None => Resolution::Disabled,
        },
    }
}
