//! Data model shared by every sync kind.
//!
//! A [`SyncConfig`] is owned by the configuration subsystem and is read-only
//! to the engine. Everything else here is cheap, `Copy` vocabulary that the
//! engine, the registry and the command surface share.

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

use super::tiebreak::TieBreakers;

/// One side of a pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Game,
    Chat,
}

impl Side {
    /// The side that is written when `self` is authoritative.
    pub fn opposite(self) -> Side {
        match self {
            Side::Game => Side::Chat,
            Side::Chat => Side::Game,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Side::Game => "game",
            Side::Chat => "chat",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a reconciliation is being attempted.
///
/// Drives the tie-breaker lookup and is attached to result reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cause {
    /// External API call.
    Api,
    /// Manual operator resync.
    Command,
    /// Player joined the game server.
    GameJoin,
    /// Player left the game server. Only presence syncs react to it.
    GameQuit,
    /// An identity link was created.
    Link,
    /// Periodic timer sweep.
    Timer,
}

impl Cause {
    pub const ALL: [Cause; 6] = [
        Cause::Api,
        Cause::Command,
        Cause::GameJoin,
        Cause::GameQuit,
        Cause::Link,
        Cause::Timer,
    ];

    pub fn from_name(name: &str) -> Option<Cause> {
        Cause::ALL.into_iter().find(|cause| cause.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Cause::Api => "api",
            Cause::Command => "command",
            Cause::GameJoin => "game_join",
            Cause::GameQuit => "game_quit",
            Cause::Link => "link",
            Cause::Timer => "timer",
        }
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static direction of a sync set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    #[default]
    Bidirectional,
    GameToChat,
    ChatToGame,
}

impl SyncDirection {
    /// Whether this direction permits writing to `side`.
    pub fn allows_write(self, side: Side) -> bool {
        match self {
            SyncDirection::Bidirectional => true,
            SyncDirection::GameToChat => side == Side::Chat,
            SyncDirection::ChatToGame => side == Side::Game,
        }
    }

    /// The authoritative side implied by a one-way direction.
    pub fn source(self) -> Option<Side> {
        match self {
            SyncDirection::Bidirectional => None,
            SyncDirection::GameToChat => Some(Side::Game),
            SyncDirection::ChatToGame => Some(Side::Chat),
        }
    }
}

/// Which side(s) timer sweeps may write to. `Disabled` turns the timer off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerSide {
    #[default]
    Disabled,
    Game,
    Chat,
    Both,
}

impl TimerSide {
    pub fn is_enabled(self) -> bool {
        self != TimerSide::Disabled
    }

    pub fn allows_write(self, side: Side) -> bool {
        match self {
            TimerSide::Disabled => false,
            TimerSide::Game => side == Side::Game,
            TimerSide::Chat => side == Side::Chat,
            TimerSide::Both => true,
        }
    }
}

/// Periodic sweep configuration for one sync set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TimerConfig {
    /// Seconds between sweeps (clamped up to the configured minimum).
    #[serde(default = "default_cycle_secs")]
    pub cycle_secs: u64,
    #[serde(default)]
    pub side: TimerSide,
}

impl TimerConfig {
    pub fn cycle(&self) -> Duration {
        Duration::from_secs(self.cycle_secs)
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            cycle_secs: default_cycle_secs(),
            side: TimerSide::Disabled,
        }
    }
}

fn default_cycle_secs() -> u64 {
    300
}

/// Action taken when an identity link is severed while synced state exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlinkBehaviour {
    #[default]
    DoNothing,
    RemoveDiscord,
    RemoveGame,
}

impl UnlinkBehaviour {
    /// The side whose state is removed on unlink.
    pub fn target(self) -> Option<Side> {
        match self {
            UnlinkBehaviour::DoNothing => None,
            UnlinkBehaviour::RemoveDiscord => Some(Side::Chat),
            UnlinkBehaviour::RemoveGame => Some(Side::Game),
        }
    }
}

/// Configuration shared by every entry of one sync set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub direction: SyncDirection,
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub tie_breakers: TieBreakers,
    #[serde(default)]
    pub unlink_behaviour: UnlinkBehaviour,
}

impl SyncConfig {
    /// Causes that can reach a user-editable set with this configuration.
    ///
    /// `GameQuit` only reaches presence syncs, whose tables are fixed.
    pub fn reachable_causes(&self) -> Vec<Cause> {
        let mut causes = vec![Cause::Api, Cause::Command, Cause::GameJoin, Cause::Link];
        if self.timer.side.is_enabled() {
            causes.push(Cause::Timer);
        }
        causes
    }
}

/// The sync kinds a bridge can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SyncKind {
    Groups,
    Bans,
    Mutes,
    LinkedRole,
    OnlineRole,
}

impl SyncKind {
    pub const ALL: [SyncKind; 5] = [
        SyncKind::Groups,
        SyncKind::Bans,
        SyncKind::Mutes,
        SyncKind::LinkedRole,
        SyncKind::OnlineRole,
    ];

    /// Flag name used by the resync command and in metric labels.
    pub fn flag(self) -> &'static str {
        match self {
            SyncKind::Groups => "groups",
            SyncKind::Bans => "bans",
            SyncKind::Mutes => "mutes",
            SyncKind::LinkedRole => "linked-role",
            SyncKind::OnlineRole => "online-role",
        }
    }

    pub fn from_flag(flag: &str) -> Option<SyncKind> {
        let flag = flag.trim_start_matches('-');
        SyncKind::ALL
            .into_iter()
            .find(|kind| kind.flag().eq_ignore_ascii_case(flag))
    }

    /// Destructive kinds must be confirmed before a manual resync.
    pub fn requires_confirmation(self) -> bool {
        matches!(self, SyncKind::Bans | SyncKind::Mutes)
    }
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag())
    }
}

/// Which identities a timer sweep visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepScope {
    /// Linked players currently online.
    Online,
    /// Every linked account, online or not.
    AllLinked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_write_permissions() {
        assert!(SyncDirection::Bidirectional.allows_write(Side::Game));
        assert!(SyncDirection::Bidirectional.allows_write(Side::Chat));
        assert!(SyncDirection::GameToChat.allows_write(Side::Chat));
        assert!(!SyncDirection::GameToChat.allows_write(Side::Game));
        assert!(SyncDirection::ChatToGame.allows_write(Side::Game));
        assert!(!SyncDirection::ChatToGame.allows_write(Side::Chat));
    }

    #[test]
    fn timer_side_gates_writes() {
        assert!(!TimerSide::Disabled.allows_write(Side::Game));
        assert!(TimerSide::Game.allows_write(Side::Game));
        assert!(!TimerSide::Game.allows_write(Side::Chat));
        assert!(TimerSide::Both.allows_write(Side::Chat));
    }

    #[test]
    fn kind_flags_round_trip() {
        for kind in SyncKind::ALL {
            assert_eq!(SyncKind::from_flag(kind.flag()), Some(kind));
        }
        assert_eq!(SyncKind::from_flag("-BANS"), Some(SyncKind::Bans));
        assert_eq!(SyncKind::from_flag("nope"), None);
    }

    #[test]
    fn timer_cause_reachable_only_when_enabled() {
        let mut config = SyncConfig::default();
        assert!(!config.reachable_causes().contains(&Cause::Timer));
        config.timer.side = TimerSide::Both;
        assert!(config.reachable_causes().contains(&Cause::Timer));
        assert!(!config.reachable_causes().contains(&Cause::GameQuit));
    }
}
