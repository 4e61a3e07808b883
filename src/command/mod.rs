//! Admin console commands.
//!
//! One command per line. Output is a list of plain lines for the operator;
//! failures become a single [`CommandError`] line, with detail in the log.

mod resync;

pub use resync::ResyncRequest;

use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::bridge::Bridge;
use crate::config::Config;
use crate::error::CommandError;
use crate::platform::UserId;
use crate::sync::{Cause, ResultTally};

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Resync(ResyncRequest),
    Link { player: Uuid, user: UserId },
    QueryLink(Uuid),
    Unlink(Uuid),
    Join(Uuid),
    Quit(Uuid),
    Reload,
    Status,
    Stop,
}

impl ConsoleCommand {
    /// Parse one console line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "resync" => ConsoleCommand::Resync(ResyncRequest::parse(words)?),
            "link" => {
                let player = parse_uuid(words.next())?;
                let user = parse_user(words.next())?;
                ConsoleCommand::Link { player, user }
            }
            "query-link" => ConsoleCommand::QueryLink(parse_uuid(words.next())?),
            "unlink" => ConsoleCommand::Unlink(parse_uuid(words.next())?),
            "join" => ConsoleCommand::Join(parse_uuid(words.next())?),
            "quit" => ConsoleCommand::Quit(parse_uuid(words.next())?),
            "reload" => ConsoleCommand::Reload,
            "status" => ConsoleCommand::Status,
            "stop" => ConsoleCommand::Stop,
            _ => return Err(CommandError::UnknownCommand(name.to_string())),
        };
        Ok(Some(command))
    }
}

fn parse_uuid(arg: Option<&str>) -> Result<Uuid, CommandError> {
    let arg = arg.ok_or(CommandError::MissingArgument("uuid"))?;
    Uuid::parse_str(arg).map_err(|_| CommandError::InvalidArgument {
        name: "uuid",
        value: arg.to_string(),
    })
}

fn parse_user(arg: Option<&str>) -> Result<UserId, CommandError> {
    let arg = arg.ok_or(CommandError::MissingArgument("user-id"))?;
    arg.parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(UserId)
        .ok_or_else(|| CommandError::InvalidArgument {
            name: "user-id",
            value: arg.to_string(),
        })
}

/// Runs console commands against a bridge.
pub struct Console {
    bridge: Arc<Bridge>,
    config_path: PathBuf,
}

impl Console {
    pub fn new(bridge: Arc<Bridge>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            bridge,
            config_path: config_path.into(),
        }
    }

    /// Execute a command and return the operator-facing lines.
    ///
    /// `Stop` is acknowledged here; shutting down is up to the caller.
    pub async fn execute(&self, command: ConsoleCommand) -> Result<Vec<String>, CommandError> {
        match command {
            ConsoleCommand::Resync(request) => {
                let report = self.bridge.resync(&request, Cause::Command).await?;
                Ok(report.render())
            }
            ConsoleCommand::Link { player, user } => {
                let identity = self.bridge.resolver().link(player, user).await?;
                Ok(vec![format!("linked {identity}")])
            }
            ConsoleCommand::QueryLink(player) => {
                match self.bridge.resolver().query_link(player).await? {
                    Some(identity) => Ok(vec![format!("linked {identity}")]),
                    None => Ok(vec![format!("no chat account found for {player}")]),
                }
            }
            ConsoleCommand::Unlink(player) => {
                match self.bridge.resolver().unlink_player(player).await? {
                    Some(identity) => Ok(vec![format!("unlinked {identity}")]),
                    None => Ok(vec![format!("{player} is not linked")]),
                }
            }
            ConsoleCommand::Join(player) => {
                let tally = self.bridge.on_player_join(player).await;
                Ok(vec![tally_line("join", player, &tally)])
            }
            ConsoleCommand::Quit(player) => {
                let tally = self.bridge.on_player_quit(player).await;
                Ok(vec![tally_line("quit", player, &tally)])
            }
            ConsoleCommand::Reload => {
                let config = Config::load(&self.config_path)
                    .map_err(|e| CommandError::Reload(e.to_string()))?;
                let timers = self.bridge.reload(&config).map_err(|errors| {
                    let joined = errors
                        .iter()
                        .map(|e| e.to_string())
                        .collect::<Vec<_>>()
                        .join("; ");
                    CommandError::Reload(joined)
                })?;
                info!(path = %self.config_path.display(), "reload requested from console");
                Ok(vec![format!("reloaded, {timers} timers scheduled")])
            }
            ConsoleCommand::Status => Ok(self.bridge.status().await.render()),
            ConsoleCommand::Stop => Ok(vec!["stopping".to_string()]),
        }
    }
}

fn tally_line(what: &str, player: Uuid, tally: &ResultTally) -> String {
    format!("{what} {player}: {tally}")
}
