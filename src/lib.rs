//! linksync - bidirectional state sync between a game server and a chat
//! community.
//!
//! Group memberships, bans, mutes, link status and presence are kept in
//! agreement between both sides. See [`sync`] for the engine and
//! [`bridge`] for how triggers reach it.

pub mod bridge;
pub mod command;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod identity;
pub mod metrics;
pub mod modules;
pub mod platform;
pub mod security;
pub mod sync;
pub mod telemetry;
