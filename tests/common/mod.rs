//! Integration test common infrastructure.
//!
//! Wires a [`Bridge`] over the in-memory platforms and an in-memory SQLite
//! link store, with caching and link cooldowns turned off.

pub mod bridge;

#[allow(unused_imports)]
pub use bridge::{TestBridge, config, identity, player, user};
