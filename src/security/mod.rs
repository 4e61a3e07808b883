//! Security module for linksync.
//!
//! - **Link cooldown**: governor-based per-player limit on query-triggered
//!   link creation

pub mod rate_limit;

pub use rate_limit::LinkCooldown;
