//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

// =============================================================================
// Database Defaults
// =============================================================================

pub fn default_database_path() -> String {
    "linksync.db".to_string()
}

// =============================================================================
// Identity Defaults
// =============================================================================

pub fn default_cache_ttl_secs() -> u64 {
    60
}

pub fn default_link_cooldown_secs() -> u64 {
    30
}

// =============================================================================
// Timer Defaults
// =============================================================================

pub fn default_minimum_delay_secs() -> u64 {
    30
}
