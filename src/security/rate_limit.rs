//! Rate limiting for link creation.
//!
//! Query-triggered linking asks an external provider and may create a link,
//! so each player gets one attempt per cooldown window. This is separate
//! from the reconcile in-flight guard, which only debounces concurrent
//! reconciles of the same pair.
//!
//! Uses the `governor` crate's token bucket with a burst of one, keyed by
//! player.

use dashmap::DashMap;
use governor::{Quota, RateLimiter as GovRateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Type alias for governor's direct rate limiter.
type DirectRateLimiter = governor::DefaultDirectRateLimiter;

/// Limiters kept before the map is cleared.
const MAX_ENTRIES: usize = 10_000;

/// Per-player cooldown on link queries.
#[derive(Debug)]
pub struct LinkCooldown {
    limiters: DashMap<Uuid, DirectRateLimiter>,
    /// `None` when the cooldown is zero (disabled).
    quota: Option<Quota>,
}

impl LinkCooldown {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            limiters: DashMap::new(),
            quota: Quota::with_period(cooldown).map(|q| q.allow_burst(NonZeroU32::MIN)),
        }
    }

    /// Consume this player's attempt for the current window.
    ///
    /// Returns `true` if allowed, `false` if on cooldown.
    pub fn check(&self, player: Uuid) -> bool {
        let Some(quota) = self.quota else {
            return true;
        };

        if self.limiters.len() > MAX_ENTRIES {
            self.limiters.clear();
            debug!("cleared link cooldowns (exceeded {} entries)", MAX_ENTRIES);
        }

        let limiter = self
            .limiters
            .entry(player)
            .or_insert_with(|| GovRateLimiter::direct(quota));
        let allowed = limiter.check().is_ok();
        if !allowed {
            debug!(player = %player, "link query on cooldown");
        }
        allowed
    }

    /// Drop the cooldown for a player (after an unlink).
    pub fn forget(&self, player: Uuid) {
        self.limiters.remove(&player);
    }
}
