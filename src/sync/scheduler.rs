//! Periodic timer sweeps.
//!
//! One task per timer-enabled set. Every (re)schedule aborts the previous
//! tasks before spawning new ones, and each new task first fires after the
//! configured minimum delay rather than a full cycle.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

use super::registry::SyncRegistry;
use super::types::{Cause, SweepScope};
use crate::identity::ResolvedIdentity;

/// Where timer sweeps get their identities from.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    async fn identities(&self, scope: SweepScope) -> Vec<ResolvedIdentity>;
}

/// Owns the running timer tasks.
#[derive(Debug, Default)]
pub struct TimerScheduler {
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TimerScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel every running sweep task and start one per timer-enabled set
    /// in `registry`. Returns the number of tasks started.
    ///
    /// Each set recurs at `max(cycle, minimum)`.
    pub fn reschedule(
        &self,
        registry: &SyncRegistry,
        source: Arc<dyn IdentitySource>,
        minimum: Duration,
    ) -> usize {
        let mut tasks = self.tasks.lock();
        for task in tasks.drain(..) {
            task.abort();
        }

        for timed in registry.timed_sets() {
            let period = timed.timer.cycle().max(minimum);
            let source = Arc::clone(&source);
            info!(
                kind = %timed.handle.kind(),
                set = %timed.name,
                first_in_secs = minimum.as_secs(),
                period_secs = period.as_secs(),
                "scheduling timer sweep"
            );
            tasks.push(tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + minimum, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    let identities: Arc<[ResolvedIdentity]> =
                        source.identities(timed.handle.scope()).await.into();
                    let count = identities.len();
                    let tally = timed.handle.sweep_set(timed.index, identities, Cause::Timer).await;
                    if tally.applied() > 0 || tally.errors() > 0 {
                        info!(kind = %timed.handle.kind(), set = %timed.name, identities = count, result = %tally, "timer sweep finished");
                    } else {
                        debug!(kind = %timed.handle.kind(), set = %timed.name, identities = count, result = %tally, "timer sweep finished");
                    }
                }
            }));
        }
        tasks.len()
    }

    /// Abort every running sweep task.
    pub fn cancel_all(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }

    pub fn active_timers(&self) -> usize {
        self.tasks.lock().iter().filter(|t| !t.is_finished()).count()
    }
}

impl Drop for TimerScheduler {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::registry::{SetSummary, SyncHandle};
    use crate::sync::result::ResultTally;
    use crate::sync::types::{SyncKind, TimerConfig, TimerSide};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandle {
        timer: TimerConfig,
        sweeps: AtomicUsize,
    }

    impl CountingHandle {
        fn new(cycle_secs: u64) -> Arc<Self> {
            Arc::new(Self {
                timer: TimerConfig {
                    cycle_secs,
                    side: TimerSide::Chat,
                },
                sweeps: AtomicUsize::new(0),
            })
        }

        fn sweeps(&self) -> usize {
            self.sweeps.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SyncHandle for CountingHandle {
        fn kind(&self) -> SyncKind {
            SyncKind::Groups
        }

        fn scope(&self) -> SweepScope {
            SweepScope::Online
        }

        fn sets(&self) -> Vec<SetSummary> {
            vec![SetSummary {
                name: "staff".to_string(),
                entries: 1,
                timer: self.timer,
            }]
        }

        async fn sync_identity(&self, _: &ResolvedIdentity, _: Cause) -> ResultTally {
            ResultTally::new()
        }

        async fn sweep_set(&self, _: usize, _: Arc<[ResolvedIdentity]>, cause: Cause) -> ResultTally {
            assert_eq!(cause, Cause::Timer);
            self.sweeps.fetch_add(1, Ordering::SeqCst);
            ResultTally::new()
        }

        async fn resync(&self, _: Arc<[ResolvedIdentity]>, _: Cause) -> ResultTally {
            ResultTally::new()
        }

        async fn unlink(&self, _: &ResolvedIdentity) -> ResultTally {
            ResultTally::new()
        }
    }

    struct NoIdentities;

    #[async_trait]
    impl IdentitySource for NoIdentities {
        async fn identities(&self, _: SweepScope) -> Vec<ResolvedIdentity> {
            Vec::new()
        }
    }

    fn registry(handle: &Arc<CountingHandle>) -> SyncRegistry {
        SyncRegistry::new(vec![Arc::clone(handle) as Arc<dyn SyncHandle>])
    }

    #[tokio::test(start_paused = true)]
    async fn first_sweep_fires_after_minimum_delay() {
        let handle = CountingHandle::new(600);
        let scheduler = TimerScheduler::new();
        let started = scheduler.reschedule(&registry(&handle), Arc::new(NoIdentities), Duration::from_secs(30));
        assert_eq!(started, 1);

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(handle.sweeps(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(handle.sweeps(), 1);

        // Next sweep a full cycle after the first.
        tokio::time::sleep(Duration::from_secs(598)).await;
        assert_eq!(handle.sweeps(), 1);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(handle.sweeps(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn short_cycles_are_clamped_to_the_minimum() {
        let handle = CountingHandle::new(5);
        let scheduler = TimerScheduler::new();
        scheduler.reschedule(&registry(&handle), Arc::new(NoIdentities), Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(handle.sweeps(), 1);
        tokio::time::sleep(Duration::from_secs(28)).await;
        assert_eq!(handle.sweeps(), 1);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(handle.sweeps(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reschedule_replaces_running_timers() {
        let handle = CountingHandle::new(600);
        let scheduler = TimerScheduler::new();
        let source: Arc<dyn IdentitySource> = Arc::new(NoIdentities);
        scheduler.reschedule(&registry(&handle), Arc::clone(&source), Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(20)).await;
        scheduler.reschedule(&registry(&handle), source, Duration::from_secs(30));
        assert_eq!(scheduler.active_timers(), 1);

        // The old timer would have fired at 30s; the new one fires at 50s.
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(handle.sweeps(), 0);
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(handle.sweeps(), 1);

        scheduler.cancel_all();
        assert_eq!(scheduler.active_timers(), 0);
        tokio::time::sleep(Duration::from_secs(700)).await;
        assert_eq!(handle.sweeps(), 1);
    }

    #[tokio::test]
    async fn disabled_timers_are_not_scheduled() {
        let handle = Arc::new(CountingHandle {
            timer: TimerConfig::default(),
            sweeps: AtomicUsize::new(0),
        });
        let scheduler = TimerScheduler::new();
        assert_eq!(
            scheduler.reschedule(&registry(&handle), Arc::new(NoIdentities), Duration::from_secs(30)),
            0
        );
    }
}
