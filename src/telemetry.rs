//! Telemetry utilities for reconcile timing and span construction.

use std::time::Instant;

use crate::sync::{ResultKind, SyncKind};

/// Guard for timing one reconcile call and recording metrics.
///
/// Records the outcome and latency when dropped. An outcome that was never
/// set is recorded as `error`.
pub struct ReconcileTimer {
    kind: SyncKind,
    result: ResultKind,
    start: Instant,
}

impl ReconcileTimer {
    /// Start timing a reconcile.
    pub fn new(kind: SyncKind) -> Self {
        Self {
            kind,
            result: ResultKind::Error,
            start: Instant::now(),
        }
    }

    pub fn finish(&mut self, result: ResultKind) {
        self.result = result;
    }
}

impl Drop for ReconcileTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_reconcile(self.kind.flag(), self.result.label(), duration);
    }
}

/// Standardized span constructors for sync observability.
pub mod spans {
    use tracing::{Span, debug_span, info_span};

    use crate::sync::{Cause, SyncKind};

    /// Create a span for one reconcile call.
    pub fn reconcile(kind: SyncKind, entry: &str, player: &uuid::Uuid, cause: Cause) -> Span {
        debug_span!("reconcile", kind = %kind, entry = %entry, player = %player, cause = %cause)
    }

    /// Create a span for a bulk sweep.
    pub fn sweep(kind: SyncKind, set: &str, cause: Cause) -> Span {
        info_span!("sweep", kind = %kind, set = %set, cause = %cause)
    }

    /// Create a span for a link change.
    pub fn link(event: &str, player: &uuid::Uuid) -> Span {
        info_span!("link", event = %event, player = %player)
    }
}
