//! Prometheus metrics collection for linksync.
//!
//! Metrics are exposed on an HTTP endpoint (see [`crate::http`]) when a
//! metrics port is configured.
//!
//! - `linksync_sync_results_total{kind,result}` - Reconcile outcomes
//! - `linksync_reconcile_duration_seconds{kind}` - Reconcile latency histogram
//! - `linksync_inflight_skipped_total{kind}` - Calls debounced by the in-flight guard
//! - `linksync_sweeps_total{kind,cause}` - Bulk sweeps started
//! - `linksync_link_events_total{event}` - Link and unlink events
//! - `linksync_link_rate_limited_total` - Link queries refused by the cooldown

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

/// Reconcile outcomes by sync kind and result kind.
pub static SYNC_RESULTS: OnceLock<IntCounterVec> = OnceLock::new();

/// Reconcile calls skipped because the same pair was already in flight.
pub static INFLIGHT_SKIPPED: OnceLock<IntCounterVec> = OnceLock::new();

/// Sweeps started, by sync kind and cause.
pub static SWEEPS: OnceLock<IntCounterVec> = OnceLock::new();

/// Link events (linked / unlinked).
pub static LINK_EVENTS: OnceLock<IntCounterVec> = OnceLock::new();

/// Link queries refused by the per-player cooldown.
pub static LINK_RATE_LIMITED: OnceLock<IntCounter> = OnceLock::new();

// ========================================================================
// Histograms
// ========================================================================

/// Reconcile latency by sync kind.
pub static RECONCILE_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Called once at daemon startup. Recording before `init` is a no-op.
pub fn init() {
    let r = registry();

    // Helper macro to register metric
    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
            }
            let _ = $metric.set(m);
        };
    }

    register!(SYNC_RESULTS, IntCounterVec::new(Opts::new("linksync_sync_results_total", "Reconcile outcomes by kind and result"), &["kind", "result"]));
    register!(INFLIGHT_SKIPPED, IntCounterVec::new(Opts::new("linksync_inflight_skipped_total", "Reconcile calls skipped by the in-flight guard"), &["kind"]));
    register!(SWEEPS, IntCounterVec::new(Opts::new("linksync_sweeps_total", "Sweeps started by kind and cause"), &["kind", "cause"]));
    register!(LINK_EVENTS, IntCounterVec::new(Opts::new("linksync_link_events_total", "Identity link events"), &["event"]));
    register!(LINK_RATE_LIMITED, IntCounter::new("linksync_link_rate_limited_total", "Link queries refused by cooldown"));
    register!(RECONCILE_LATENCY, HistogramVec::new(
        HistogramOpts::new("linksync_reconcile_duration_seconds", "Reconcile latency by kind")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["kind"]));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions for metric updates
// ============================================================================

fn get_counter_vec(metric: &OnceLock<IntCounterVec>) -> Option<&IntCounterVec> {
    metric.get()
}

fn get_histogram_vec(metric: &OnceLock<HistogramVec>) -> Option<&HistogramVec> {
    metric.get()
}

/// Record one reconcile outcome with its latency.
#[inline]
pub fn record_reconcile(kind: &str, result: &str, duration_secs: f64) {
    if let Some(c) = get_counter_vec(&SYNC_RESULTS) {
        c.with_label_values(&[kind, result]).inc();
    }
    if let Some(h) = get_histogram_vec(&RECONCILE_LATENCY) {
        h.with_label_values(&[kind]).observe(duration_secs);
    }
}

#[inline]
pub fn record_inflight_skipped(kind: &str) {
    if let Some(c) = get_counter_vec(&INFLIGHT_SKIPPED) {
        c.with_label_values(&[kind]).inc();
    }
}

#[inline]
pub fn record_sweep(kind: &str, cause: &str) {
    if let Some(c) = get_counter_vec(&SWEEPS) {
        c.with_label_values(&[kind, cause]).inc();
    }
}

#[inline]
pub fn record_link_event(event: &str) {
    if let Some(c) = get_counter_vec(&LINK_EVENTS) {
        c.with_label_values(&[event]).inc();
    }
}

#[inline]
pub fn record_link_rate_limited() {
    if let Some(c) = LINK_RATE_LIMITED.get() {
        c.inc();
    }
}
