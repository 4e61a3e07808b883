//! Manual resync: bulk reconcile with a per-kind tally.

use futures_util::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use super::registry::{SyncHandle, SyncRegistry};
use super::result::{ResultKind, ResultTally};
use super::types::{Cause, SyncKind};
use crate::identity::ResolvedIdentity;

/// Outcome of a manual resync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResyncReport {
    pub cause: Cause,
    pub identities: usize,
    pub per_kind: BTreeMap<SyncKind, ResultTally>,
    pub elapsed: Duration,
}

impl ResyncReport {
    /// All kinds merged.
    pub fn total(&self) -> ResultTally {
        let mut total = ResultTally::new();
        for tally in self.per_kind.values() {
            total.merge(tally);
        }
        total
    }

    pub fn errors(&self) -> usize {
        self.total().errors()
    }

    /// Plain-text summary: a header line, one line per kind, then the
    /// combined breakdown.
    pub fn render(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Resync ({}) over {} identities finished in {:.2}s",
            self.cause,
            self.identities,
            self.elapsed.as_secs_f64()
        )];
        for (kind, tally) in &self.per_kind {
            lines.push(format!("  {kind}: {tally}"));
        }
        let total = self.total();
        for (kind, count) in total.iter() {
            lines.push(format!("    {count} {}", kind.description()));
        }
        if total.get(ResultKind::Error) > 0 {
            lines.push("  Some pairs failed; see the server log for details".to_string());
        }
        lines
    }
}

/// Reconcile every entry of the selected kinds for every identity.
///
/// Individual failures are counted, never propagated. Kinds that are not
/// active in `registry` are skipped.
pub async fn resync_all(
    registry: &SyncRegistry,
    kinds: &[SyncKind],
    identities: Vec<ResolvedIdentity>,
    cause: Cause,
) -> ResyncReport {
    let start = Instant::now();
    let count = identities.len();
    let identities: Arc<[ResolvedIdentity]> = identities.into();

    let selected: Vec<Arc<dyn SyncHandle>> = kinds
        .iter()
        .filter_map(|kind| registry.get(*kind).cloned())
        .collect();
    let runs = selected.iter().map(|handle| {
        let identities = Arc::clone(&identities);
        async move { (handle.kind(), handle.resync(identities, cause).await) }
    });
    let per_kind: BTreeMap<SyncKind, ResultTally> = join_all(runs).await.into_iter().collect();

    let report = ResyncReport {
        cause,
        identities: count,
        per_kind,
        elapsed: start.elapsed(),
    };
    info!(
        cause = %cause,
        identities = count,
        total = %report.total(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "resync finished"
    );
    report
}
