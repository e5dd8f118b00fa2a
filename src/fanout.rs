//! Concurrent fan-out over a probe set.
//!
//! [`run_all`] starts every probe at once, bounds each one by its own
//! timeout, and returns only when all of them have settled. There is no
//! early return on first success or first failure, and one slow or failing
//! provider never cancels its siblings.
//!
//! Output order is declaration order, never completion order.

use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::ProbeFailure;
use crate::probe::{CredentialState, HttpClients, Probe, ProviderOutcome};

/// Run every probe against `query` and collect one outcome per probe.
///
/// Probes whose credential is missing are skipped without any network
/// call and report [`ProbeFailure::MissingCredential`]. A probe exceeding
/// its budget has its in-flight request dropped and reports
/// [`ProbeFailure::Timeout`]; nothing it had read so far is kept. A probe
/// that panics reports [`ProbeFailure::Transport`] and its siblings are
/// unaffected.
pub async fn run_all<Q: Sync>(
    http: &HttpClients,
    probes: &[Arc<dyn Probe<Q>>],
    query: &Q,
) -> Vec<ProviderOutcome> {
    let calls = probes.iter().map(|probe| run_one(http, probe.as_ref(), query));
    join_all(calls).await
}

async fn run_one<Q: Sync>(http: &HttpClients, probe: &dyn Probe<Q>, query: &Q) -> ProviderOutcome {
    let name = probe.name();

    if probe.credential() == CredentialState::Missing {
        debug!(provider = name, "skipped: credential not configured");
        return Err(ProbeFailure::MissingCredential);
    }

    let budget = probe.timeout();
    let started = Instant::now();
    let call = AssertUnwindSafe(probe.fetch(http, query)).catch_unwind();
    let outcome = match tokio::time::timeout(budget, call).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(_)) => Err(ProbeFailure::Transport("provider panicked".to_string())),
        Err(_) => Err(ProbeFailure::Timeout(budget)),
    };
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match &outcome {
        Ok(response) => debug!(
            provider = name,
            status = response.status,
            elapsed_ms,
            "probe settled"
        ),
        Err(failure) => warn!(
            provider = name,
            error = %failure,
            elapsed_ms,
            "probe failed"
        ),
    }

    outcome
}
