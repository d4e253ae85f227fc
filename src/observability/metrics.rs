//! Metrics collection for `phasekeeper`.
//!
//! Counters and gauges are recorded through the `metrics` facade. Without an installed
//! recorder they are no-ops; [`init_metrics`] installs a Prometheus recorder
//! (no HTTP listener) whose handle can render the text exposition format.

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::PhaseKeeperError;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the global Prometheus recorder and returns its handle.
///
/// Calling this again returns the handle installed the first time.
///
/// # Errors
///
/// Returns `PhaseKeeperError::Io` if another recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, PhaseKeeperError> {
    if let Some(handle) = HANDLE.get() {
        tracing::debug!("metrics already initialized, reusing recorder");
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| PhaseKeeperError::Io(std::io::Error::other(e.to_string())))?;
    describe_metrics();

    Ok(HANDLE.get_or_init(|| handle).clone())
}

fn describe_metrics() {
    describe_counter!(
        "phasekeeper_operations_total",
        "Tracker operations by operation and outcome"
    );
    describe_counter!(
        "phasekeeper_store_writes_total",
        "Write requests issued to the assignment store"
    );
    describe_gauge!(
        "phasekeeper_ghost_groups",
        "Single-member engagement groups seen by the latest derivation"
    );
}

/// Records the outcome of a tracker operation.
pub fn record_operation(operation: &'static str, outcome: &'static str) {
    counter!(
        "phasekeeper_operations_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

/// Records one write request to the store.
pub fn record_store_write(kind: &'static str) {
    counter!("phasekeeper_store_writes_total", "kind" => kind).increment(1);
}

/// Sets the number of single-member groups left behind by lazy cleanup.
#[allow(clippy::cast_precision_loss)]
pub fn record_ghost_groups(count: usize) {
    gauge!("phasekeeper_ghost_groups").set(count as f64);
}
