//! Prometheus Metrics Module
//!
//! Exposes ingestion and window metrics in Prometheus format.
//!
//! # Metrics Categories
//!
//! - **Ingestion**: Live points by outcome (stored, rejected, invalid)
//! - **Bootstrap**: Historical points preloaded
//! - **Windows**: Number of symbols with a window
//! - **Latency**: Time spent in a single ingest call
//!
//! # Integration
//!
//! Metrics are rendered at `/metrics` on the query server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder once and return its handle.
///
/// Later calls return the handle installed by the first one.
///
/// # Errors
///
/// Returns `BuildError` if another global recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "stream_window_points_ingested_total",
        "Live points received, labelled by outcome"
    );
    describe_counter!(
        "stream_window_points_preloaded_total",
        "Historical points pushed into windows during bootstrap"
    );
    describe_gauge!(
        "stream_window_active_symbols",
        "Number of symbols that currently have a window"
    );
    describe_histogram!(
        "stream_window_ingest_seconds",
        "Time to normalize, gate, and store one live point"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Outcome label for an ingested live point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestLabel {
    /// Admitted and appended.
    Stored,
    /// Outside the regular session.
    Rejected,
    /// Timestamp or symbol could not be normalized.
    Invalid,
}

impl IngestLabel {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Rejected => "rejected",
            Self::Invalid => "invalid",
        }
    }
}

/// Record one live point and how long it took.
pub fn record_ingest(outcome: IngestLabel, duration: Duration) {
    counter!(
        "stream_window_points_ingested_total",
        "outcome" => outcome.as_str()
    )
    .increment(1);
    histogram!("stream_window_ingest_seconds").record(duration.as_secs_f64());
}

/// Record historical points preloaded for a symbol.
pub fn record_preloaded(count: usize) {
    counter!("stream_window_points_preloaded_total").increment(count as u64);
}

/// Update the number of symbols with a window.
#[allow(clippy::cast_precision_loss)]
pub fn set_active_symbols(count: usize) {
    gauge!("stream_window_active_symbols").set(count as f64);
}

// =============================================================================
// Tests
// =============================================================================
