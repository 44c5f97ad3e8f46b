//! Prometheus metrics for observability and monitoring.
//!
//! The store and the catalog record through the `metrics` facade; nothing is
//! exported until a recorder is installed. This module installs the
//! Prometheus recorder and describes every metric the workspace emits:
//! - Store actions, reducer timing and effect execution
//! - Store shutdown
//! - Catalog loads and rejected records
//!
//! # Example
//!
//! ```rust,no_run
//! use techevents_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut recorder = MetricsRecorder::new();
//! recorder.install()?;
//!
//! // ... run the catalog ...
//!
//! if let Some(text) = recorder.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics recorder.
///
/// Holds the handle used to render the text exposition format.
#[derive(Default)]
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl MetricsRecorder {
    /// Create a recorder that is not installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Install the Prometheus recorder globally and describe all metrics.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Build`] if the histogram buckets are rejected and
    /// [`MetricsError::Install`] if installation fails for a reason other than
    /// a recorder already being installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., by another test), this returns
    /// `Ok(())` without a handle and [`MetricsRecorder::render`] yields `None`.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.000_01, 0.000_05, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0,
                    5.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                // Descriptions only stick once a recorder is in place.
                register_metrics();
                self.handle = Some(handle);
                tracing::info!("Prometheus metrics recorder installed");
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this recorder was not the one installed.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Store Metrics
    describe_counter!(
        "store.commands.total",
        "Total number of actions sent to a store"
    );
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time spent inside the reducer per action"
    );
    describe_histogram!(
        "store.effects.count",
        "Number of effects returned per reducer call"
    );
    describe_counter!(
        "store.effects.executed",
        "Effects executed, labelled by effect type"
    );
    describe_counter!(
        "store.shutdown.initiated",
        "Graceful shutdowns started"
    );
    describe_counter!(
        "store.shutdown.completed",
        "Graceful shutdowns that drained all effects"
    );
    describe_counter!(
        "store.shutdown.timeout",
        "Graceful shutdowns that timed out"
    );
    describe_counter!(
        "store.shutdown.rejected_actions",
        "Actions rejected because the store was shutting down"
    );

    // Catalog Metrics
    describe_counter!(
        "catalog.loads.started",
        "Catalog loads requested"
    );
    describe_counter!(
        "catalog.loads.succeeded",
        "Catalog loads applied to state"
    );
    describe_counter!(
        "catalog.loads.failed",
        "Catalog loads that failed and kept the previous list"
    );
    describe_counter!(
        "catalog.loads.stale",
        "Load results dropped because a newer load was requested"
    );
    describe_histogram!(
        "catalog.fetch.duration_seconds",
        "Time taken by the concurrent events and platforms fetch"
    );
    describe_counter!(
        "catalog.records.rejected",
        "Backend rows skipped by the record mapper"
    );
}

/// Catalog load metrics recorder.
pub struct LoadMetrics;

impl LoadMetrics {
    /// Record a load request.
    pub fn record_started() {
        counter!("catalog.loads.started").increment(1);
    }

    /// Record a completed fetch and its duration.
    pub fn record_fetch(duration: Duration) {
        histogram!("catalog.fetch.duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a load result applied to state.
    pub fn record_succeeded() {
        counter!("catalog.loads.succeeded").increment(1);
    }

    /// Record a failed load.
    pub fn record_failed() {
        counter!("catalog.loads.failed").increment(1);
    }

    /// Record a result superseded by a newer request.
    pub fn record_stale() {
        counter!("catalog.loads.stale").increment(1);
    }

    /// Record rows rejected by the mapper.
    pub fn record_rejected(count: usize) {
        counter!("catalog.records.rejected").increment(count as u64);
    }
}
