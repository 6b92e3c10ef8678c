//! Prometheus metrics for the pruner.
//!
//! Provides metrics for:
//! - Versions deleted, archived and serialized
//! - Snapshots written
//! - Run outcomes and durations
//!
//! Every recording function is a no-op unless the `prometheus` feature is
//! compiled in and `observability.metrics.enabled` is set.

#[cfg(feature = "prometheus")]
use metrics::{counter, gauge, histogram};
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

use crate::config::MetricsConfig;

/// Run durations span seconds to hours on large trees.
#[cfg(feature = "prometheus")]
const RUN_DURATION_BUCKETS: &[f64] = &[1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 3600.0, 14400.0];

/// Initialize the metrics system and start the scrape endpoint.
///
/// Must be called from within a tokio runtime; the HTTP listener runs as a
/// background task on it.
#[cfg(feature = "prometheus")]
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(config.listen)
        .set_buckets_for_metric(
            Matcher::Suffix("_duration_seconds".to_string()),
            RUN_DURATION_BUCKETS,
        )
        .map_err(|e| MetricsError::Setup(e.to_string()))?
        .install()
        .map_err(MetricsError::Install)?;

    tracing::info!(listen = %config.listen, "Prometheus metrics endpoint started");
    Ok(())
}

/// Initialize the metrics system (no-op without prometheus feature).
#[cfg(not(feature = "prometheus"))]
pub fn init_metrics(_config: &MetricsConfig) -> Result<(), MetricsError> {
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Metric Recording Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Record versions handled by a prune run.
///
/// # Arguments
/// * `action` - What happened to them: `deleted`, `archived` or `serialized`
/// * `language` - Language of the versions
/// * `count` - Number of versions
pub fn record_versions(action: &str, language: &str, count: u64) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "pruner_versions_total",
            "action" => action.to_string(),
            "language" => language.to_string()
        )
        .increment(count);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (action, language, count);
    }
}

/// Record a snapshot file written.
pub fn record_snapshot_written() {
    #[cfg(feature = "prometheus")]
    {
        counter!("pruner_snapshots_written_total").increment(1);
    }
}

/// Record the end of a run.
///
/// # Arguments
/// * `outcome` - `completed`, `failed` or `skipped` (another run was active)
/// * `duration_secs` - Wall-clock duration of the run
/// * `items_visited` - Number of items the walker visited
pub fn record_run(outcome: &str, duration_secs: f64, items_visited: u64) {
    #[cfg(feature = "prometheus")]
    {
        counter!("pruner_runs_total", "outcome" => outcome.to_string()).increment(1);
        histogram!("pruner_run_duration_seconds", "outcome" => outcome.to_string())
            .record(duration_secs);
        gauge!("pruner_last_run_items_visited").set(items_visited as f64);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = (outcome, duration_secs, items_visited);
    }
}

/// Metrics initialization errors.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to set up metrics: {0}")]
    Setup(String),

    #[cfg(feature = "prometheus")]
    #[error("Failed to install metrics recorder: {0}")]
    Install(#[from] metrics_exporter_prometheus::BuildError),
}
