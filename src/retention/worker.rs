//! Scheduled prune worker.
//!
//! Runs the coordinator from the configured root on a fixed interval. Runs
//! never overlap: a tick that finds a run in progress is skipped.

use std::sync::Arc;

use super::{RunCoordinator, RunOutcome};
use crate::config::RetentionConfig;

/// Starts the prune worker loop.
///
/// Runs indefinitely until the task is cancelled. Failed runs are logged and
/// retried on the next tick.
pub async fn start_retention_worker(coordinator: Arc<RunCoordinator>, config: RetentionConfig) {
    let dry_run_msg = if config.safety.dry_run {
        " (DRY RUN)"
    } else {
        ""
    };

    tracing::info!(
        interval_hours = config.interval_hours,
        root = %config.root,
        policy = %config.policy,
        dry_run = config.safety.dry_run,
        "Starting prune worker{}",
        dry_run_msg
    );

    let interval = config.interval();

    loop {
        match coordinator.run().await {
            Ok(RunOutcome::Completed(summary)) => {
                if summary.has_changes() {
                    tracing::info!(
                        items_visited = summary.items_visited,
                        versions_deleted = summary.versions_deleted,
                        versions_archived = summary.versions_archived,
                        snapshots_written = summary.snapshots_written,
                        dry_run = summary.dry_run,
                        "Scheduled prune run complete{}",
                        dry_run_msg
                    );
                } else {
                    tracing::debug!(
                        items_visited = summary.items_visited,
                        "Scheduled prune run complete, no versions to remove"
                    );
                }
            }
            Ok(RunOutcome::AlreadyRunning) => {
                tracing::debug!("Previous prune run still in progress, skipping tick");
            }
            Err(e) => {
                tracing::error!(error = %e, "Error running scheduled prune");
            }
        }

        tokio::time::sleep(interval).await;
    }
}
