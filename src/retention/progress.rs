/// Receives progress updates from the tree walker.
///
/// Updates are one-way; a sink cannot cancel a run.
pub trait ProgressSink: Send + Sync {
    /// `count` more items were processed.
    fn processed(&self, count: u64);

    /// Free-text status message.
    fn message(&self, message: &str);
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn processed(&self, _count: u64) {}

    fn message(&self, _message: &str) {}
}

/// Writes status messages to the log at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn processed(&self, _count: u64) {}

    fn message(&self, message: &str) {
        tracing::debug!(target: "version_pruner::progress", "{}", message);
    }
}
