//! Version retention: deciding which historical versions go, and making
//! them go.
//!
//! A run is driven by the [`RunCoordinator`], which:
//! 1. Makes sure no other run is in progress (a second caller is a no-op)
//! 2. Optionally pauses external indexing for the run's duration
//! 3. Resolves the root item and hands it to the [`TreeWalker`]
//!
//! The walker visits every item below the root exactly once, parent before
//! children. Items the item filter accepts are passed to the
//! [`RetentionDecider`], which, per language, finds the latest valid version,
//! runs the version filter over every older version, and then serializes,
//! archives and deletes according to the configured [`RetentionPolicy`].
//!
//! All side effects are skipped in dry-run mode; dispositions are still
//! computed and logged.
//!
//! [`RetentionPolicy`]: crate::config::RetentionPolicy

mod coordinator;
mod decider;
mod progress;
mod walker;
mod worker;

pub use coordinator::{
    IndexingControl, IndexingSwitch, RunCoordinator, RunGuard, RunOutcome, RunPermit,
};
pub use decider::{LanguagePlan, PlannedVersion, RetentionDecider, latest_valid_version};
pub use progress::{NoProgress, ProgressSink, TracingProgress};
use thiserror::Error;
pub use walker::TreeWalker;
pub use worker::start_retention_worker;

use crate::{
    config::{RetentionConfig, RetentionPolicy},
    db::DbError,
    rules::RuleError,
    snapshot::SnapshotError,
};

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum RetentionError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Rule error: {0}")]
    Rules(#[from] RuleError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Root item not found: {0}")]
    RootNotFound(String),

    #[error("Item {path} is deeper than the maximum depth of {max_depth}")]
    DepthExceeded { path: String, max_depth: usize },
}

pub type RetentionResult<T> = Result<T, RetentionError>;

/// Run-scoped settings, taken from [`RetentionConfig`] when a run starts.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub policy: RetentionPolicy,
    /// Empty means every language an item has.
    pub languages: Vec<String>,
    pub archive_name: String,
    pub archived_by: String,
    pub dry_run: bool,
    pub max_depth: usize,
}

impl From<&RetentionConfig> for RunSettings {
    fn from(config: &RetentionConfig) -> Self {
        Self {
            policy: config.policy,
            languages: config.languages.clone(),
            archive_name: config.archive_name.clone(),
            archived_by: config.archived_by.clone(),
            dry_run: config.safety.dry_run,
            max_depth: config.max_depth,
        }
    }
}

/// Counters for a single run.
///
/// In dry-run mode the version and snapshot counts are what the run would
/// have done.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Items the walker visited.
    pub items_visited: u64,
    /// Items the item filter accepted.
    pub items_matched: u64,
    /// Accepted items skipped in at least one language because no version
    /// was valid.
    pub items_unpublished: u64,
    pub versions_serialized: u64,
    pub versions_archived: u64,
    pub versions_deleted: u64,
    pub snapshots_written: u64,
    pub dry_run: bool,
}

impl RunSummary {
    /// Whether the run touched (or would have touched) any version.
    pub fn has_changes(&self) -> bool {
        self.versions_serialized + self.versions_archived + self.versions_deleted > 0
    }
}
