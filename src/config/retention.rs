//! Pruner run configuration.
//!
//! # Example
//!
//! ```toml
//! [pruner]
//! root = "/sitecore/content"
//! languages = ["en", "da"]
//! policy = "mark_then_dispose"
//! archive_name = "VersionPruner"
//! serialization_root = "/var/lib/version-pruner/snapshots"
//! disable_indexing = true
//!
//! [pruner.safety]
//! dry_run = true
//! ```

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Settings for a prune run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Root of the subtree to prune: an item id or a path such as
    /// `/sitecore/content`.
    #[serde(default)]
    pub root: String,

    /// Languages to prune. Empty means every language an item has.
    #[serde(default)]
    pub languages: Vec<String>,

    /// How rule flags translate into dispositions.
    #[serde(default)]
    pub policy: RetentionPolicy,

    /// Archive name used when a rule does not name one.
    /// Default: "VersionPruner"
    #[serde(default = "default_archive_name")]
    pub archive_name: String,

    /// Actor recorded on new archival records.
    /// Default: "system"
    #[serde(default = "default_archived_by")]
    pub archived_by: String,

    /// Folder that snapshots are written under when a rule does not
    /// override it. Relative paths resolve against the working directory.
    /// Default: "VersionPruner"
    #[serde(default = "default_serialization_root")]
    pub serialization_root: PathBuf,

    /// Pause the external indexing subsystem while a run is in progress.
    ///
    /// Only has an effect when an `IndexingControl` is attached with
    /// `RunCoordinator::with_indexing`. The `version-pruner` binary has no
    /// indexing backend and attaches none.
    #[serde(default)]
    pub disable_indexing: bool,

    /// Deepest level below the root the walker descends to.
    /// Default: 512
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// How often `schedule` mode starts a run (in hours).
    /// Default: 24
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,

    /// Safety settings to prevent accidental data loss.
    #[serde(default)]
    pub safety: RetentionSafety,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            root: String::new(),
            languages: Vec::new(),
            policy: RetentionPolicy::default(),
            archive_name: default_archive_name(),
            archived_by: default_archived_by(),
            serialization_root: default_serialization_root(),
            disable_indexing: false,
            max_depth: default_max_depth(),
            interval_hours: default_interval_hours(),
            safety: RetentionSafety::default(),
        }
    }
}

impl RetentionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root.trim().is_empty() {
            return Err(ConfigError::Validation(
                "pruner.root must name an item id or path".into(),
            ));
        }
        if self.archive_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "pruner.archive_name cannot be empty".into(),
            ));
        }
        if self.max_depth == 0 {
            return Err(ConfigError::Validation(
                "pruner.max_depth must be greater than 0".into(),
            ));
        }
        if self.interval_hours == 0 {
            return Err(ConfigError::Validation(
                "pruner.interval_hours must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Interval between scheduled runs. Saturates for absurdly large values.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_hours.saturating_mul(3600))
    }
}

/// Which rule flags remove a version and what happens to it on the way out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Only versions flagged `MarkVersionForRemoval` are removed. The item
    /// filter's `ArchiveRemovedVersions` and `SerializeRemovedVersions`
    /// apply to every marked version of that item. All marked versions are
    /// deleted.
    #[default]
    MarkThenDispose,

    /// Versions flagged `ArchiveThisVersion` or `SerializeThisVersion` are
    /// selected. Selected versions are serialized and archived per their own
    /// flags, then deleted once the archive batch has committed.
    ArchiveOrDelete,
}

impl RetentionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetentionPolicy::MarkThenDispose => "mark_then_dispose",
            RetentionPolicy::ArchiveOrDelete => "archive_or_delete",
        }
    }
}

impl std::fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Safety settings for pruning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionSafety {
    /// If true, log what would be removed without serializing, archiving or
    /// deleting anything.
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,
}

fn default_archive_name() -> String {
    "VersionPruner".to_string()
}

fn default_archived_by() -> String {
    "system".to_string()
}

fn default_serialization_root() -> PathBuf {
    PathBuf::from("VersionPruner")
}

fn default_max_depth() -> usize {
    512
}

fn default_interval_hours() -> u64 {
    24
}
