use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};

use uuid::Uuid;

use super::{
    ProgressSink, RetentionDecider, RetentionError, RetentionResult, RunSettings, RunSummary,
    TracingProgress, TreeWalker,
};
use crate::{
    config::{PrunerConfig, RetentionConfig},
    db::{ArchiveRepo, ContentRepo, DbPool},
    models::Item,
    observability::metrics,
    rules::RuleList,
    snapshot::{FileSnapshotSink, SnapshotWriter},
};

/// Idle/running state shared by everything that can start a run.
#[derive(Debug, Default)]
pub struct RunGuard {
    running: AtomicBool,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move from idle to running. Returns `None` if a run is already active.
    pub fn try_start(self: &Arc<Self>) -> Option<RunPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit {
                guard: Arc::clone(self),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Proof that a run is active. Dropping it returns the guard to idle.
#[derive(Debug)]
pub struct RunPermit {
    guard: Arc<RunGuard>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::Release);
    }
}

/// Switch for an external indexing subsystem that can be paused during a
/// run.
pub trait IndexingControl: Send + Sync {
    fn is_enabled(&self) -> bool;

    fn set_enabled(&self, enabled: bool);
}

/// In-process indexing flag, enabled by default.
#[derive(Debug)]
pub struct IndexingSwitch {
    enabled: AtomicBool,
}

impl Default for IndexingSwitch {
    fn default() -> Self {
        Self {
            enabled: AtomicBool::new(true),
        }
    }
}

impl IndexingControl for IndexingSwitch {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}

/// Re-enables indexing when dropped.
struct IndexingPause {
    control: Arc<dyn IndexingControl>,
}

impl IndexingPause {
    /// Pause indexing if it is currently enabled.
    fn begin(control: &Arc<dyn IndexingControl>) -> Option<Self> {
        if !control.is_enabled() {
            return None;
        }
        tracing::info!("Temporarily disabling indexing");
        control.set_enabled(false);
        Some(Self {
            control: Arc::clone(control),
        })
    }
}

impl Drop for IndexingPause {
    fn drop(&mut self) {
        tracing::info!("Re-enabling indexing");
        self.control.set_enabled(true);
    }
}

/// Result of asking the coordinator for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RunSummary),
    /// Another run was in progress; nothing was done.
    AlreadyRunning,
}

/// Top-level orchestrator for prune runs.
///
/// At most one run is active per [`RunGuard`]; clones of a coordinator's
/// `Arc` share it.
pub struct RunCoordinator {
    content: Arc<dyn ContentRepo>,
    archive: Arc<dyn ArchiveRepo>,
    snapshots: Arc<SnapshotWriter>,
    item_rules: Arc<dyn RuleList>,
    version_rules: Arc<dyn RuleList>,
    root: String,
    settings: RunSettings,
    disable_indexing: bool,
    indexing: Option<Arc<dyn IndexingControl>>,
    progress: Arc<dyn ProgressSink>,
    guard: Arc<RunGuard>,
}

impl RunCoordinator {
    pub fn new(
        content: Arc<dyn ContentRepo>,
        archive: Arc<dyn ArchiveRepo>,
        snapshots: SnapshotWriter,
        item_rules: Arc<dyn RuleList>,
        version_rules: Arc<dyn RuleList>,
        config: &RetentionConfig,
    ) -> Self {
        Self {
            content,
            archive,
            snapshots: Arc::new(snapshots),
            item_rules,
            version_rules,
            root: config.root.clone(),
            settings: RunSettings::from(config),
            disable_indexing: config.disable_indexing,
            indexing: None,
            progress: Arc::new(TracingProgress),
            guard: Arc::new(RunGuard::new()),
        }
    }

    /// Wire a coordinator from configuration, with file snapshots and the
    /// configured rule lists.
    pub fn from_config(db: &DbPool, config: &PrunerConfig) -> RetentionResult<Self> {
        let item_rules = config.rules.item_rule_set()?;
        let version_rules = config.rules.version_rule_set()?;
        if version_rules.is_empty() {
            tracing::warn!("No version filter rules configured; no version will be removed");
        }

        Ok(Self::new(
            db.content(),
            db.archive(),
            SnapshotWriter::new(
                config.pruner.serialization_root.clone(),
                Arc::new(FileSnapshotSink),
            ),
            Arc::new(item_rules),
            Arc::new(version_rules),
            &config.pruner,
        ))
    }

    /// Indexing subsystem to pause while running, if `disable_indexing` is
    /// set.
    pub fn with_indexing(mut self, indexing: Arc<dyn IndexingControl>) -> Self {
        self.indexing = Some(indexing);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Share a run guard with other coordinators.
    pub fn with_guard(mut self, guard: Arc<RunGuard>) -> Self {
        self.guard = guard;
        self
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }

    /// Run from the configured root.
    pub async fn run(&self) -> RetentionResult<RunOutcome> {
        self.run_at(&self.root).await
    }

    /// Run from `root`, an item id or path.
    ///
    /// Returns [`RunOutcome::AlreadyRunning`] without doing anything if a run
    /// is in progress. Errors are logged and returned; the guard and the
    /// indexing state are restored on every path.
    pub async fn run_at(&self, root: &str) -> RetentionResult<RunOutcome> {
        let Some(_permit) = self.guard.try_start() else {
            tracing::info!("A prune run is already in progress; skipping");
            metrics::record_run("skipped", 0.0, 0);
            return Ok(RunOutcome::AlreadyRunning);
        };

        let _indexing = match &self.indexing {
            Some(control) if self.disable_indexing => IndexingPause::begin(control),
            None if self.disable_indexing => {
                tracing::warn!("disable_indexing is set but no indexing control is attached");
                None
            }
            _ => None,
        };

        let started = Instant::now();
        let mut summary = RunSummary {
            dry_run: self.settings.dry_run,
            ..Default::default()
        };

        match self.walk_from(root, &mut summary).await {
            Ok(()) => {
                let elapsed = started.elapsed().as_secs_f64();
                tracing::info!(
                    root,
                    items_visited = summary.items_visited,
                    items_matched = summary.items_matched,
                    items_unpublished = summary.items_unpublished,
                    versions_serialized = summary.versions_serialized,
                    versions_archived = summary.versions_archived,
                    versions_deleted = summary.versions_deleted,
                    snapshots_written = summary.snapshots_written,
                    dry_run = summary.dry_run,
                    elapsed_secs = elapsed,
                    "Prune run complete"
                );
                metrics::record_run("completed", elapsed, summary.items_visited);
                Ok(RunOutcome::Completed(summary))
            }
            Err(e) => {
                let elapsed = started.elapsed().as_secs_f64();
                tracing::error!(
                    root,
                    error = %e,
                    items_visited = summary.items_visited,
                    versions_deleted = summary.versions_deleted,
                    "Prune run failed"
                );
                metrics::record_run("failed", elapsed, summary.items_visited);
                Err(e)
            }
        }
    }

    async fn walk_from(&self, root: &str, summary: &mut RunSummary) -> RetentionResult<()> {
        let root_item = self.resolve_root(root).await?;
        tracing::info!(
            root = %root_item.path,
            policy = %self.settings.policy,
            dry_run = self.settings.dry_run,
            "Start prune search from root item"
        );

        let decider = RetentionDecider::new(
            Arc::clone(&self.content),
            Arc::clone(&self.archive),
            Arc::clone(&self.snapshots),
            Arc::clone(&self.version_rules),
            self.settings.clone(),
        );
        let walker = TreeWalker::new(
            Arc::clone(&self.content),
            Arc::clone(&self.item_rules),
            decider,
            Arc::clone(&self.progress),
        );
        walker.walk(root_item, summary).await
    }

    async fn resolve_root(&self, root: &str) -> RetentionResult<Item> {
        let root = root.trim();
        let item = match Uuid::parse_str(root) {
            Ok(id) => self.content.get_item(id).await?,
            Err(_) => self.content.get_item_by_path(root).await?,
        };
        item.ok_or_else(|| RetentionError::RootNotFound(root.to_string()))
    }
}
