use std::{path::Path, sync::Arc};

use chrono::{DateTime, Utc};

use super::{RetentionResult, RunSettings, RunSummary};
use crate::{
    config::RetentionPolicy,
    db::{ArchiveRepo, ContentRepo},
    models::{ArchiveTarget, Disposition, Item, ItemDump, ItemVersion, VersionRef},
    observability::metrics,
    rules::{ItemFilterOutcome, RuleContext, RuleList, RuleResult, VersionFilterOutcome},
    snapshot::SnapshotWriter,
};

/// Highest-numbered version that is valid at `now`.
pub fn latest_valid_version(versions: &[ItemVersion], now: DateTime<Utc>) -> Option<&ItemVersion> {
    versions
        .iter()
        .filter(|v| v.is_valid_at(now))
        .max_by_key(|v| v.number)
}

/// Decision for one pruning candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedVersion {
    pub number: u32,
    pub disposition: Disposition,
    /// Snapshot root requested by the version filter, if any.
    pub serialize_root: Option<String>,
}

impl PlannedVersion {
    fn keep(number: u32) -> Self {
        Self {
            number,
            disposition: Disposition::Keep,
            serialize_root: None,
        }
    }
}

/// Decisions for every candidate of one item in one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePlan {
    pub language: String,
    /// Number of the latest valid version; every candidate is below it.
    pub latest_valid: u32,
    /// One entry per candidate, ascending by number.
    pub versions: Vec<PlannedVersion>,
}

impl LanguagePlan {
    pub fn serialize_set(&self) -> Vec<u32> {
        self.numbers(|v| v.disposition.serializes())
    }

    pub fn archive_set(&self) -> Vec<u32> {
        self.numbers(|v| v.disposition.archives())
    }

    /// Every disposed version, archived ones included. Deletion runs after
    /// the archive batch has committed.
    pub fn delete_set(&self) -> Vec<u32> {
        self.numbers(|v| !v.disposition.is_keep())
    }

    pub fn is_noop(&self) -> bool {
        self.versions.iter().all(|v| v.disposition.is_keep())
    }

    fn numbers(&self, pred: impl Fn(&PlannedVersion) -> bool) -> Vec<u32> {
        self.versions
            .iter()
            .filter(|v| pred(v))
            .map(|v| v.number)
            .collect()
    }

    fn serialize_root(&self) -> Option<&str> {
        self.versions
            .iter()
            .filter(|v| v.disposition.serializes())
            .find_map(|v| v.serialize_root.as_deref())
    }
}

fn classify(
    policy: RetentionPolicy,
    directives: &ItemFilterOutcome,
    number: u32,
    outcome: &VersionFilterOutcome,
) -> PlannedVersion {
    match policy {
        RetentionPolicy::MarkThenDispose if outcome.mark_for_removal => PlannedVersion {
            number,
            disposition: Disposition::disposed(
                directives.serialize_removed_versions,
                directives.archive_removed_versions,
            ),
            serialize_root: None,
        },
        RetentionPolicy::ArchiveOrDelete if outcome.archive || outcome.serialize => {
            PlannedVersion {
                number,
                disposition: Disposition::disposed(outcome.serialize, outcome.archive),
                serialize_root: outcome.serialize_root_folder.clone(),
            }
        }
        _ => PlannedVersion::keep(number),
    }
}

/// Decides and executes the fate of an item's historical versions.
pub struct RetentionDecider {
    content: Arc<dyn ContentRepo>,
    archive: Arc<dyn ArchiveRepo>,
    snapshots: Arc<SnapshotWriter>,
    version_rules: Arc<dyn RuleList>,
    settings: RunSettings,
}

impl RetentionDecider {
    pub fn new(
        content: Arc<dyn ContentRepo>,
        archive: Arc<dyn ArchiveRepo>,
        snapshots: Arc<SnapshotWriter>,
        version_rules: Arc<dyn RuleList>,
        settings: RunSettings,
    ) -> Self {
        Self {
            content,
            archive,
            snapshots,
            version_rules,
            settings,
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Classify the candidates of one language without touching the store.
    ///
    /// Returns `None` when no version is valid at `now`; such a language is
    /// never pruned.
    pub fn plan_language(
        &self,
        item: &Item,
        directives: &ItemFilterOutcome,
        language: &str,
        versions: &[ItemVersion],
        now: DateTime<Utc>,
    ) -> RuleResult<Option<LanguagePlan>> {
        let Some(latest) = latest_valid_version(versions, now) else {
            return Ok(None);
        };

        let mut candidates: Vec<&ItemVersion> = versions
            .iter()
            .filter(|v| v.number < latest.number)
            .collect();
        candidates.sort_by_key(|v| v.number);

        tracing::debug!(
            item_path = %item.path,
            language,
            latest_valid = latest.number,
            candidates = candidates.len(),
            "Pruning candidates"
        );

        let mut planned = Vec::with_capacity(candidates.len());
        for version in candidates {
            let mut ctx = RuleContext::for_version(item, version, latest);
            self.version_rules.run(&mut ctx)?;
            let outcome = VersionFilterOutcome::from_context(&ctx);
            planned.push(classify(
                self.settings.policy,
                directives,
                version.number,
                &outcome,
            ));
        }

        Ok(Some(LanguagePlan {
            language: language.to_string(),
            latest_valid: latest.number,
            versions: planned,
        }))
    }

    /// Prune one item that the item filter accepted.
    ///
    /// Every language is planned before anything is written, so a rule error
    /// leaves the item untouched. The item dump for snapshots is taken once,
    /// before any version is deleted.
    pub async fn trim_item_versions(
        &self,
        item: &Item,
        directives: &ItemFilterOutcome,
        summary: &mut RunSummary,
    ) -> RetentionResult<()> {
        let now = Utc::now();
        let languages = if self.settings.languages.is_empty() {
            self.content.languages(item.id).await?
        } else {
            self.settings.languages.clone()
        };

        let mut plans = Vec::with_capacity(languages.len());
        let mut unpublished = false;
        for language in &languages {
            let versions = self.content.versions(item.id, language).await?;
            if versions.is_empty() {
                continue;
            }
            match self.plan_language(item, directives, language, &versions, now)? {
                Some(plan) => plans.push(plan),
                None => {
                    tracing::warn!(
                        item_path = %item.path,
                        language = %language,
                        "Item does not have a published version. This item will NOT be pruned"
                    );
                    unpublished = true;
                }
            }
        }
        if unpublished {
            summary.items_unpublished += 1;
        }

        let needs_dump = !self.settings.dry_run
            && plans.iter().any(|p| !p.serialize_set().is_empty());
        let dump = if needs_dump {
            Some(self.content.dump_item(item).await?)
        } else {
            None
        };

        for plan in plans.iter().filter(|p| !p.is_noop()) {
            if self.settings.dry_run {
                self.report_dry_run(item, plan, summary);
            } else {
                self.execute(item, directives, plan, dump.as_ref(), summary)
                    .await?;
            }
        }

        Ok(())
    }

    async fn execute(
        &self,
        item: &Item,
        directives: &ItemFilterOutcome,
        plan: &LanguagePlan,
        dump: Option<&ItemDump>,
        summary: &mut RunSummary,
    ) -> RetentionResult<()> {
        let serialize = plan.serialize_set();
        if !serialize.is_empty()
            && let Some(dump) = dump
        {
            let root = plan
                .serialize_root()
                .or(directives.serialize_root_folder.as_deref())
                .map(Path::new);
            self.snapshots
                .serialize_item_versions(root, dump, &serialize)
                .await?;
            summary.snapshots_written += 1;
            summary.versions_serialized += serialize.len() as u64;
            metrics::record_snapshot_written();
            metrics::record_versions("serialized", &plan.language, serialize.len() as u64);
        }

        let archive = plan.archive_set();
        if !archive.is_empty() {
            let target = ArchiveTarget {
                archive_name: directives
                    .archive_name
                    .clone()
                    .unwrap_or_else(|| self.settings.archive_name.clone()),
                archived_by: self.settings.archived_by.clone(),
            };
            let refs: Vec<VersionRef> = archive
                .iter()
                .map(|&number| VersionRef {
                    item_id: item.id,
                    language: plan.language.clone(),
                    number,
                })
                .collect();
            let result = self
                .archive
                .archive_item_versions(item, &refs, &target)
                .await?;

            tracing::info!(
                item_path = %item.path,
                language = %plan.language,
                archive_name = %target.archive_name,
                archival_id = %result.archival_id,
                versions = result.versions,
                field_rows = result.field_rows,
                "Archived versions"
            );
            summary.versions_archived += result.versions as u64;
            metrics::record_versions("archived", &plan.language, result.versions as u64);
        }

        let mut deleted = 0u64;
        for number in plan.delete_set() {
            tracing::info!(
                target: "audit",
                language = %plan.language,
                item_path = %item.path,
                version = number,
                "Delete version: [{}][{}][vers# {}]",
                plan.language,
                item.path,
                number
            );
            if self
                .content
                .remove_version(item.id, &plan.language, number)
                .await?
            {
                deleted += 1;
            } else {
                tracing::warn!(
                    item_path = %item.path,
                    language = %plan.language,
                    version = number,
                    "Version was already removed"
                );
            }
        }
        if deleted > 0 {
            summary.versions_deleted += deleted;
            metrics::record_versions("deleted", &plan.language, deleted);
        }

        Ok(())
    }

    fn report_dry_run(&self, item: &Item, plan: &LanguagePlan, summary: &mut RunSummary) {
        for version in plan.versions.iter().filter(|v| !v.disposition.is_keep()) {
            tracing::info!(
                item_path = %item.path,
                language = %plan.language,
                version = version.number,
                disposition = %version.disposition,
                "DRY RUN: Would dispose of version"
            );
        }

        let serialize = plan.serialize_set();
        if !serialize.is_empty() {
            summary.snapshots_written += 1;
            summary.versions_serialized += serialize.len() as u64;
        }
        summary.versions_archived += plan.archive_set().len() as u64;
        summary.versions_deleted += plan.delete_set().len() as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(mark: bool, archive: bool, serialize: bool) -> VersionFilterOutcome {
        VersionFilterOutcome {
            mark_for_removal: mark,
            archive,
            serialize,
            serialize_root_folder: None,
        }
    }

    #[test]
    fn test_mark_then_dispose_uses_item_directives() {
        let directives = ItemFilterOutcome {
            valid_for_version_removal: true,
            archive_removed_versions: true,
            serialize_removed_versions: true,
            ..Default::default()
        };

        let marked = classify(
            RetentionPolicy::MarkThenDispose,
            &directives,
            3,
            &outcome(true, false, false),
        );
        assert_eq!(marked.disposition, Disposition::DeleteSerializeArchive);

        // Per-version archive/serialize flags alone do nothing under this policy
        let unmarked = classify(
            RetentionPolicy::MarkThenDispose,
            &directives,
            4,
            &outcome(false, true, true),
        );
        assert_eq!(unmarked, PlannedVersion::keep(4));
    }

    #[test]
    fn test_archive_or_delete_disposes_flagged_versions() {
        let directives = ItemFilterOutcome::default();

        let archived = classify(
            RetentionPolicy::ArchiveOrDelete,
            &directives,
            1,
            &outcome(false, true, false),
        );
        assert_eq!(archived.disposition, Disposition::DeleteArchive);

        let serialized = classify(
            RetentionPolicy::ArchiveOrDelete,
            &directives,
            2,
            &outcome(false, false, true),
        );
        assert_eq!(serialized.disposition, Disposition::DeleteSerialize);

        // The mark flag is not part of this policy's vocabulary
        let marked = classify(
            RetentionPolicy::ArchiveOrDelete,
            &directives,
            3,
            &outcome(true, false, false),
        );
        assert!(marked.disposition.is_keep());
    }

    #[test]
    fn test_plan_sets() {
        let plan = LanguagePlan {
            language: "en".into(),
            latest_valid: 6,
            versions: vec![
                PlannedVersion {
                    number: 1,
                    disposition: Disposition::DeleteSerializeArchive,
                    serialize_root: Some("/snapshots".into()),
                },
                PlannedVersion {
                    number: 2,
                    disposition: Disposition::DeleteSerialize,
                    serialize_root: None,
                },
                PlannedVersion::keep(3),
                PlannedVersion {
                    number: 4,
                    disposition: Disposition::Delete,
                    serialize_root: None,
                },
            ],
        };

        assert_eq!(plan.serialize_set(), vec![1, 2]);
        assert_eq!(plan.archive_set(), vec![1]);
        assert_eq!(plan.delete_set(), vec![1, 2, 4]);
        assert_eq!(plan.serialize_root(), Some("/snapshots"));
        assert!(!plan.is_noop());
    }

    #[test]
    fn test_latest_valid_skips_unpublished_versions() {
        use std::collections::BTreeMap;

        use uuid::Uuid;

        use crate::models::PublishingWindow;

        let now = Utc::now();
        let version = |number: u32, hidden: bool| ItemVersion {
            item_id: Uuid::nil(),
            language: "en".into(),
            number,
            publishing: PublishingWindow {
                hidden,
                ..Default::default()
            },
            fields: BTreeMap::new(),
        };

        let versions = vec![version(1, false), version(2, false), version(3, true)];
        assert_eq!(latest_valid_version(&versions, now).map(|v| v.number), Some(2));

        let hidden = vec![version(1, true)];
        assert!(latest_valid_version(&hidden, now).is_none());
        assert!(latest_valid_version(&[], now).is_none());
    }

    #[cfg(feature = "database-sqlite")]
    mod sqlite {
        use std::path::PathBuf;

        use uuid::Uuid;

        use super::super::*;
        use crate::{
            db::{
                DbPool,
                tests::harness::{
                    count_rows, create_db_pool, insert_item, insert_version_with_fields,
                    insert_versions, live_versions,
                },
            },
            models::publishing_fields,
            rules::{Action, Condition, Rule, RuleError, RuleSet},
            snapshot::FileSnapshotSink,
        };

        fn rule(when: Condition, actions: Vec<Action>) -> Rule {
            Rule {
                name: None,
                when,
                actions,
            }
        }

        fn settings(policy: RetentionPolicy) -> RunSettings {
            RunSettings {
                policy,
                languages: Vec::new(),
                archive_name: "VersionPruner".into(),
                archived_by: "pruner-test".into(),
                dry_run: false,
                max_depth: 16,
            }
        }

        fn decider(
            db: &DbPool,
            snapshot_root: &Path,
            rules: Vec<Rule>,
            settings: RunSettings,
        ) -> RetentionDecider {
            RetentionDecider::new(
                db.content(),
                db.archive(),
                Arc::new(SnapshotWriter::new(snapshot_root, Arc::new(FileSnapshotSink))),
                Arc::new(RuleSet::new("version_filter", rules).unwrap()),
                settings,
            )
        }

        fn accepted() -> ItemFilterOutcome {
            ItemFilterOutcome {
                valid_for_version_removal: true,
                ..Default::default()
            }
        }

        async fn load(db: &DbPool, id: Uuid) -> Item {
            db.content().get_item(id).await.unwrap().unwrap()
        }

        #[tokio::test]
        async fn test_removes_versions_older_than_threshold() {
            let (db, pool) = create_db_pool().await;
            let snapshots = tempfile::tempdir().unwrap();
            let id = insert_item(&pool, "home", None).await;
            insert_versions(&pool, id, "en", &[1, 2, 3, 4, 5]).await;

            let decider = decider(
                &db,
                snapshots.path(),
                vec![rule(
                    Condition::VersionOlderThan { versions: 2 },
                    vec![Action::MarkVersionForRemoval],
                )],
                settings(RetentionPolicy::MarkThenDispose),
            );
            let item = load(&db, id).await;
            let mut summary = RunSummary::default();
            decider
                .trim_item_versions(&item, &accepted(), &mut summary)
                .await
                .unwrap();

            assert_eq!(live_versions(&pool, id, "en").await, vec![3, 4, 5]);
            assert_eq!(summary.versions_deleted, 2);
            assert_eq!(summary.versions_archived, 0);
            assert_eq!(count_rows(&pool, "ArchivedFields").await, 0);
        }

        #[tokio::test]
        async fn test_never_prunes_latest_valid_or_newer() {
            let (db, pool) = create_db_pool().await;
            let snapshots = tempfile::tempdir().unwrap();
            let id = insert_item(&pool, "home", None).await;
            insert_versions(&pool, id, "en", &[1, 2, 3, 4]).await;
            // Version 5 is scheduled for the future
            insert_version_with_fields(
                &pool,
                id,
                "en",
                5,
                &[(publishing_fields::VALID_FROM, "2999-01-01T00:00:00Z")],
            )
            .await;

            let decider = decider(
                &db,
                snapshots.path(),
                vec![rule(Condition::Always, vec![Action::MarkVersionForRemoval])],
                settings(RetentionPolicy::MarkThenDispose),
            );
            let item = load(&db, id).await;
            let mut summary = RunSummary::default();
            decider
                .trim_item_versions(&item, &accepted(), &mut summary)
                .await
                .unwrap();

            assert_eq!(live_versions(&pool, id, "en").await, vec![4, 5]);
            assert_eq!(summary.versions_deleted, 3);
        }

        #[tokio::test]
        async fn test_unpublished_item_is_left_alone() {
            let (db, pool) = create_db_pool().await;
            let snapshots = tempfile::tempdir().unwrap();
            let id = insert_item(&pool, "draft", None).await;
            for number in 1..=3 {
                insert_version_with_fields(
                    &pool,
                    id,
                    "en",
                    number,
                    &[(publishing_fields::HIDE_VERSION, "1")],
                )
                .await;
            }

            let decider = decider(
                &db,
                snapshots.path(),
                vec![rule(Condition::Always, vec![Action::MarkVersionForRemoval])],
                settings(RetentionPolicy::MarkThenDispose),
            );
            let item = load(&db, id).await;
            let mut summary = RunSummary::default();
            decider
                .trim_item_versions(&item, &accepted(), &mut summary)
                .await
                .unwrap();

            assert_eq!(live_versions(&pool, id, "en").await, vec![1, 2, 3]);
            assert_eq!(summary.items_unpublished, 1);
            assert_eq!(summary.versions_deleted, 0);
        }

        #[tokio::test]
        async fn test_item_directives_serialize_and_archive_marked_versions() {
            let (db, pool) = create_db_pool().await;
            let snapshots = tempfile::tempdir().unwrap();
            let override_root = tempfile::tempdir().unwrap();
            let id = insert_item(&pool, "news", None).await;
            insert_versions(&pool, id, "en", &[1, 2, 3, 4]).await;

            let decider = decider(
                &db,
                snapshots.path(),
                vec![rule(
                    Condition::VersionOlderThan { versions: 1 },
                    vec![Action::MarkVersionForRemoval],
                )],
                settings(RetentionPolicy::MarkThenDispose),
            );
            let directives = ItemFilterOutcome {
                valid_for_version_removal: true,
                archive_removed_versions: true,
                archive_name: Some("News".into()),
                serialize_removed_versions: true,
                serialize_root_folder: Some(override_root.path().to_string_lossy().into_owned()),
            };
            let item = load(&db, id).await;
            let mut summary = RunSummary::default();
            decider
                .trim_item_versions(&item, &directives, &mut summary)
                .await
                .unwrap();

            // 1 and 2 are more than one version older than 4
            assert_eq!(live_versions(&pool, id, "en").await, vec![3, 4]);
            assert_eq!(summary.versions_serialized, 2);
            assert_eq!(summary.versions_archived, 2);
            assert_eq!(summary.versions_deleted, 2);
            assert_eq!(summary.snapshots_written, 1);

            let record = db
                .archive()
                .get_archive_record(id, "News")
                .await
                .unwrap()
                .expect("archive record under the rule's archive name");
            let fields = db
                .archive()
                .list_archived_fields(record.archival_id)
                .await
                .unwrap();
            let mut archived: Vec<u32> = fields.iter().map(|f| f.version).collect();
            archived.dedup();
            assert_eq!(archived, vec![1, 2]);

            let files = walk_files(override_root.path());
            assert_eq!(files.len(), 1);
            assert!(files[0].ends_with("Versions_1-2"));
            assert!(walk_files(snapshots.path()).is_empty());
        }

        #[tokio::test]
        async fn test_archive_or_delete_policy() {
            let (db, pool) = create_db_pool().await;
            let snapshots = tempfile::tempdir().unwrap();
            let id = insert_item(&pool, "home", None).await;
            insert_versions(&pool, id, "en", &[1, 2, 3, 4, 5]).await;

            let decider = decider(
                &db,
                snapshots.path(),
                vec![
                    // v1: archive
                    rule(
                        Condition::VersionOlderThan { versions: 3 },
                        vec![Action::ArchiveThisVersion],
                    ),
                    // v2: serialize
                    rule(
                        Condition::All {
                            conditions: vec![
                                Condition::Not {
                                    inner: Box::new(Condition::VersionOlderThan { versions: 3 }),
                                },
                                Condition::VersionOlderThan { versions: 2 },
                            ],
                        },
                        vec![Action::SerializeThisVersion { root_folder: None }],
                    ),
                ],
                settings(RetentionPolicy::ArchiveOrDelete),
            );
            let item = load(&db, id).await;
            let mut summary = RunSummary::default();
            decider
                .trim_item_versions(&item, &accepted(), &mut summary)
                .await
                .unwrap();

            // Archived version 1 and serialized version 2 both leave the live store
            assert_eq!(live_versions(&pool, id, "en").await, vec![3, 4, 5]);
            assert_eq!(summary.versions_archived, 1);
            assert_eq!(summary.versions_serialized, 1);
            assert_eq!(summary.versions_deleted, 2);
            assert_eq!(count_rows(&pool, "ArchivedFields").await, 1);

            let record = db
                .archive()
                .get_archive_record(id, "VersionPruner")
                .await
                .unwrap()
                .unwrap();
            assert_eq!(record.archived_by, "pruner-test");

            let files = walk_files(snapshots.path());
            assert_eq!(files.len(), 1);
            assert!(files[0].ends_with("Versions_2"));
        }

        #[tokio::test]
        async fn test_archive_or_delete_repeat_runs_archive_once() {
            let (db, pool) = create_db_pool().await;
            let snapshots = tempfile::tempdir().unwrap();
            let id = insert_item(&pool, "home", None).await;
            insert_versions(&pool, id, "en", &[1, 2, 3, 4, 5]).await;

            let decider = decider(
                &db,
                snapshots.path(),
                vec![rule(
                    Condition::VersionOlderThan { versions: 3 },
                    vec![Action::ArchiveThisVersion],
                )],
                settings(RetentionPolicy::ArchiveOrDelete),
            );
            let item = load(&db, id).await;

            let mut first = RunSummary::default();
            decider
                .trim_item_versions(&item, &accepted(), &mut first)
                .await
                .unwrap();
            assert_eq!(live_versions(&pool, id, "en").await, vec![2, 3, 4, 5]);
            assert_eq!(count_rows(&pool, "ArchivedFields").await, 1);
            assert_eq!(first.versions_archived, 1);
            assert_eq!(first.versions_deleted, 1);

            for _ in 0..2 {
                let mut again = RunSummary::default();
                decider
                    .trim_item_versions(&item, &accepted(), &mut again)
                    .await
                    .unwrap();
                assert_eq!(live_versions(&pool, id, "en").await, vec![2, 3, 4, 5]);
                assert_eq!(count_rows(&pool, "ArchivedFields").await, 1);
                assert!(!again.has_changes());
            }
        }

        #[tokio::test]
        async fn test_languages_are_pruned_independently() {
            let (db, pool) = create_db_pool().await;
            let snapshots = tempfile::tempdir().unwrap();
            let id = insert_item(&pool, "home", None).await;
            insert_versions(&pool, id, "en", &[1, 2, 3]).await;
            insert_versions(&pool, id, "da", &[1, 2]).await;

            let decider = decider(
                &db,
                snapshots.path(),
                vec![rule(Condition::Always, vec![Action::MarkVersionForRemoval])],
                settings(RetentionPolicy::MarkThenDispose),
            );
            let item = load(&db, id).await;
            let mut summary = RunSummary::default();
            decider
                .trim_item_versions(&item, &accepted(), &mut summary)
                .await
                .unwrap();

            assert_eq!(live_versions(&pool, id, "en").await, vec![3]);
            assert_eq!(live_versions(&pool, id, "da").await, vec![2]);
            assert_eq!(summary.versions_deleted, 3);
        }

        #[tokio::test]
        async fn test_configured_languages_limit_pruning() {
            let (db, pool) = create_db_pool().await;
            let snapshots = tempfile::tempdir().unwrap();
            let id = insert_item(&pool, "home", None).await;
            insert_versions(&pool, id, "en", &[1, 2]).await;
            insert_versions(&pool, id, "da", &[1, 2]).await;

            let mut settings = settings(RetentionPolicy::MarkThenDispose);
            settings.languages = vec!["da".into()];
            let decider = decider(
                &db,
                snapshots.path(),
                vec![rule(Condition::Always, vec![Action::MarkVersionForRemoval])],
                settings,
            );
            let item = load(&db, id).await;
            let mut summary = RunSummary::default();
            decider
                .trim_item_versions(&item, &accepted(), &mut summary)
                .await
                .unwrap();

            assert_eq!(live_versions(&pool, id, "en").await, vec![1, 2]);
            assert_eq!(live_versions(&pool, id, "da").await, vec![2]);
        }

        #[tokio::test]
        async fn test_dry_run_has_no_side_effects() {
            let (db, pool) = create_db_pool().await;
            let snapshots = tempfile::tempdir().unwrap();
            let id = insert_item(&pool, "home", None).await;
            insert_versions(&pool, id, "en", &[1, 2, 3, 4, 5]).await;

            let mut settings = settings(RetentionPolicy::MarkThenDispose);
            settings.dry_run = true;
            let decider = decider(
                &db,
                snapshots.path(),
                vec![rule(
                    Condition::VersionOlderThan { versions: 2 },
                    vec![Action::MarkVersionForRemoval],
                )],
                settings,
            );
            let directives = ItemFilterOutcome {
                valid_for_version_removal: true,
                archive_removed_versions: true,
                serialize_removed_versions: true,
                ..Default::default()
            };
            let item = load(&db, id).await;
            let mut summary = RunSummary::default();
            decider
                .trim_item_versions(&item, &directives, &mut summary)
                .await
                .unwrap();

            assert_eq!(live_versions(&pool, id, "en").await, vec![1, 2, 3, 4, 5]);
            assert_eq!(count_rows(&pool, "Archive").await, 0);
            assert!(walk_files(snapshots.path()).is_empty());
            assert_eq!(summary.versions_deleted, 2);
            assert_eq!(summary.versions_archived, 2);
        }

        struct FailingRules;

        impl RuleList for FailingRules {
            fn name(&self) -> &str {
                "failing"
            }

            fn run(&self, _ctx: &mut RuleContext<'_>) -> RuleResult<()> {
                Err(RuleError::Evaluation("boom".into()))
            }
        }

        #[tokio::test]
        async fn test_rule_error_aborts_before_side_effects() {
            let (db, pool) = create_db_pool().await;
            let snapshots = tempfile::tempdir().unwrap();
            let id = insert_item(&pool, "home", None).await;
            insert_versions(&pool, id, "en", &[1, 2, 3]).await;

            let decider = RetentionDecider::new(
                db.content(),
                db.archive(),
                Arc::new(SnapshotWriter::new(
                    snapshots.path(),
                    Arc::new(FileSnapshotSink),
                )),
                Arc::new(FailingRules),
                settings(RetentionPolicy::MarkThenDispose),
            );
            let item = load(&db, id).await;
            let mut summary = RunSummary::default();
            let err = decider
                .trim_item_versions(&item, &accepted(), &mut summary)
                .await
                .unwrap_err();

            assert!(matches!(err, crate::retention::RetentionError::Rules(_)));
            assert_eq!(live_versions(&pool, id, "en").await, vec![1, 2, 3]);
        }

        fn walk_files(root: &Path) -> Vec<PathBuf> {
            let mut files = Vec::new();
            let mut pending = vec![root.to_path_buf()];
            while let Some(dir) = pending.pop() {
                let Ok(entries) = std::fs::read_dir(&dir) else {
                    continue;
                };
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.is_dir() {
                        pending.push(path);
                    } else {
                        files.push(path);
                    }
                }
            }
            files
        }
    }
}
