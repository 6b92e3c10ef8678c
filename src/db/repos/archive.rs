use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{
        ArchivalRecord, ArchiveBatchResult, ArchiveTarget, ArchivedFieldRecord,
        ArchivedItemSnapshot, Item, VersionRef,
    },
};

/// Repository trait for the archive store.
///
/// Every write holds the content store's exclusive writer lock and runs in a
/// transaction, so the check-then-insert steps are idempotent as long as all
/// writers honour the lock.
#[async_trait]
pub trait ArchiveRepo: Send + Sync {
    /// Return the archival id for `(item, target.archive_name)`, creating the
    /// `Archive` row on first use.
    async fn get_or_create_archival_id(&self, item: &Item, target: &ArchiveTarget)
    -> DbResult<Uuid>;

    /// Copy the item's `Items` row into `ArchivedItems` unless a snapshot for
    /// the item already exists under any archival id. Returns whether a row
    /// was written.
    async fn ensure_item_snapshot(&self, item_id: Uuid, archival_id: Uuid) -> DbResult<bool>;

    /// Copy every field row of one version into `ArchivedFields`. Returns the
    /// number of rows copied.
    async fn archive_version_fields(&self, version: &VersionRef, archival_id: Uuid)
    -> DbResult<u64>;

    /// Archive a batch of versions of one item atomically: resolve the
    /// archival id, copy every version's fields, then ensure the item
    /// snapshot, all in one transaction.
    async fn archive_item_versions(
        &self,
        item: &Item,
        versions: &[VersionRef],
        target: &ArchiveTarget,
    ) -> DbResult<ArchiveBatchResult>;

    /// Get the archival record for an item under an archive name
    async fn get_archive_record(
        &self,
        item_id: Uuid,
        archive_name: &str,
    ) -> DbResult<Option<ArchivalRecord>>;

    /// Get the archived snapshot of an item, if any
    async fn get_item_snapshot(&self, item_id: Uuid) -> DbResult<Option<ArchivedItemSnapshot>>;

    /// Count snapshot rows for an item (never more than one)
    async fn count_item_snapshots(&self, item_id: Uuid) -> DbResult<i64>;

    /// List archived field rows under an archival id, ordered by language,
    /// version and field
    async fn list_archived_fields(&self, archival_id: Uuid) -> DbResult<Vec<ArchivedFieldRecord>>;
}
