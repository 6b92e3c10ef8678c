use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqliteConnection, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::{parse_optional_uuid, parse_uuid, parse_version};
use crate::{
    db::{
        WriterLock,
        error::{DbError, DbResult},
        repos::ArchiveRepo,
    },
    models::{
        ArchivalRecord, ArchiveBatchResult, ArchiveTarget, ArchivedFieldRecord,
        ArchivedItemSnapshot, Item, SharingType, VersionRef,
    },
};

pub struct SqliteArchiveRepo {
    pool: SqlitePool,
    writer_lock: WriterLock,
}

impl SqliteArchiveRepo {
    pub fn new(pool: SqlitePool, writer_lock: WriterLock) -> Self {
        Self { pool, writer_lock }
    }

    fn parse_sharing_type(s: &str) -> DbResult<SharingType> {
        s.parse().map_err(|e: String| DbError::Internal(e))
    }

    async fn find_archival_id(
        conn: &mut SqliteConnection,
        item_id: Uuid,
        archive_name: &str,
    ) -> DbResult<Option<Uuid>> {
        let id: Option<String> = sqlx::query_scalar(
            r#"
            SELECT ArchivalId FROM Archive
            WHERE ItemId = ? AND ArchiveName = ?
            "#,
        )
        .bind(item_id.to_string())
        .bind(archive_name)
        .fetch_optional(&mut *conn)
        .await?;

        id.map(|id| parse_uuid(&id)).transpose()
    }

    async fn get_or_create_in(
        conn: &mut SqliteConnection,
        item: &Item,
        target: &ArchiveTarget,
    ) -> DbResult<Uuid> {
        if let Some(id) = Self::find_archival_id(conn, item.id, &target.archive_name).await? {
            return Ok(id);
        }

        let archival_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO Archive (
                ArchivalId, ItemId, ParentId, Name, OriginalLocation,
                ArchiveDate, ArchivedBy, ArchiveName
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(archival_id.to_string())
        .bind(item.id.to_string())
        .bind(item.parent_id.map(|id| id.to_string()))
        .bind(&item.name)
        .bind(&item.path)
        .bind(Utc::now())
        .bind(&target.archived_by)
        .bind(&target.archive_name)
        .execute(&mut *conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => DbError::Conflict(
                format!(
                    "Archive record for item {} under '{}' already exists",
                    item.id, target.archive_name
                ),
            ),
            _ => DbError::from(e),
        })?;

        tracing::debug!(
            item_id = %item.id,
            archive_name = %target.archive_name,
            %archival_id,
            "Created archive record"
        );
        Ok(archival_id)
    }

    async fn copy_version_fields(
        conn: &mut SqliteConnection,
        version: &VersionRef,
        archival_id: Uuid,
    ) -> DbResult<u64> {
        let rows = sqlx::query(
            r#"
            SELECT FieldId, Value, Created, Updated
            FROM VersionedFields
            WHERE ItemId = ? AND Language = ? AND Version = ?
            ORDER BY FieldId
            "#,
        )
        .bind(version.item_id.to_string())
        .bind(&version.language)
        .bind(i64::from(version.number))
        .fetch_all(&mut *conn)
        .await?;

        if rows.is_empty() {
            tracing::warn!(
                item_id = %version.item_id,
                language = %version.language,
                version = version.number,
                "Version has no field rows to archive"
            );
        }

        let mut copied = 0;
        for row in &rows {
            sqlx::query(
                r#"
                INSERT INTO ArchivedFields (
                    RowId, ArchivalId, SharingType, ItemId, Language, Version,
                    FieldId, Value, Created, Updated
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(archival_id.to_string())
            .bind(SharingType::Versioned.as_str())
            .bind(version.item_id.to_string())
            .bind(&version.language)
            .bind(i64::from(version.number))
            .bind(row.get::<String, _>("FieldId"))
            .bind(row.get::<String, _>("Value"))
            .bind(row.get::<String, _>("Created"))
            .bind(row.get::<String, _>("Updated"))
            .execute(&mut *conn)
            .await?;
            copied += 1;
        }

        Ok(copied)
    }

    async fn insert_snapshot_if_missing(
        conn: &mut SqliteConnection,
        item_id: Uuid,
        archival_id: Uuid,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO ArchivedItems (
                RowId, ArchivalId, ItemId, Name, TemplateID, MasterID, ParentID, Created, Updated
            )
            SELECT ?, ?, ID, Name, TemplateID, MasterID, ParentID, Created, Updated
            FROM Items
            WHERE ID = ?
              AND NOT EXISTS (SELECT 1 FROM ArchivedItems WHERE ItemId = ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(archival_id.to_string())
        .bind(item_id.to_string())
        .bind(item_id.to_string())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    fn row_to_record(row: &SqliteRow) -> DbResult<ArchivalRecord> {
        Ok(ArchivalRecord {
            archival_id: parse_uuid(&row.get::<String, _>("ArchivalId"))?,
            item_id: parse_uuid(&row.get::<String, _>("ItemId"))?,
            parent_id: parse_optional_uuid(row.get("ParentId"))?,
            name: row.get("Name"),
            original_location: row.get("OriginalLocation"),
            archive_date: row.get("ArchiveDate"),
            archived_by: row.get("ArchivedBy"),
            archive_name: row.get("ArchiveName"),
        })
    }
}

#[async_trait]
impl ArchiveRepo for SqliteArchiveRepo {
    async fn get_or_create_archival_id(
        &self,
        item: &Item,
        target: &ArchiveTarget,
    ) -> DbResult<Uuid> {
        let _guard = self.writer_lock.acquire().await;
        let mut tx = self.pool.begin().await?;
        let archival_id = Self::get_or_create_in(&mut tx, item, target).await?;
        tx.commit().await?;
        Ok(archival_id)
    }

    async fn ensure_item_snapshot(&self, item_id: Uuid, archival_id: Uuid) -> DbResult<bool> {
        let _guard = self.writer_lock.acquire().await;
        let mut tx = self.pool.begin().await?;
        let created = Self::insert_snapshot_if_missing(&mut tx, item_id, archival_id).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn archive_version_fields(
        &self,
        version: &VersionRef,
        archival_id: Uuid,
    ) -> DbResult<u64> {
        let _guard = self.writer_lock.acquire().await;
        let mut tx = self.pool.begin().await?;
        let copied = Self::copy_version_fields(&mut tx, version, archival_id).await?;
        tx.commit().await?;
        Ok(copied)
    }

    async fn archive_item_versions(
        &self,
        item: &Item,
        versions: &[VersionRef],
        target: &ArchiveTarget,
    ) -> DbResult<ArchiveBatchResult> {
        if versions.is_empty() {
            return Err(DbError::Validation(
                "Cannot archive an empty set of versions".to_string(),
            ));
        }
        if let Some(stray) = versions.iter().find(|v| v.item_id != item.id) {
            return Err(DbError::Validation(format!(
                "Version {} of item {} does not belong to item {}",
                stray.number, stray.item_id, item.id
            )));
        }

        // Held until the transaction has committed or rolled back.
        let _guard = self.writer_lock.acquire().await;
        let mut tx = self.pool.begin().await?;

        let archival_id = Self::get_or_create_in(&mut tx, item, target).await?;
        let mut field_rows = 0;
        for version in versions {
            field_rows += Self::copy_version_fields(&mut tx, version, archival_id).await?;
        }
        let snapshot_created = Self::insert_snapshot_if_missing(&mut tx, item.id, archival_id).await?;

        tx.commit().await?;

        Ok(ArchiveBatchResult {
            archival_id,
            versions: versions.len(),
            field_rows,
            snapshot_created,
        })
    }

    async fn get_archive_record(
        &self,
        item_id: Uuid,
        archive_name: &str,
    ) -> DbResult<Option<ArchivalRecord>> {
        let row = sqlx::query(
            r#"
            SELECT ArchivalId, ItemId, ParentId, Name, OriginalLocation,
                   ArchiveDate, ArchivedBy, ArchiveName
            FROM Archive
            WHERE ItemId = ? AND ArchiveName = ?
            "#,
        )
        .bind(item_id.to_string())
        .bind(archive_name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn get_item_snapshot(&self, item_id: Uuid) -> DbResult<Option<ArchivedItemSnapshot>> {
        let row = sqlx::query(
            r#"
            SELECT RowId, ArchivalId, ItemId, Name, TemplateID, MasterID, ParentID, Created, Updated
            FROM ArchivedItems
            WHERE ItemId = ?
            "#,
        )
        .bind(item_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(ArchivedItemSnapshot {
            row_id: parse_uuid(&row.get::<String, _>("RowId"))?,
            archival_id: parse_uuid(&row.get::<String, _>("ArchivalId"))?,
            item_id: parse_uuid(&row.get::<String, _>("ItemId"))?,
            name: row.get("Name"),
            template_id: parse_uuid(&row.get::<String, _>("TemplateID"))?,
            master_id: parse_optional_uuid(row.get("MasterID"))?,
            parent_id: parse_optional_uuid(row.get("ParentID"))?,
            created: row.get("Created"),
            updated: row.get("Updated"),
        }))
    }

    async fn count_item_snapshots(&self, item_id: Uuid) -> DbResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM ArchivedItems WHERE ItemId = ?")
            .bind(item_id.to_string())
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get::<i64, _>("count"))
    }

    async fn list_archived_fields(&self, archival_id: Uuid) -> DbResult<Vec<ArchivedFieldRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT RowId, ArchivalId, SharingType, ItemId, Language, Version,
                   FieldId, Value, Created, Updated
            FROM ArchivedFields
            WHERE ArchivalId = ?
            ORDER BY Language, Version, FieldId
            "#,
        )
        .bind(archival_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> DbResult<ArchivedFieldRecord> {
                Ok(ArchivedFieldRecord {
                    row_id: parse_uuid(&row.get::<String, _>("RowId"))?,
                    archival_id: parse_uuid(&row.get::<String, _>("ArchivalId"))?,
                    sharing_type: Self::parse_sharing_type(&row.get::<String, _>("SharingType"))?,
                    item_id: parse_uuid(&row.get::<String, _>("ItemId"))?,
                    language: row.get("Language"),
                    version: parse_version(row.get("Version"))?,
                    field_id: parse_uuid(&row.get::<String, _>("FieldId"))?,
                    value: row.get("Value"),
                    created: row.get("Created"),
                    updated: row.get("Updated"),
                })
            })
            .collect()
    }
}
