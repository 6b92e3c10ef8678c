use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::{parse_optional_uuid, parse_uuid, parse_version};
use crate::{
    db::{WriterLock, error::DbResult, repos::ContentRepo},
    models::{Item, ItemDump, ItemVersion, PublishingWindow},
};

/// Upper bound on ancestor lookups when resolving a path.
const MAX_PATH_DEPTH: i64 = 4096;

pub struct SqliteContentRepo {
    pool: SqlitePool,
    writer_lock: WriterLock,
}

impl SqliteContentRepo {
    pub fn new(pool: SqlitePool, writer_lock: WriterLock) -> Self {
        Self { pool, writer_lock }
    }

    fn row_to_item(row: &SqliteRow, path: String) -> DbResult<Item> {
        Ok(Item {
            id: parse_uuid(&row.get::<String, _>("ID"))?,
            name: row.get("Name"),
            parent_id: parse_optional_uuid(row.get("ParentID"))?,
            path,
            template_id: parse_uuid(&row.get::<String, _>("TemplateID"))?,
            master_id: parse_optional_uuid(row.get("MasterID"))?,
            created: row.get("Created"),
            updated: row.get("Updated"),
        })
    }

    async fn resolve_path(&self, id: Uuid) -> DbResult<String> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            WITH RECURSIVE ancestors(ID, ParentID, Name, Depth) AS (
                SELECT ID, ParentID, Name, 0 FROM Items WHERE ID = ?
                UNION ALL
                SELECT i.ID, i.ParentID, i.Name, a.Depth + 1
                FROM Items i
                JOIN ancestors a ON i.ID = a.ParentID
                WHERE a.Depth < ?
            )
            SELECT Name FROM ancestors ORDER BY Depth DESC
            "#,
        )
        .bind(id.to_string())
        .bind(MAX_PATH_DEPTH)
        .fetch_all(&self.pool)
        .await?;

        Ok(format!("/{}", names.join("/")))
    }
}

#[async_trait]
impl ContentRepo for SqliteContentRepo {
    async fn get_item(&self, id: Uuid) -> DbResult<Option<Item>> {
        let row = sqlx::query(
            r#"
            SELECT ID, Name, TemplateID, MasterID, ParentID, Created, Updated
            FROM Items
            WHERE ID = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let path = self.resolve_path(id).await?;
                Ok(Some(Self::row_to_item(&row, path)?))
            }
            None => Ok(None),
        }
    }

    async fn get_item_by_path(&self, path: &str) -> DbResult<Option<Item>> {
        let mut current: Option<Item> = None;
        let mut matched_any = false;

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            matched_any = true;
            let parent_id = current.as_ref().map(|item| item.id.to_string());
            let row = sqlx::query(
                r#"
                SELECT ID, Name, TemplateID, MasterID, ParentID, Created, Updated
                FROM Items
                WHERE ParentID IS ? AND Name = ? COLLATE NOCASE
                ORDER BY Name COLLATE NOCASE, ID
                LIMIT 1
                "#,
            )
            .bind(parent_id)
            .bind(segment)
            .fetch_optional(&self.pool)
            .await?;

            let Some(row) = row else {
                return Ok(None);
            };
            let name: String = row.get("Name");
            let item_path = match &current {
                Some(parent) => parent.child_path(&name),
                None => format!("/{}", name),
            };
            current = Some(Self::row_to_item(&row, item_path)?);
        }

        Ok(if matched_any { current } else { None })
    }

    async fn children(&self, parent: &Item) -> DbResult<Vec<Item>> {
        let rows = sqlx::query(
            r#"
            SELECT ID, Name, TemplateID, MasterID, ParentID, Created, Updated
            FROM Items
            WHERE ParentID = ?
            ORDER BY Name COLLATE NOCASE, ID
            "#,
        )
        .bind(parent.id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let name: String = row.get("Name");
                Self::row_to_item(row, parent.child_path(&name))
            })
            .collect()
    }

    async fn languages(&self, item_id: Uuid) -> DbResult<Vec<String>> {
        let languages = sqlx::query_scalar(
            r#"
            SELECT DISTINCT Language
            FROM VersionedFields
            WHERE ItemId = ?
            ORDER BY Language
            "#,
        )
        .bind(item_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(languages)
    }

    async fn versions(&self, item_id: Uuid, language: &str) -> DbResult<Vec<ItemVersion>> {
        let rows = sqlx::query(
            r#"
            SELECT Version, FieldId, Value
            FROM VersionedFields
            WHERE ItemId = ? AND Language = ?
            ORDER BY Version, FieldId
            "#,
        )
        .bind(item_id.to_string())
        .bind(language)
        .fetch_all(&self.pool)
        .await?;

        let mut by_number: BTreeMap<u32, BTreeMap<Uuid, String>> = BTreeMap::new();
        for row in &rows {
            let number = parse_version(row.get("Version"))?;
            let field_id = parse_uuid(&row.get::<String, _>("FieldId"))?;
            by_number
                .entry(number)
                .or_default()
                .insert(field_id, row.get("Value"));
        }

        Ok(by_number
            .into_iter()
            .map(|(number, fields)| ItemVersion {
                item_id,
                language: language.to_string(),
                number,
                publishing: PublishingWindow::from_fields(&fields),
                fields,
            })
            .collect())
    }

    async fn remove_version(&self, item_id: Uuid, language: &str, version: u32) -> DbResult<bool> {
        let _guard = self.writer_lock.acquire().await;

        let result = sqlx::query(
            r#"
            DELETE FROM VersionedFields
            WHERE ItemId = ? AND Language = ? AND Version = ?
            "#,
        )
        .bind(item_id.to_string())
        .bind(language)
        .bind(i64::from(version))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn dump_item(&self, item: &Item) -> DbResult<ItemDump> {
        let mut versions = Vec::new();
        for language in self.languages(item.id).await? {
            versions.extend(self.versions(item.id, &language).await?);
        }

        Ok(ItemDump {
            id: item.id,
            name: item.name.clone(),
            path: item.path.clone(),
            parent_id: item.parent_id,
            template_id: item.template_id,
            master_id: item.master_id,
            created: item.created,
            updated: item.updated,
            versions,
            dumped_at: Utc::now(),
        })
    }
}
