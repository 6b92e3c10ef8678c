//! Test harness for database repository testing
//!
//! Provides in-memory SQLite databases with the real migrations, plus
//! helpers that seed the live content tables the way the content
//! repository would have written them.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Create an in-memory SQLite pool for testing
pub async fn create_sqlite_pool() -> SqlitePool {
    sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool")
}

/// Run SQLite migrations on the pool
///
/// Uses the actual migration files to ensure tests match production schema
pub async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations_sqlx/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}

/// Fixed timestamp so copied rows can be compared exactly
pub fn fixture_time() -> DateTime<Utc> {
    "2024-01-15T09:30:00Z"
        .parse()
        .expect("valid fixture timestamp")
}

/// Well-known template id used by seeded items
pub const TEMPLATE_ID: Uuid = Uuid::from_u128(0x76036f5e_cbce_46d1_af0a_4143f9b557aa);

/// Field id used as the body of seeded versions
pub const TITLE_FIELD: Uuid = Uuid::from_u128(0x75577384_3c97_45da_a847_81b00500e250);

/// Insert a row into `Items`
pub async fn insert_item(pool: &SqlitePool, name: &str, parent_id: Option<Uuid>) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO Items (ID, Name, TemplateID, MasterID, ParentID, Created, Updated)
        VALUES (?, ?, ?, NULL, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(name)
    .bind(TEMPLATE_ID.to_string())
    .bind(parent_id.map(|p| p.to_string()))
    .bind(fixture_time())
    .bind(fixture_time())
    .execute(pool)
    .await
    .expect("Failed to insert item");
    id
}

/// Insert one version with the given extra fields plus a title field
pub async fn insert_version_with_fields(
    pool: &SqlitePool,
    item_id: Uuid,
    language: &str,
    version: u32,
    fields: &[(Uuid, &str)],
) {
    let title = format!("{} v{}", language, version);
    let all_fields = std::iter::once((TITLE_FIELD, title.as_str())).chain(fields.iter().copied());
    for (field_id, value) in all_fields {
        sqlx::query(
            r#"
            INSERT INTO VersionedFields (Id, ItemId, Language, Version, FieldId, Value, Created, Updated)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(item_id.to_string())
        .bind(language)
        .bind(i64::from(version))
        .bind(field_id.to_string())
        .bind(value)
        .bind(fixture_time())
        .bind(fixture_time())
        .execute(pool)
        .await
        .expect("Failed to insert version field");
    }
}

/// Insert plain (always valid) versions
pub async fn insert_versions(pool: &SqlitePool, item_id: Uuid, language: &str, versions: &[u32]) {
    for version in versions {
        insert_version_with_fields(pool, item_id, language, *version, &[]).await;
    }
}

/// Count rows in a table
pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .expect("Failed to count rows")
}

/// Migrated in-memory database wrapped in a [`DbPool`](crate::db::DbPool),
/// plus the raw pool for seeding and assertions
pub async fn create_db_pool() -> (crate::db::DbPool, SqlitePool) {
    let pool = create_sqlite_pool().await;
    run_sqlite_migrations(&pool).await;
    (crate::db::DbPool::from_sqlite(pool.clone()), pool)
}

/// Version numbers still in the live store for one item and language
pub async fn live_versions(pool: &SqlitePool, item_id: Uuid, language: &str) -> Vec<u32> {
    sqlx::query_scalar::<_, i64>(
        "SELECT DISTINCT Version FROM VersionedFields WHERE ItemId = ? AND Language = ? ORDER BY Version",
    )
    .bind(item_id.to_string())
    .bind(language)
    .fetch_all(pool)
    .await
    .expect("Failed to list versions")
    .into_iter()
    .map(|v| v as u32)
    .collect()
}
