mod error;
pub mod repos;
#[cfg(feature = "database-sqlite")]
pub mod sqlite;

#[cfg(all(test, feature = "database-sqlite"))]
pub mod tests;

use std::sync::Arc;

pub use error::{DbError, DbResult};
pub use repos::*;

use crate::config::DatabaseConfig;

/// Exclusive writer lock over the content store.
///
/// Archive batches and version deletes hold it for their whole duration.
/// Correct archival ids depend on every writer to the same store going
/// through this lock.
#[derive(Debug, Clone, Default)]
pub struct WriterLock(Arc<tokio::sync::Mutex<()>>);

impl WriterLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait (without a timeout) until the lock is free and take it.
    pub async fn acquire(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.0.lock().await
    }
}

/// Cached repository trait objects, created once at startup.
struct CachedRepos {
    content: Arc<dyn ContentRepo>,
    archive: Arc<dyn ArchiveRepo>,
}

enum PoolStorage {
    #[cfg(feature = "database-sqlite")]
    Sqlite(sqlx::SqlitePool),
    #[cfg(not(feature = "database-sqlite"))]
    _None(std::convert::Infallible),
}

/// Database pool holding the content and archive repositories.
///
/// Both repositories share one [`WriterLock`].
pub struct DbPool {
    inner: PoolStorage,
    repos: CachedRepos,
}

impl DbPool {
    /// Create a DbPool from an existing SQLite pool.
    /// Primarily useful for testing.
    #[cfg(feature = "database-sqlite")]
    pub fn from_sqlite(pool: sqlx::SqlitePool) -> Self {
        let writer_lock = WriterLock::new();
        let repos = CachedRepos {
            content: Arc::new(sqlite::SqliteContentRepo::new(
                pool.clone(),
                writer_lock.clone(),
            )),
            archive: Arc::new(sqlite::SqliteArchiveRepo::new(
                pool.clone(),
                writer_lock,
            )),
        };
        DbPool {
            inner: PoolStorage::Sqlite(pool),
            repos,
        }
    }

    /// Create a database pool from configuration
    pub async fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        match config {
            #[cfg(feature = "database-sqlite")]
            DatabaseConfig::Sqlite(cfg) => {
                let pool = sqlx::sqlite::SqlitePoolOptions::new()
                    .max_connections(cfg.max_connections)
                    .connect_with(
                        sqlx::sqlite::SqliteConnectOptions::new()
                            .filename(&cfg.path)
                            .create_if_missing(cfg.create_if_missing)
                            .journal_mode(if cfg.wal_mode {
                                sqlx::sqlite::SqliteJournalMode::Wal
                            } else {
                                sqlx::sqlite::SqliteJournalMode::Delete
                            })
                            .busy_timeout(std::time::Duration::from_millis(cfg.busy_timeout_ms)),
                    )
                    .await?;

                Ok(Self::from_sqlite(pool))
            }
            #[cfg(not(feature = "database-sqlite"))]
            DatabaseConfig::Sqlite(_) => Err(DbError::NotConfigured),
        }
    }

    /// Run database migrations using sqlx's migration runner
    /// This automatically creates and manages a _sqlx_migrations table
    pub async fn run_migrations(&self) -> DbResult<()> {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                tracing::info!("Running SQLite migrations");
                sqlx::migrate!("./migrations_sqlx/sqlite").run(pool).await?;
                tracing::info!("SQLite migrations completed successfully");
                Ok(())
            }
            #[cfg(not(feature = "database-sqlite"))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }

    /// Get content repository
    pub fn content(&self) -> Arc<dyn ContentRepo> {
        Arc::clone(&self.repos.content)
    }

    /// Get archive repository
    pub fn archive(&self) -> Arc<dyn ArchiveRepo> {
        Arc::clone(&self.repos.archive)
    }

    /// Health check for database connectivity
    pub async fn health_check(&self) -> DbResult<()> {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
            #[cfg(not(feature = "database-sqlite"))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }
}

#[cfg(all(test, feature = "database-sqlite"))]
mod pool_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_after_pool_close() {
        let (db, pool) = tests::harness::create_db_pool().await;
        db.health_check().await.unwrap();

        pool.close().await;
        assert!(db.health_check().await.is_err());
    }
}
