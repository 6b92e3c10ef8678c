use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Database configuration.
///
/// The database holds both the live content tables the pruner reads and
/// deletes from, and the archive tables it writes to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum DatabaseConfig {
    /// SQLite database.
    Sqlite(SqliteConfig),
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            DatabaseConfig::Sqlite(c) => c.validate(),
        }
    }

    /// Whether migrations should run before a prune run.
    pub fn run_migrations(&self) -> bool {
        match self {
            DatabaseConfig::Sqlite(c) => c.run_migrations,
        }
    }
}

/// SQLite configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteConfig {
    /// Path to the SQLite database file.
    /// Use `:memory:` for an in-memory database (testing only).
    pub path: String,

    /// Create the database file if it doesn't exist.
    #[serde(default = "default_true")]
    pub create_if_missing: bool,

    /// Run migrations on startup.
    #[serde(default = "default_true")]
    pub run_migrations: bool,

    /// Enable WAL mode for better concurrency.
    #[serde(default = "default_true")]
    pub wal_mode: bool,

    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,

    /// Maximum number of connections in the pool.
    #[serde(default = "default_sqlite_max_connections")]
    pub max_connections: u32,
}

impl SqliteConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.path.is_empty() {
            return Err(ConfigError::Validation(
                "SQLite path cannot be empty".into(),
            ));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Validation(
                "SQLite max_connections must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_busy_timeout() -> u64 {
    5000 // 5 seconds
}

fn default_sqlite_max_connections() -> u32 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sqlite_defaults() {
        let config: DatabaseConfig = toml::from_str(
            r#"
            type = "sqlite"
            path = "content.db"
            "#,
        )
        .unwrap();

        let DatabaseConfig::Sqlite(sqlite) = &config;
        assert_eq!(sqlite.path, "content.db");
        assert!(sqlite.create_if_missing);
        assert!(sqlite.wal_mode);
        assert_eq!(sqlite.busy_timeout_ms, 5000);
        assert_eq!(sqlite.max_connections, 5);
        assert!(config.run_migrations());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_path_rejected() {
        let config: DatabaseConfig = toml::from_str(
            r#"
            type = "sqlite"
            path = ""
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result: Result<DatabaseConfig, _> = toml::from_str(
            r#"
            type = "postgres"
            url = "postgres://localhost/content"
            "#,
        );
        assert!(result.is_err());
    }
}
