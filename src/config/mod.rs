//! Configuration module for the version pruner.
//!
//! The pruner is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [database]
//! type = "sqlite"
//! path = "${CONTENT_DB}"
//!
//! [pruner]
//! root = "/sitecore/content"
//!
//! [[rules.item_filter]]
//! actions = [{ action = "item_valid_for_version_removal" }]
//!
//! [[rules.version_filter]]
//! when = { condition = "version_older_than", versions = 5 }
//! actions = [{ action = "mark_version_for_removal" }]
//! ```

mod database;
mod observability;
mod retention;
mod rules;

use std::path::Path;

pub use database::*;
pub use observability::*;
pub use retention::*;
pub use rules::*;
use serde::{Deserialize, Serialize};

/// Root configuration for the version pruner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrunerConfig {
    /// Database holding the content and archive tables.
    pub database: DatabaseConfig,

    /// Run settings.
    #[serde(default)]
    pub pruner: RetentionConfig,

    /// Item-filter and version-filter rules.
    #[serde(default)]
    pub rules: RulesConfig,

    /// Logging and metrics.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl PrunerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let config: PrunerConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.pruner.validate()?;
        self.rules.validate()?;

        #[cfg(not(feature = "prometheus"))]
        if self.observability.metrics.enabled {
            return Err(ConfigError::Validation(
                "observability.metrics.enabled requires the 'prometheus' feature".into(),
            ));
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Expand environment variables in the format `${VAR_NAME}`.
/// Variables after a `#` on the same line are left as written.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| ConfigError::Validation(format!("env var pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');

        let mut line_result = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };

            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            line_result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            line_result.push_str(&value);

            last_end = whole.end();
        }

        line_result.push_str(&line[last_end..]);
        result.push_str(&line_result);
        result.push('\n');
    }

    // Remove trailing newline if input didn't have one
    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}
