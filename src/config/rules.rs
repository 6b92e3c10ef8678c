//! Rule list configuration.
//!
//! Rules are written as ordered arrays of tables. Each rule has an optional
//! `name`, a `when` condition (default: always) and a list of `actions`.
//!
//! ```toml
//! [[rules.item_filter]]
//! name = "news items"
//! when = { condition = "path_starts_with", prefix = "/content/news" }
//! actions = [
//!     { action = "item_valid_for_version_removal" },
//!     { action = "archive_removed_versions", archive_name = "News" },
//! ]
//!
//! [[rules.version_filter]]
//! when = { condition = "version_older_than", versions = 5 }
//! actions = [{ action = "mark_version_for_removal" }]
//! ```

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::rules::{Rule, RuleResult, RuleSet};

/// Item-filter and version-filter rule lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesConfig {
    /// Rules run once per visited item.
    #[serde(default)]
    pub item_filter: Vec<Rule>,

    /// Rules run once per candidate version of a matched item.
    #[serde(default)]
    pub version_filter: Vec<Rule>,
}

impl RulesConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.item_rule_set()
            .and_then(|_| self.version_rule_set())
            .map(|_| ())
            .map_err(|e| ConfigError::Validation(e.to_string()))
    }

    pub fn item_rule_set(&self) -> RuleResult<RuleSet> {
        RuleSet::new("item_filter", self.item_filter.clone())
    }

    pub fn version_rule_set(&self) -> RuleResult<RuleSet> {
        RuleSet::new("version_filter", self.version_filter.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Action, Condition};

    #[test]
    fn test_parse_rule_lists() {
        let config: RulesConfig = toml::from_str(
            r#"
            [[item_filter]]
            name = "everything"
            actions = [{ action = "item_valid_for_version_removal" }]

            [[version_filter]]
            when = { condition = "version_older_than", versions = 3 }
            actions = [{ action = "mark_version_for_removal" }]
            "#,
        )
        .unwrap();

        assert_eq!(config.item_filter.len(), 1);
        assert_eq!(config.item_filter[0].when, Condition::Always);
        assert_eq!(
            config.version_filter[0].when,
            Condition::VersionOlderThan { versions: 3 }
        );
        assert_eq!(
            config.version_filter[0].actions,
            vec![Action::MarkVersionForRemoval]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_pattern_fails_validation() {
        let config: RulesConfig = toml::from_str(
            r#"
            [[item_filter]]
            when = { condition = "name_matches", pattern = "(unclosed" }
            actions = [{ action = "item_valid_for_version_removal" }]
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_unknown_action_rejected() {
        let result: Result<RulesConfig, _> = toml::from_str(
            r#"
            [[version_filter]]
            actions = [{ action = "delete_everything" }]
            "#,
        );
        assert!(result.is_err());
    }
}
