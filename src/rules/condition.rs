use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{RuleContext, RuleError, RuleResult, keys};

/// Predicate half of a rule.
///
/// ```toml
/// [[rules.version_filter]]
/// name = "keep the last three"
/// when = { condition = "version_older_than", versions = 3 }
/// actions = [{ action = "mark_version_for_removal" }]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "condition", rename_all = "snake_case")]
pub enum Condition {
    /// Always matches.
    #[default]
    Always,
    /// The version under test is more than `versions` versions older than
    /// `currentversion` (strictly: `number < current - versions`).
    VersionOlderThan { versions: u32 },
    /// The item was created from the given template.
    TemplateIs { template_id: Uuid },
    /// The item path starts with the given prefix.
    PathStartsWith { prefix: String },
    /// The item name matches a regular expression.
    NameMatches { pattern: String },
    /// The version under test is in the given language.
    LanguageIs { language: String },
    /// A field of the version under test has exactly the given value.
    FieldEquals { field_id: Uuid, value: String },
    Not { inner: Box<Condition> },
    All { conditions: Vec<Condition> },
    Any { conditions: Vec<Condition> },
}

/// Regexes compiled once per rule set, keyed by their source pattern.
pub(crate) type PatternCache = HashMap<String, Regex>;

impl Condition {
    /// Compile every regex this condition uses into `cache`.
    pub(crate) fn compile_patterns(&self, cache: &mut PatternCache) -> RuleResult<()> {
        match self {
            Condition::NameMatches { pattern } => {
                if !cache.contains_key(pattern) {
                    let regex = Regex::new(pattern).map_err(|e| {
                        RuleError::InvalidPattern(format!("'{}': {}", pattern, e))
                    })?;
                    cache.insert(pattern.clone(), regex);
                }
                Ok(())
            }
            Condition::Not { inner } => inner.compile_patterns(cache),
            Condition::All { conditions } | Condition::Any { conditions } => conditions
                .iter()
                .try_for_each(|c| c.compile_patterns(cache)),
            _ => Ok(()),
        }
    }

    pub(crate) fn evaluate(&self, ctx: &RuleContext<'_>, patterns: &PatternCache) -> RuleResult<bool> {
        let item = ctx.subject.item();
        match self {
            Condition::Always => Ok(true),
            Condition::VersionOlderThan { versions } => {
                let version = ctx.subject.version().ok_or_else(|| {
                    RuleError::Evaluation(format!(
                        "version_older_than evaluated against item {} without a version",
                        item.path
                    ))
                })?;
                let current = ctx
                    .get(keys::CURRENT_VERSION)
                    .and_then(|v| v.as_version())
                    .ok_or(RuleError::MissingParameter(keys::CURRENT_VERSION))?;
                // Signed so a threshold above the current number never matches.
                Ok(i64::from(version.number) < i64::from(current.number) - i64::from(*versions))
            }
            Condition::TemplateIs { template_id } => Ok(item.template_id == *template_id),
            Condition::PathStartsWith { prefix } => Ok(item.path.starts_with(prefix.as_str())),
            Condition::NameMatches { pattern } => {
                let regex = patterns.get(pattern).ok_or_else(|| {
                    RuleError::Evaluation(format!("pattern '{}' was not compiled", pattern))
                })?;
                Ok(regex.is_match(&item.name))
            }
            Condition::LanguageIs { language } => Ok(ctx
                .subject
                .version()
                .is_some_and(|v| v.language.eq_ignore_ascii_case(language))),
            Condition::FieldEquals { field_id, value } => Ok(ctx
                .subject
                .version()
                .and_then(|v| v.fields.get(field_id))
                .is_some_and(|actual| actual == value)),
            Condition::Not { inner } => Ok(!inner.evaluate(ctx, patterns)?),
            Condition::All { conditions } => {
                for condition in conditions {
                    if !condition.evaluate(ctx, patterns)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Any { conditions } => {
                for condition in conditions {
                    if condition.evaluate(ctx, patterns)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}
