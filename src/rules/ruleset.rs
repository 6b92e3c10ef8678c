use serde::{Deserialize, Serialize};

use super::{
    Action, Condition, RuleContext, RuleList, RuleResult,
    condition::PatternCache,
};

/// One `(condition, actions)` pair of a rule list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    /// Label used in logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Condition that must hold for the actions to run. Defaults to always.
    #[serde(default)]
    pub when: Condition,

    /// Actions applied in order when the condition holds.
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// Ordered rule list built from configuration.
///
/// Regular expressions are compiled up front so a bad pattern fails at
/// startup instead of mid-run.
#[derive(Debug, Clone)]
pub struct RuleSet {
    name: String,
    rules: Vec<Rule>,
    patterns: PatternCache,
}

impl RuleSet {
    pub fn new(name: impl Into<String>, rules: Vec<Rule>) -> RuleResult<Self> {
        let mut patterns = PatternCache::new();
        for rule in &rules {
            rule.when.compile_patterns(&mut patterns)?;
        }
        Ok(Self {
            name: name.into(),
            rules,
            patterns,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl RuleList for RuleSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &mut RuleContext<'_>) -> RuleResult<()> {
        for (index, rule) in self.rules.iter().enumerate() {
            if !rule.when.evaluate(ctx, &self.patterns)? {
                continue;
            }
            tracing::trace!(
                rule_list = %self.name,
                rule = rule.name.as_deref().unwrap_or(""),
                index,
                item_path = %ctx.subject.item().path,
                "Rule matched"
            );
            for action in &rule.actions {
                action.apply(ctx);
            }
        }
        Ok(())
    }
}
