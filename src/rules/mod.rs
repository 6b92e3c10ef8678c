//! Rule evaluation for the item and version filters.
//!
//! A rule list runs against a [`RuleContext`] and mutates its parameter bag
//! in place: every rule whose condition holds applies its actions, in list
//! order. The pruner then reads the bag through [`ItemFilterOutcome`] and
//! [`VersionFilterOutcome`] rather than looking up string keys itself.
//!
//! [`RuleSet`] is the built-in implementation, configured from TOML. Any
//! other evaluator can be plugged in through the [`RuleList`] trait.

mod action;
mod condition;
mod context;
mod outcome;
mod ruleset;

pub use action::{ACTION_TABLE, Action, ActionSpec};
pub use condition::Condition;
pub use context::{ParamValue, RuleContext, Subject, keys};
pub use outcome::{ItemFilterOutcome, VersionFilterOutcome};
pub use ruleset::{Rule, RuleSet};
use thiserror::Error;

/// Errors raised while evaluating rules. Any of them aborts the run.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Missing rule parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid rule pattern {0}")]
    InvalidPattern(String),

    #[error("Rule evaluation failed: {0}")]
    Evaluation(String),
}

pub type RuleResult<T> = Result<T, RuleError>;

/// An ordered list of rules that can be run against a context.
pub trait RuleList: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Apply every matching rule to `ctx`, in order.
    fn run(&self, ctx: &mut RuleContext<'_>) -> RuleResult<()>;
}
