//! Version Pruner - rule-driven retention for hierarchical content versions.
//!
//! Walks an item tree, runs item-filter and version-filter rules against every
//! node and its historical versions, and disposes of the versions the rules
//! select: serializing a snapshot of the item, archiving the versions into the
//! archive tables, and finally deleting them from the live store.
//!
//! The crate is organised leaf-first:
//!
//! - [`range`]: compact run-length naming for sets of version numbers
//! - [`models`]: items, versions and archive records
//! - [`rules`]: rule contexts, the rule list contract and the built-in rule set
//! - [`db`]: content and archive repositories (SQLite)
//! - [`snapshot`]: point-in-time item dumps written to disk
//! - [`retention`]: the decider, the tree walker and the run coordinator

pub mod config;
pub mod db;
pub mod models;
pub mod observability;
pub mod range;
pub mod retention;
pub mod rules;
pub mod snapshot;

pub use config::PrunerConfig;
pub use retention::{RunCoordinator, RunOutcome, RunSummary};
