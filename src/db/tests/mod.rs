//! Shared database repository test infrastructure
//!
//! Each repository has a test module containing shared test functions that
//! take `&dyn XxxRepo` (plus the raw pool where a test has to seed or
//! inspect the live tables), instantiated for SQLite through a
//! `sqlite_test!` macro over fast in-memory databases.
//!
//! ```bash
//! cargo test db::tests
//! ```

pub mod harness;
