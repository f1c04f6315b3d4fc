#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Persistence envelope shared across the sentrel workspace.
//!
//! `sentrel-data` owns two passive primitives: the dialect-aware connection
//! `Pool` (C3) and the string interning `StringPool` (C2). Typed, entity-
//! specific stores live in `sentrel-runtime`, built on top of this crate.

pub mod dialect;
pub mod error;
pub mod string_pool;

pub use dialect::{Dialect, Pool};
pub use error::{DataError, ErrorClass, Result as DataResult};
pub use string_pool::StringPool;

/// Schema statement creating the `string_pool` table, shared by every store
/// that interns strings. Executed idempotently with `CREATE TABLE IF NOT
/// EXISTS` ahead of every entity-specific migration. DDL syntax for
/// auto-incrementing primary keys is one of the few places dialect text
/// cannot be unified even under `sqlx::Any`, so callers select the
/// statement for their connected dialect.
#[must_use]
pub const fn string_pool_schema(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Sqlite => {
            r"CREATE TABLE IF NOT EXISTS string_pool (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                value TEXT NOT NULL UNIQUE
            )"
        }
        Dialect::Postgres => {
            r"CREATE TABLE IF NOT EXISTS string_pool (
                id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
                value TEXT NOT NULL UNIQUE
            )"
        }
    }
}
