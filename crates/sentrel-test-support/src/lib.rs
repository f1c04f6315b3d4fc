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

//! Shared test helpers used across the workspace's integration suites.

pub mod docker;
pub mod fixtures;
pub mod pool;

pub use fixtures::{sample_instance, sample_torrent_view};
pub use pool::{postgres_url_from_env, sqlite_pool};
