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

//! Activity log & rotation (C9): append-only writes on every rule action
//! attempt, plus a retention sweeper honouring the
//! `days=0 -> delete everything, days<0 -> default 7` contract.

pub mod error;
pub mod store;

pub use error::{ActivityError, ActivityResult};
pub use store::{schema, ActivityStore};
