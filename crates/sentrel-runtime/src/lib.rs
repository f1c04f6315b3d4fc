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

//! Typed SQL stores (C4/C5) for every entity in the data model: endpoint
//! registrations, rules, runs, and transfers. Built on `sentrel-data`'s
//! `Pool`; ciphertext columns (`password_ct`, `api_key_ct`, ...) are
//! persisted opaquely here, encryption is an orchestration concern above
//! this crate.

pub mod arr_instance;
pub mod error;
pub mod external_program;
pub mod instance;
pub mod migrate;
pub mod run;
pub mod torznab;
pub mod tracker_rule;
pub mod transfer;
mod wire;

pub use arr_instance::ArrInstanceStore;
pub use error::{RuntimeError, RuntimeResult};
pub use external_program::{ExternalProgramDeleteMode, ExternalProgramStore};
pub use instance::InstanceStore;
pub use migrate::migrate;
pub use run::RunStore;
pub use torznab::TorznabIndexerStore;
pub use tracker_rule::TrackerRuleStore;
pub use transfer::TransferStore;
