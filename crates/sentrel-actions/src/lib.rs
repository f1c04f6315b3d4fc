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

//! The per-rule action pipeline (C6): tags, category, move, speed and
//! share limits, pause/resume/recheck/reannounce, external programs, and
//! delete, fired in the fixed order the data model specifies. This crate
//! owns decision logic only; the qBittorrent wire client and external
//! program invocation are injected through [`capability`] traits so the
//! pipeline can be exercised without live I/O.

mod actions;
pub mod capability;
pub mod error;
pub mod grouping;
pub mod pipeline;

pub use capability::{ExternalProgramRunner, QbitClient};
pub use error::{ActionsError, ActionsResult};
pub use grouping::{group_key, resolve_groups};
pub use pipeline::{run_rule, PipelineContext};
