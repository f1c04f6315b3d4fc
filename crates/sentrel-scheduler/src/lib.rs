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

//! The job scheduler (C7): one supervisor owning a worker per
//! `(instance_id, job_kind)`, a tick loop per worker, cooperative
//! cancellation, and boot-time restart recovery.
//!
//! Layout: `supervisor.rs` (boot, spawn, shutdown), `worker.rs` (the
//! per-`(owner, kind)` tick loop), `job.rs` (the `JobRunner` trait every
//! job kind implements), `automation.rs` (the automation job body, wired
//! to `sentrel-rules`' evaluator and `sentrel-actions`' pipeline),
//! `retention.rs` (the run-retention sweep shared by job kinds whose
//! external work is an injected collaborator), `snapshot.rs` (the
//! torrent-listing capability the automation job needs), `tick.rs`
//! (interval resolution and the restart-recovery stuck threshold).

pub mod automation;
pub mod error;
pub mod job;
pub mod retention;
pub mod snapshot;
pub mod supervisor;
pub mod tick;
pub mod worker;

pub use automation::AutomationRunner;
pub use error::{SchedulerError, SchedulerResult};
pub use job::{JobContext, JobRunner};
pub use retention::{default_policy_for, RetentionPolicy, RetentionRunner};
pub use snapshot::TorrentSource;
pub use supervisor::{AutomationDeps, Supervisor};
pub use tick::{resolve_tick_interval, stuck_threshold, DEFAULT_INTERVAL_S};
pub use worker::{spawn, Worker, WorkerCommand, WorkerHandle};
