//! The unit of work a worker's tick executes: a [`JobRunner`] keyed by
//! `(owner_id, kind)`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sentrel_model::RunKind;

use crate::error::SchedulerResult;

/// Everything a job body needs about the run it is executing, beyond its
/// own injected dependencies.
#[derive(Debug, Clone, Copy)]
pub struct JobContext {
    /// The instance (or other owning entity) this run belongs to.
    pub owner_id: i64,
    /// The run's kind.
    pub kind: RunKind,
    /// The persisted run's id.
    pub run_id: i64,
    /// Wall-clock time the run started executing.
    pub now: DateTime<Utc>,
}

/// One schedulable unit of work. A worker calls `run` once per tick (or
/// once per external trigger) after successfully claiming a run via
/// `RunStore::create_if_no_active`.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Execute the job body, returning the `stats` JSON blob recorded on
    /// the run's terminal row.
    ///
    /// # Errors
    ///
    /// Returns an error if the job body fails; the worker records the
    /// failure on the run and continues ticking on the next interval.
    async fn run(&self, ctx: &JobContext, cancel: &mut sentrel_limits::CancelToken) -> SchedulerResult<serde_json::Value>;
}
