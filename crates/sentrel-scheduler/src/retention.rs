//! Retention-sweep job body shared by the job kinds whose external work
//! (disk scanning, cross-seed HTTP lookups) is an injected collaborator
//! outside this crate's scope: the worker still owns that kind's run
//! lifecycle and its historical-run retention contract.

use async_trait::async_trait;
use serde_json::json;

use sentrel_limits::CancelToken;
use sentrel_model::RunKind;
use sentrel_runtime::RunStore;

use crate::error::SchedulerResult;
use crate::job::{JobContext, JobRunner};

/// How a [`RetentionRunner`] prunes historical runs of its kind.
#[derive(Debug, Clone, Copy)]
pub enum RetentionPolicy {
    /// Keep the `N` most recently completed runs (scan/orphan/crossseed).
    KeepRecent(i64),
    /// Keep runs from the last `N` days (hourly/daily/weekly/monthly backups).
    KeepDays(i64),
}

/// Enforces one kind's run-retention contract on every tick. The actual
/// scan/backup/cross-seed work for that tick is performed by an external
/// collaborator ahead of this job body running (see the job kind's own
/// Non-goal in the functional core); this runner's stats reflect only the
/// retention sweep.
pub struct RetentionRunner {
    runs: RunStore,
    policy: RetentionPolicy,
}

impl RetentionRunner {
    /// Construct a runner enforcing `policy` against `runs`.
    #[must_use]
    pub const fn new(runs: RunStore, policy: RetentionPolicy) -> Self {
        Self { runs, policy }
    }
}

#[async_trait]
impl JobRunner for RetentionRunner {
    async fn run(&self, ctx: &JobContext, _cancel: &mut CancelToken) -> SchedulerResult<serde_json::Value> {
        let pruned = match self.policy {
            RetentionPolicy::KeepRecent(keep) => self.runs.prune_keep_recent(ctx.owner_id, ctx.kind, keep).await?,
            RetentionPolicy::KeepDays(days) => self.runs.prune_terminal(ctx.owner_id, days).await?,
        };
        Ok(json!({ "pruned": pruned }))
    }
}

/// Default policy for a given job kind, used when an instance has not
/// configured an override.
#[must_use]
pub const fn default_policy_for(kind: RunKind) -> RetentionPolicy {
    match kind {
        RunKind::Scan | RunKind::Orphan | RunKind::Crossseed => RetentionPolicy::KeepRecent(20),
        _ => RetentionPolicy::KeepDays(7),
    }
}
