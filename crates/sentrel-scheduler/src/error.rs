//! Error type for the job scheduler.

use sentrel_model::ErrorClass;
use thiserror::Error;

/// Result alias for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Errors raised by the supervisor, a worker's tick loop, or a job body.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A run-store or other persistence call failed.
    #[error(transparent)]
    Runtime(#[from] sentrel_runtime::RuntimeError),
    /// The rule evaluator or action pipeline raised an error while running
    /// the automation job body for one instance.
    #[error(transparent)]
    Actions(#[from] sentrel_actions::ActionsError),
    /// Listing the current torrents for an instance failed.
    #[error("torrent snapshot failed for instance {instance_id}: {reason}")]
    Snapshot {
        /// The instance whose snapshot failed.
        instance_id: i64,
        /// Human-readable detail from the injected capability.
        reason: String,
    },
    /// The worker was asked to run a run already marked active, which
    /// should be unreachable given [`sentrel_runtime::RunStore::create_if_no_active`]'s
    /// single-statement guard; surfaced rather than panicking.
    #[error("run already active for owner {owner_id}, kind {kind:?}")]
    RunAlreadyActive {
        /// The owning instance id.
        owner_id: i64,
        /// The run kind that was already active.
        kind: sentrel_model::RunKind,
    },
}

impl SchedulerError {
    /// Classifies this error by behaviour.
    #[must_use]
    pub fn kind(&self) -> ErrorClass {
        match self {
            Self::Runtime(inner) => inner.kind(),
            Self::Actions(inner) => inner.kind(),
            Self::Snapshot { .. } => ErrorClass::Transient,
            Self::RunAlreadyActive { .. } => ErrorClass::Conflict,
        }
    }

    /// Delegates to [`ErrorClass::is_retryable`].
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}
