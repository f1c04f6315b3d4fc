//! Error type for the action pipeline.

use sentrel_model::ErrorClass;
use thiserror::Error;

/// Result alias for action pipeline operations.
pub type ActionsResult<T> = Result<T, ActionsError>;

/// Errors raised while resolving or executing one action block. A single
/// action block failing is never fatal to the rest of the pipeline; see
/// [`crate::pipeline::run_rule`].
#[derive(Debug, Error)]
pub enum ActionsError {
    /// The qBittorrent capability call failed.
    #[error("qbittorrent call failed: {0}")]
    Client(String),
    /// `externalProgram.programId` did not resolve to a registered
    /// program.
    #[error("external program {program_id} is not registered")]
    UnknownProgram {
        /// The unresolved program id.
        program_id: i64,
    },
    /// Writing the activity log entry failed.
    #[error(transparent)]
    Activity(#[from] sentrel_activity::ActivityError),
}

impl ActionsError {
    /// Classifies this error by behaviour: a qBittorrent call failure is
    /// `Transient` (the capability contract is HTTP-call-shaped), an
    /// unresolved program id is `NotFound`, and an activity-log failure
    /// delegates to the wrapped persistence error's class.
    #[must_use]
    pub fn kind(&self) -> ErrorClass {
        match self {
            Self::Client(_) => ErrorClass::Transient,
            Self::UnknownProgram { .. } => ErrorClass::NotFound,
            Self::Activity(inner) => match inner.kind() {
                sentrel_data::ErrorClass::InvalidInput => ErrorClass::InvalidInput,
                sentrel_data::ErrorClass::NotFound => ErrorClass::NotFound,
                sentrel_data::ErrorClass::Conflict => ErrorClass::Conflict,
                sentrel_data::ErrorClass::Transient => ErrorClass::Transient,
            },
        }
    }

    /// Delegates to [`ErrorClass::is_retryable`].
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}
