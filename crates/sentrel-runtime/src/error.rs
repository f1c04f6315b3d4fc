//! Error type for the runtime store crate.

use sentrel_model::ErrorClass;
use thiserror::Error;

/// Result alias for runtime store operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors raised by the typed SQL stores in this crate.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A persistence-envelope operation failed.
    #[error(transparent)]
    Data(#[from] sentrel_data::DataError),
    /// A column held a string that does not match any variant of the
    /// model enum it is supposed to encode.
    #[error("{entity} column holds unknown tag `{tag}`")]
    UnknownTag {
        /// Which store/column surfaced the bad value.
        entity: &'static str,
        /// The offending raw value.
        tag: String,
    },
    /// A delete was refused because the entity is still referenced
    /// elsewhere (e.g. an external program still named by a rule's
    /// `externalProgram.programId`).
    #[error("{entity} {id} is still in use and cannot be deleted")]
    InUse {
        /// Entity kind (`external program`, ...).
        entity: &'static str,
        /// The offending id.
        id: i64,
    },
}

impl RuntimeError {
    /// Classifies this error by behaviour: a bad stored tag is malformed
    /// data, not a transient failure; a persistence error delegates to its
    /// own class.
    #[must_use]
    pub fn kind(&self) -> ErrorClass {
        match self {
            Self::Data(inner) => match inner.kind() {
                sentrel_data::ErrorClass::InvalidInput => ErrorClass::InvalidInput,
                sentrel_data::ErrorClass::NotFound => ErrorClass::NotFound,
                sentrel_data::ErrorClass::Conflict => ErrorClass::Conflict,
                sentrel_data::ErrorClass::Transient => ErrorClass::Transient,
            },
            Self::UnknownTag { .. } => ErrorClass::InvalidInput,
            Self::InUse { .. } => ErrorClass::Conflict,
        }
    }

    /// Delegates to [`ErrorClass::is_retryable`].
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}
