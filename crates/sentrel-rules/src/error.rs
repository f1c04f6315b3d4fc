//! Errors raised while normalizing or evaluating rule conditions.

use sentrel_model::ErrorClass;
use thiserror::Error;

/// Errors raised by this crate.
#[derive(Debug, Error)]
pub enum RulesError {
    /// A leaf's `regex=true`/`MATCHES` value failed to compile.
    #[error("regex `{pattern}` failed to compile: {source}")]
    InvalidRegex {
        /// The offending pattern.
        pattern: String,
        /// Underlying compiler error.
        #[source]
        source: regex::Error,
    },
}

impl RulesError {
    /// A bad pattern is malformed input, not a transient failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorClass {
        match self {
            Self::InvalidRegex { .. } => ErrorClass::InvalidInput,
        }
    }

    /// Never retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Result alias for this crate.
pub type RulesResult<T> = Result<T, RulesError>;
