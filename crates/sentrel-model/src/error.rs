//! Validation errors raised while constructing domain model values.

use thiserror::Error;

/// The four error classes errors across the workspace are classified into,
/// by behaviour rather than by type name: whether a caller should retry,
/// whether it is logged, and how it is surfaced to activity/run rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed or semantically invalid input. Returned to the caller
    /// unchanged; never retried; never logged beyond debug.
    InvalidInput,
    /// The referenced entity does not exist, or an update/delete affected
    /// zero rows.
    NotFound,
    /// A unique or check constraint was violated.
    Conflict,
    /// A transport-level or backend failure that may succeed if retried:
    /// HTTP 5xx, connection refused, timeouts, rate-limiter cancellation.
    Transient,
}

impl ErrorClass {
    /// Whether an operation that failed with this class is worth retrying
    /// with backoff. Only [`ErrorClass::Transient`] is retryable.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Transient)
    }
}

/// Errors raised while validating domain model input.
///
/// Every variant here is an `InvalidInput`-class error per the behavioural
/// contract in the design notes: returned to the caller unchanged, never
/// retried, never logged beyond debug.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A required name field was empty.
    #[error("name must not be empty")]
    EmptyName,
    /// A URL was not a syntactically valid absolute `http(s)` URL.
    #[error("url `{value}` is not a valid absolute http(s) URL")]
    InvalidUrl {
        /// The offending value.
        value: String,
    },
    /// Basic-auth username was provided without a password (or vice versa).
    #[error("basic auth password is required when a username is provided")]
    BasicAuthPasswordRequired,
    /// An ARR instance type string was not `sonarr` or `radarr`.
    #[error("unknown ARR instance type `{value}`")]
    UnknownArrInstanceType {
        /// The offending value.
        value: String,
    },
    /// A Torznab backend identifier used uppercase characters.
    #[error("torznab backend `{value}` must be lowercase")]
    InvalidTorznabBackend {
        /// The offending value.
        value: String,
    },
    /// A rule's `conditions` document carried no action blocks.
    #[error("a rule must define at least one action")]
    EmptyActionConditions,
}

/// Result alias for model validation.
pub type ModelResult<T> = Result<T, ModelError>;

impl ModelError {
    /// Whether this error is an `InvalidInput`-class error (always true for
    /// this enum; kept for symmetry with other crates' `kind()` helpers).
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        true
    }

    /// Every variant here is `InvalidInput`-class.
    #[must_use]
    pub const fn kind(&self) -> ErrorClass {
        ErrorClass::InvalidInput
    }

    /// Never retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}
