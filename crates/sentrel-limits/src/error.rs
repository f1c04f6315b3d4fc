//! Errors raised by rate limiting and concurrency primitives.

use thiserror::Error;

/// The four behavioural error classes, duplicated locally since this crate
/// has no dependency on `sentrel-model`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed or semantically invalid input.
    InvalidInput,
    /// The referenced entity does not exist.
    NotFound,
    /// A unique or check constraint was violated.
    Conflict,
    /// A transport-level failure that may succeed on retry.
    Transient,
}

impl ErrorClass {
    /// Whether this class is worth retrying with backoff.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Transient)
    }
}

/// Errors raised while waiting on a limiter or bounded pool.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LimitsError {
    /// The wait was aborted by a cancellation request.
    #[error("wait cancelled")]
    Cancelled,
}

impl LimitsError {
    /// Classified `Transient` for consistency with other wait/IO failures.
    #[must_use]
    pub const fn kind(&self) -> ErrorClass {
        ErrorClass::Transient
    }

    /// Never retried: a cancellation is an intentional stop, not a
    /// transient hiccup to retry past.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }
}

/// Result alias for this crate.
pub type LimitsResult<T> = Result<T, LimitsError>;
