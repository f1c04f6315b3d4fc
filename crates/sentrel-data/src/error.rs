//! Error types for the persistence envelope.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

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

/// Result alias for data layer operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors raised by the persistence envelope.
#[derive(Debug)]
pub enum DataError {
    /// Migration execution failed.
    MigrationFailed {
        /// Underlying migration error.
        source: sqlx::migrate::MigrateError,
    },
    /// A database operation failed.
    QueryFailed {
        /// Operation identifier for log correlation.
        operation: &'static str,
        /// Underlying SQL error.
        source: sqlx::Error,
    },
    /// An update or delete affected zero rows where one was required.
    NotFound {
        /// Entity kind (`instance`, `rule`, ...).
        entity: &'static str,
    },
}

impl DataError {
    /// Wrap a raw `sqlx::Error` under a named operation for log correlation.
    #[must_use]
    pub const fn query_failed(operation: &'static str, source: sqlx::Error) -> Self {
        Self::QueryFailed { operation, source }
    }

    /// Whether the underlying SQL error is a unique-constraint violation.
    #[must_use]
    pub fn is_unique_constraint(&self) -> bool {
        self.database_error_kind()
            .is_some_and(|kind| matches!(kind, sqlx::error::ErrorKind::UniqueViolation))
    }

    /// Whether the underlying SQL error is a CHECK-constraint violation.
    #[must_use]
    pub fn is_check_constraint(&self) -> bool {
        self.database_error_kind()
            .is_some_and(|kind| matches!(kind, sqlx::error::ErrorKind::CheckViolation))
    }

    /// Whether the underlying SQL error is a foreign-key violation.
    #[must_use]
    pub fn is_foreign_key_constraint(&self) -> bool {
        self.database_error_kind()
            .is_some_and(|kind| matches!(kind, sqlx::error::ErrorKind::ForeignKeyViolation))
    }

    fn database_error_kind(&self) -> Option<sqlx::error::ErrorKind> {
        match self {
            Self::QueryFailed { source, .. } => source.as_database_error().map(|e| e.kind()),
            Self::MigrationFailed { .. } | Self::NotFound { .. } => None,
        }
    }

    /// Classifies this error by behaviour: constraint violations are
    /// `Conflict`, zero-rows-affected is `NotFound`, a failed migration or
    /// any other query failure (connection refused, timeout, pool
    /// exhaustion) is `Transient`.
    #[must_use]
    pub fn kind(&self) -> ErrorClass {
        match self {
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::MigrationFailed { .. } => ErrorClass::Transient,
            Self::QueryFailed { .. } => {
                if self.is_unique_constraint() || self.is_check_constraint() || self.is_foreign_key_constraint() {
                    ErrorClass::Conflict
                } else {
                    ErrorClass::Transient
                }
            }
        }
    }

    /// Delegates to [`ErrorClass::is_retryable`].
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl Display for DataError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MigrationFailed { .. } => formatter.write_str("migration failed"),
            Self::QueryFailed { operation, .. } => {
                write!(formatter, "database operation `{operation}` failed")
            }
            Self::NotFound { entity } => write!(formatter, "{entity} not found"),
        }
    }
}

impl Error for DataError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MigrationFailed { source } => Some(source),
            Self::QueryFailed { source, .. } => Some(source),
            Self::NotFound { .. } => None,
        }
    }
}

impl From<sqlx::Error> for DataError {
    fn from(source: sqlx::Error) -> Self {
        if matches!(source, sqlx::Error::RowNotFound) {
            return Self::NotFound { entity: "row" };
        }
        Self::QueryFailed {
            operation: "sqlx operation",
            source,
        }
    }
}
