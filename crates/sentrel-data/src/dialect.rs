//! Dialect-aware pool construction and SQL fragment helpers.
//!
//! The envelope is built on `sqlx::Any` so that every store above it writes
//! a single query using positional `?` parameters; the `Any` driver maps
//! those onto the wire format the underlying SQLite or PostgreSQL driver
//! expects. The only places dialect actually leaks through are boolean
//! literal encoding and paginated `DELETE`, both centralised here per the
//! design notes.

use std::sync::Once;

use sqlx::Any;
use sqlx::AnyPool;
use sqlx::Transaction;
use sqlx::any::AnyKind;

use crate::error::{DataError, Result};

static INSTALL_DRIVERS: Once = Once::new();

fn ensure_drivers_installed() {
    INSTALL_DRIVERS.call_once(|| {
        sqlx::any::install_default_drivers();
    });
}

/// SQL dialect in effect for a given pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// SQLite, used for local/single-node deployments and tests.
    Sqlite,
    /// PostgreSQL, used for multi-writer production deployments.
    Postgres,
}

impl Dialect {
    /// Short lowercase name matching `dialectOf()` in the design: `"sqlite"`
    /// or `"postgres"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
        }
    }

    /// SQL literal for a boolean value under this dialect.
    #[must_use]
    pub const fn bool_literal(self, value: bool) -> &'static str {
        match (self, value) {
            (Self::Sqlite, true) => "1",
            (Self::Sqlite, false) => "0",
            (Self::Postgres, true) => "true",
            (Self::Postgres, false) => "false",
        }
    }

    /// `LIMIT`/`OFFSET` clause for skipping the first `keep` rows of an
    /// otherwise-ordered result set, used by retention sweeps that delete
    /// "everything after the first N rows". SQLite requires an explicit
    /// `LIMIT -1` sentinel to use `OFFSET` without bounding the row count;
    /// PostgreSQL allows a bare `OFFSET`.
    #[must_use]
    pub fn offset_clause(self, offset: i64) -> String {
        match self {
            Self::Sqlite => format!("LIMIT -1 OFFSET {offset}"),
            Self::Postgres => format!("OFFSET {offset}"),
        }
    }
}

/// Database-agnostic connection pool, backed by `sqlx::Any`.
#[derive(Clone)]
pub struct Pool {
    inner: AnyPool,
    dialect: Dialect,
}

impl Pool {
    /// Connect to `url`, inferring the dialect from its scheme.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self> {
        ensure_drivers_installed();
        let inner = AnyPool::connect(url)
            .await
            .map_err(|source| DataError::query_failed("connect", source))?;
        let dialect = match inner.any_kind() {
            AnyKind::Sqlite => Dialect::Sqlite,
            AnyKind::Postgres => Dialect::Postgres,
        };
        Ok(Self { inner, dialect })
    }

    /// Wrap an already-connected `AnyPool`.
    #[must_use]
    pub fn from_any_pool(inner: AnyPool) -> Self {
        let dialect = match inner.any_kind() {
            AnyKind::Sqlite => Dialect::Sqlite,
            AnyKind::Postgres => Dialect::Postgres,
        };
        Self { inner, dialect }
    }

    /// The SQL dialect this pool is connected to.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Borrow the underlying `sqlx::AnyPool` for use with `query`/`query_as`.
    #[must_use]
    pub const fn any(&self) -> &AnyPool {
        &self.inner
    }

    /// Begin a transaction. Callers must `commit()` explicitly; a
    /// transaction dropped without a commit rolls back, so every call site
    /// should `defer` (via an early-return guard or explicit rollback on
    /// every error path) rather than rely on the drop alone to signal
    /// intent.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying connection cannot start a
    /// transaction.
    pub async fn begin(&self) -> Result<Transaction<'static, Any>> {
        self.inner.begin().await.map_err(|source| DataError::query_failed("begin", source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_literal_differs_by_dialect() {
        assert_eq!(Dialect::Sqlite.bool_literal(true), "1");
        assert_eq!(Dialect::Postgres.bool_literal(true), "true");
        assert_eq!(Dialect::Sqlite.bool_literal(false), "0");
        assert_eq!(Dialect::Postgres.bool_literal(false), "false");
    }

    #[test]
    fn offset_clause_matches_dialect_pagination_rules() {
        assert_eq!(Dialect::Sqlite.offset_clause(5), "LIMIT -1 OFFSET 5");
        assert_eq!(Dialect::Postgres.offset_clause(5), "OFFSET 5");
    }

    #[test]
    fn as_str_matches_dialect_of_contract() {
        assert_eq!(Dialect::Sqlite.as_str(), "sqlite");
        assert_eq!(Dialect::Postgres.as_str(), "postgres");
    }
}
