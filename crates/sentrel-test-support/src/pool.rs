//! Disposable database handles for integration tests.

use anyhow::{Context, Result};
use sentrel_data::Pool;

/// Connect an in-memory SQLite pool. Each call produces an independent
/// database; callers are responsible for running whatever schema their
/// suite needs against it.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn sqlite_pool() -> Result<Pool> {
    Pool::connect("sqlite::memory:")
        .await
        .context("failed to open in-memory sqlite pool")
}

/// Read an externally supplied Postgres connection string for integration
/// suites that exercise the Postgres dialect path, mirroring the
/// `SENTREL_TEST_DATABASE_URL` convention. Returns `None` when unset so
/// that callers can skip (not fail) Postgres-only tests in environments
/// without a reachable server.
#[must_use]
pub fn postgres_url_from_env() -> Option<String> {
    std::env::var("SENTREL_TEST_DATABASE_URL").ok()
}
