//! String interning pool shared across stores.
//!
//! Repeated strings (hostnames, categories, tags) are interned to integer
//! ids inside a single table, `string_pool{id pk, value unique}`. Every
//! store that writes a row is expected to intern its string columns inside
//! the same transaction as the row insert.

use sqlx::Row;

use crate::dialect::Pool;
use crate::error::{DataError, Result};

/// Read-through interning pool over the `string_pool` table.
#[derive(Clone)]
pub struct StringPool {
    pool: Pool,
}

impl StringPool {
    /// Construct a pool wrapper bound to the given database pool.
    #[must_use]
    pub const fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Intern `value`, returning its stable id.
    ///
    /// Safe under concurrent writers: uses
    /// `INSERT ... ON CONFLICT(value) DO UPDATE SET value = value RETURNING
    /// id`, which is a no-op write that still returns the existing row's id
    /// rather than racing a separate `SELECT` against the `INSERT`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn get_or_create(&self, value: &str) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO string_pool (value) VALUES (?) \
             ON CONFLICT(value) DO UPDATE SET value = excluded.value \
             RETURNING id",
        )
        .bind(value)
        .fetch_one(self.pool.any())
        .await
        .map_err(|source| DataError::query_failed("string_pool.get_or_create", source))?;

        row.try_get::<i64, _>("id")
            .map_err(|source| DataError::query_failed("string_pool.get_or_create", source))
    }

    /// Look up the interned id for `value` without creating it.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::NotFound`] if no row exists for `value`, or a
    /// query error if the database operation fails.
    pub async fn get(&self, value: &str) -> Result<i64> {
        let row = sqlx::query("SELECT id FROM string_pool WHERE value = ?")
            .bind(value)
            .fetch_optional(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("string_pool.get", source))?;

        match row {
            Some(row) => row
                .try_get::<i64, _>("id")
                .map_err(|source| DataError::query_failed("string_pool.get", source)),
            None => Err(DataError::NotFound {
                entity: "string_pool entry",
            }),
        }
    }

    /// Resolve an interned id back to its string value.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::NotFound`] if `id` does not exist, or a query
    /// error if the database operation fails.
    pub async fn resolve(&self, id: i64) -> Result<String> {
        let row = sqlx::query("SELECT value FROM string_pool WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("string_pool.resolve", source))?;

        match row {
            Some(row) => row
                .try_get::<String, _>("value")
                .map_err(|source| DataError::query_failed("string_pool.resolve", source)),
            None => Err(DataError::NotFound {
                entity: "string_pool entry",
            }),
        }
    }
}
