//! Store for registered [`TorznabIndexer`] endpoints and their recorded
//! [`TorznabIndexerError`] history.

use sqlx::Row;

use sentrel_data::{DataError, Dialect, Pool};
use sentrel_model::{TorznabIndexer, TorznabIndexerCategory, TorznabIndexerError};

use crate::error::RuntimeResult;

/// Schema statements for `torznab_indexers` and `torznab_indexer_errors`.
#[must_use]
pub const fn schema(dialect: Dialect) -> [&'static str; 2] {
    match dialect {
        Dialect::Sqlite => [
            r"CREATE TABLE IF NOT EXISTS torznab_indexers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                base_url TEXT NOT NULL,
                api_key_ct TEXT NOT NULL,
                capabilities TEXT NOT NULL DEFAULT '[]',
                categories TEXT NOT NULL DEFAULT '[]',
                enabled INTEGER NOT NULL DEFAULT 1,
                timeout_s INTEGER NOT NULL DEFAULT 30
            )",
            r"CREATE TABLE IF NOT EXISTS torznab_indexer_errors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                indexer_id INTEGER NOT NULL,
                error_type TEXT NOT NULL,
                error_message TEXT NOT NULL,
                occurred_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
        ],
        Dialect::Postgres => [
            r"CREATE TABLE IF NOT EXISTS torznab_indexers (
                id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                base_url TEXT NOT NULL,
                api_key_ct TEXT NOT NULL,
                capabilities TEXT NOT NULL DEFAULT '[]',
                categories TEXT NOT NULL DEFAULT '[]',
                enabled BOOLEAN NOT NULL DEFAULT TRUE,
                timeout_s BIGINT NOT NULL DEFAULT 30
            )",
            r"CREATE TABLE IF NOT EXISTS torznab_indexer_errors (
                id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
                indexer_id BIGINT NOT NULL,
                error_type TEXT NOT NULL,
                error_message TEXT NOT NULL,
                occurred_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
        ],
    }
}

fn from_row(row: &sqlx::any::AnyRow) -> RuntimeResult<TorznabIndexer> {
    let capabilities_json: String =
        row.try_get("capabilities").map_err(|source| DataError::query_failed("runtime.torznab_row", source))?;
    let categories_json: String =
        row.try_get("categories").map_err(|source| DataError::query_failed("runtime.torznab_row", source))?;
    let capabilities: Vec<String> = serde_json::from_str(&capabilities_json).unwrap_or_default();
    let categories: Vec<TorznabIndexerCategory> = serde_json::from_str(&categories_json).unwrap_or_default();
    Ok(TorznabIndexer {
        id: row.try_get("id").map_err(|source| DataError::query_failed("runtime.torznab_row", source))?,
        name: row.try_get("name").map_err(|source| DataError::query_failed("runtime.torznab_row", source))?,
        base_url: row.try_get("base_url").map_err(|source| DataError::query_failed("runtime.torznab_row", source))?,
        api_key_ct: row.try_get("api_key_ct").map_err(|source| DataError::query_failed("runtime.torznab_row", source))?,
        capabilities,
        categories,
        enabled: row.try_get("enabled").map_err(|source| DataError::query_failed("runtime.torznab_row", source))?,
        timeout_s: row.try_get("timeout_s").map_err(|source| DataError::query_failed("runtime.torznab_row", source))?,
    })
}

/// Store over `torznab_indexers` and `torznab_indexer_errors`.
#[derive(Clone)]
pub struct TorznabIndexerStore {
    pool: Pool,
}

impl TorznabIndexerStore {
    /// Construct a store bound to `pool`. Does not create the schema;
    /// callers run [`schema`] as part of their migration bootstrap.
    #[must_use]
    pub const fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Insert a new indexer, returning its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`DataError`] if the insert fails.
    pub async fn create(&self, indexer: &TorznabIndexer) -> RuntimeResult<i64> {
        let capabilities = serde_json::to_string(&indexer.capabilities).unwrap_or_else(|_| "[]".to_string());
        let categories = serde_json::to_string(&indexer.categories).unwrap_or_else(|_| "[]".to_string());
        let row = sqlx::query(
            "INSERT INTO torznab_indexers (name, base_url, api_key_ct, capabilities, categories, enabled, timeout_s) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&indexer.name)
        .bind(&indexer.base_url)
        .bind(&indexer.api_key_ct)
        .bind(capabilities)
        .bind(categories)
        .bind(indexer.enabled)
        .bind(indexer.timeout_s)
        .fetch_one(self.pool.any())
        .await
        .map_err(|source| DataError::query_failed("runtime.torznab_create", source))?;
        row.try_get::<i64, _>("id")
            .map_err(|source| DataError::query_failed("runtime.torznab_create", source).into())
    }

    /// Fetch one indexer by id.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::NotFound`] if no row exists for `id`.
    pub async fn get(&self, id: i64) -> RuntimeResult<TorznabIndexer> {
        let row = sqlx::query("SELECT * FROM torznab_indexers WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("runtime.torznab_get", source))?
            .ok_or(DataError::NotFound { entity: "torznab indexer" })?;
        from_row(&row)
    }

    /// List every enabled indexer.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_enabled(&self) -> RuntimeResult<Vec<TorznabIndexer>> {
        let dialect_true = self.pool.dialect().bool_literal(true);
        let rows = sqlx::query(&format!("SELECT * FROM torznab_indexers WHERE enabled = {dialect_true} ORDER BY name"))
            .fetch_all(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("runtime.torznab_list_enabled", source))?;
        rows.iter().map(from_row).collect()
    }

    /// Record a query failure against `indexer_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn record_error(&self, indexer_id: i64, error_type: &str, error_message: &str) -> RuntimeResult<()> {
        sqlx::query("INSERT INTO torznab_indexer_errors (indexer_id, error_type, error_message) VALUES (?, ?, ?)")
            .bind(indexer_id)
            .bind(error_type)
            .bind(error_message)
            .execute(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("runtime.torznab_record_error", source))?;
        Ok(())
    }

    /// Fetch the most recent recorded errors for `indexer_id`, newest
    /// first, capped at `limit`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn recent_errors(&self, indexer_id: i64, limit: i64) -> RuntimeResult<Vec<TorznabIndexerError>> {
        let rows = sqlx::query(
            "SELECT * FROM torznab_indexer_errors WHERE indexer_id = ? ORDER BY occurred_at DESC, id DESC LIMIT ?",
        )
        .bind(indexer_id)
        .bind(limit)
        .fetch_all(self.pool.any())
        .await
        .map_err(|source| DataError::query_failed("runtime.torznab_recent_errors", source))?;

        rows.iter()
            .map(|row| {
                Ok(TorznabIndexerError {
                    id: row.try_get("id").map_err(|source| DataError::query_failed("runtime.torznab_recent_errors", source))?,
                    indexer_id: row
                        .try_get("indexer_id")
                        .map_err(|source| DataError::query_failed("runtime.torznab_recent_errors", source))?,
                    error_type: row
                        .try_get("error_type")
                        .map_err(|source| DataError::query_failed("runtime.torznab_recent_errors", source))?,
                    error_message: row
                        .try_get("error_message")
                        .map_err(|source| DataError::query_failed("runtime.torznab_recent_errors", source))?,
                    occurred_at: row
                        .try_get("occurred_at")
                        .map_err(|source| DataError::query_failed("runtime.torznab_recent_errors", source))?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> TorznabIndexerStore {
        let pool = Pool::connect("sqlite::memory:").await.unwrap();
        for statement in schema(pool.dialect()) {
            sqlx::query(statement).execute(pool.any()).await.unwrap();
        }
        TorznabIndexerStore::new(pool)
    }

    fn sample() -> TorznabIndexer {
        TorznabIndexer {
            id: 0,
            name: "indexer".to_string(),
            base_url: "https://torznab.example.com/".to_string(),
            api_key_ct: "ct".to_string(),
            capabilities: vec!["search".to_string()],
            categories: vec![TorznabIndexerCategory { id: 3000, name: "Audio".to_string() }],
            enabled: true,
            timeout_s: 30,
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips_categories() {
        let store = store().await;
        let id = store.create(&sample()).await.unwrap();
        let fetched = store.get(id).await.unwrap();
        assert_eq!(fetched.categories[0].name, "Audio");
        assert_eq!(fetched.capabilities, vec!["search".to_string()]);
    }

    #[tokio::test]
    async fn list_enabled_excludes_disabled_indexers() {
        let store = store().await;
        let mut disabled = sample();
        disabled.name = "disabled".to_string();
        disabled.enabled = false;
        store.create(&sample()).await.unwrap();
        store.create(&disabled).await.unwrap();
        let enabled = store.list_enabled().await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name, "indexer");
    }

    #[tokio::test]
    async fn recent_errors_orders_newest_first() {
        let store = store().await;
        let id = store.create(&sample()).await.unwrap();
        store.record_error(id, "timeout", "first").await.unwrap();
        store.record_error(id, "timeout", "second").await.unwrap();
        let errors = store.recent_errors(id, 10).await.unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].error_message, "second");
    }
}
