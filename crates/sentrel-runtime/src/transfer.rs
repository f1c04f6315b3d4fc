//! Store for [`Transfer`] records: torrent moves between two instances.

use sqlx::Row;

use sentrel_data::{DataError, Dialect, Pool};
use sentrel_model::{Transfer, TransferState};

use crate::error::RuntimeResult;
use crate::wire;

/// Schema statement for the `transfers` table.
#[must_use]
pub const fn schema(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Sqlite => {
            r"CREATE TABLE IF NOT EXISTS transfers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_instance_id INTEGER NOT NULL,
                destination_instance_id INTEGER NOT NULL,
                hash TEXT NOT NULL,
                state TEXT NOT NULL,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                error TEXT
            )"
        }
        Dialect::Postgres => {
            r"CREATE TABLE IF NOT EXISTS transfers (
                id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
                source_instance_id BIGINT NOT NULL,
                destination_instance_id BIGINT NOT NULL,
                hash TEXT NOT NULL,
                state TEXT NOT NULL,
                started_at TIMESTAMPTZ NOT NULL,
                completed_at TIMESTAMPTZ,
                error TEXT
            )"
        }
    }
}

fn format_timestamp(value: chrono::DateTime<chrono::Utc>) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn parse_timestamp(text: &str) -> RuntimeResult<chrono::DateTime<chrono::Utc>> {
    chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .or_else(|_| chrono::DateTime::parse_from_rfc3339(text).map(|dt| dt.with_timezone(&chrono::Utc)))
        .map_err(|_| DataError::NotFound { entity: "transfer timestamp" }.into())
}

fn from_row(row: &sqlx::any::AnyRow) -> RuntimeResult<Transfer> {
    let state_tag: String = row.try_get("state").map_err(|source| DataError::query_failed("runtime.transfer_row", source))?;
    let started_at_text: String = row.try_get("started_at").map_err(|source| DataError::query_failed("runtime.transfer_row", source))?;
    let completed_at_text: Option<String> =
        row.try_get("completed_at").map_err(|source| DataError::query_failed("runtime.transfer_row", source))?;
    Ok(Transfer {
        id: row.try_get("id").map_err(|source| DataError::query_failed("runtime.transfer_row", source))?,
        source_instance_id: row
            .try_get("source_instance_id")
            .map_err(|source| DataError::query_failed("runtime.transfer_row", source))?,
        destination_instance_id: row
            .try_get("destination_instance_id")
            .map_err(|source| DataError::query_failed("runtime.transfer_row", source))?,
        hash: row.try_get("hash").map_err(|source| DataError::query_failed("runtime.transfer_row", source))?,
        state: wire::from_tag::<TransferState>("state", &state_tag)?,
        started_at: parse_timestamp(&started_at_text)?,
        completed_at: completed_at_text.as_deref().map(parse_timestamp).transpose()?,
        error: row.try_get("error").map_err(|source| DataError::query_failed("runtime.transfer_row", source))?,
    })
}

/// Store over `transfers`.
#[derive(Clone)]
pub struct TransferStore {
    pool: Pool,
}

impl TransferStore {
    /// Construct a store bound to `pool`. Does not create the schema;
    /// callers run [`schema`] as part of their migration bootstrap.
    #[must_use]
    pub const fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Insert a new transfer in [`TransferState::Pending`], returning its
    /// assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create(
        &self,
        source_instance_id: i64,
        destination_instance_id: i64,
        hash: &str,
        started_at: chrono::DateTime<chrono::Utc>,
    ) -> RuntimeResult<i64> {
        let row = sqlx::query(
            "INSERT INTO transfers (source_instance_id, destination_instance_id, hash, state, started_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(source_instance_id)
        .bind(destination_instance_id)
        .bind(hash)
        .bind(wire::to_tag(&TransferState::Pending))
        .bind(format_timestamp(started_at))
        .fetch_one(self.pool.any())
        .await
        .map_err(|source| DataError::query_failed("runtime.transfer_create", source))?;
        row.try_get::<i64, _>("id").map_err(|source| DataError::query_failed("runtime.transfer_create", source).into())
    }

    /// Fetch one transfer by id.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::NotFound`] if no row exists for `id`.
    pub async fn get(&self, id: i64) -> RuntimeResult<Transfer> {
        let row = sqlx::query("SELECT * FROM transfers WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("runtime.transfer_get", source))?
            .ok_or(DataError::NotFound { entity: "transfer" })?;
        from_row(&row)
    }

    /// Advance a transfer to `state`, setting `completed_at`/`error` when
    /// the new state is terminal.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::NotFound`] if `id` does not exist.
    pub async fn advance(
        &self,
        id: i64,
        state: TransferState,
        completed_at: Option<chrono::DateTime<chrono::Utc>>,
        error: Option<&str>,
    ) -> RuntimeResult<()> {
        let result = sqlx::query("UPDATE transfers SET state = ?, completed_at = ?, error = ? WHERE id = ?")
            .bind(wire::to_tag(&state))
            .bind(completed_at.map(format_timestamp))
            .bind(error)
            .bind(id)
            .execute(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("runtime.transfer_advance", source))?;
        if result.rows_affected() == 0 {
            return Err(DataError::NotFound { entity: "transfer" }.into());
        }
        Ok(())
    }

    /// List every non-terminal transfer, for resuming work after restart.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_active(&self) -> RuntimeResult<Vec<Transfer>> {
        let placeholders = TransferState::TERMINAL.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let query = format!("SELECT * FROM transfers WHERE state NOT IN ({placeholders})");
        let mut builder = sqlx::query(&query);
        for state in TransferState::TERMINAL {
            builder = builder.bind(wire::to_tag(state));
        }
        let rows = builder
            .fetch_all(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("runtime.transfer_list_active", source))?;
        rows.iter().map(from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> TransferStore {
        let pool = Pool::connect("sqlite::memory:").await.unwrap();
        sqlx::query(schema(pool.dialect())).execute(pool.any()).await.unwrap();
        TransferStore::new(pool)
    }

    fn now() -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&chrono::Utc)
    }

    #[tokio::test]
    async fn create_then_get_starts_pending() {
        let store = store().await;
        let id = store.create(1, 2, "abc123", now()).await.unwrap();
        let transfer = store.get(id).await.unwrap();
        assert_eq!(transfer.state, TransferState::Pending);
        assert!(transfer.completed_at.is_none());
    }

    #[tokio::test]
    async fn advance_to_a_terminal_state_sets_completed_at() {
        let store = store().await;
        let id = store.create(1, 2, "abc123", now()).await.unwrap();
        store.advance(id, TransferState::Completed, Some(now()), None).await.unwrap();
        let transfer = store.get(id).await.unwrap();
        assert_eq!(transfer.state, TransferState::Completed);
        assert!(transfer.completed_at.is_some());
    }

    #[tokio::test]
    async fn list_active_excludes_terminal_transfers() {
        let store = store().await;
        let pending = store.create(1, 2, "abc123", now()).await.unwrap();
        let done = store.create(1, 2, "def456", now()).await.unwrap();
        store.advance(done, TransferState::Completed, Some(now()), None).await.unwrap();

        let active = store.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, pending);
    }
}
