//! Append-only activity log store and retention sweeper.

use sqlx::Row;

use sentrel_data::{DataError, Dialect, Pool};
use sentrel_model::{effective_retention_days, ActivityEntry, ActivityOutcome};

use crate::error::ActivityResult;

/// The `created_at` cutoff for rows older than `days`, formatted as
/// `YYYY-MM-DD HH:MM:SS` so lexicographic comparison against the
/// `CURRENT_TIMESTAMP`-stamped column is correct on both dialects (see
/// data model §3).
fn retention_cutoff(days: i64) -> String {
    let cutoff = chrono::Utc::now() - chrono::Duration::days(days);
    cutoff.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Schema statement for the `tracker_rule_activity` table.
#[must_use]
pub const fn schema(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Sqlite => {
            r"CREATE TABLE IF NOT EXISTS tracker_rule_activity (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                instance_id INTEGER NOT NULL,
                hash TEXT NOT NULL,
                torrent_name TEXT NOT NULL,
                tracker_domain TEXT,
                action TEXT NOT NULL,
                rule_id INTEGER,
                rule_name TEXT,
                outcome TEXT NOT NULL,
                reason TEXT,
                details TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )"
        }
        Dialect::Postgres => {
            r"CREATE TABLE IF NOT EXISTS tracker_rule_activity (
                id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
                instance_id BIGINT NOT NULL,
                hash TEXT NOT NULL,
                torrent_name TEXT NOT NULL,
                tracker_domain TEXT,
                action TEXT NOT NULL,
                rule_id BIGINT,
                rule_name TEXT,
                outcome TEXT NOT NULL,
                reason TEXT,
                details TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
            )"
        }
    }
}

/// Append-only activity log over `tracker_rule_activity`.
#[derive(Clone)]
pub struct ActivityStore {
    pool: Pool,
}

impl ActivityStore {
    /// Construct a store bound to `pool`. Does not create the schema;
    /// callers run [`schema`] as part of their migration bootstrap.
    #[must_use]
    pub const fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Append one activity row. Never called in a way that can roll back
    /// the action pipeline's own outcome: per the error-handling design,
    /// callers treat a write failure here as a telemetry-only event.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn record(&self, entry: &ActivityEntry) -> ActivityResult<i64> {
        let outcome = match entry.outcome {
            ActivityOutcome::Success => "success",
            ActivityOutcome::Failed => "failed",
        };
        let details = entry
            .details_json
            .as_ref()
            .map(serde_json::Value::to_string);
        let row = sqlx::query(
            "INSERT INTO tracker_rule_activity \
             (instance_id, hash, torrent_name, tracker_domain, action, rule_id, rule_name, outcome, reason, details) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING id",
        )
        .bind(entry.instance_id)
        .bind(&entry.hash)
        .bind(&entry.torrent_name)
        .bind(&entry.tracker_domain)
        .bind(&entry.action)
        .bind(entry.rule_id)
        .bind(&entry.rule_name)
        .bind(outcome)
        .bind(&entry.reason)
        .bind(details)
        .fetch_one(self.pool.any())
        .await
        .map_err(|source| DataError::query_failed("activity.record", source))?;

        row.try_get::<i64, _>("id")
            .map_err(|source| DataError::query_failed("activity.record", source))
    }

    /// Number of rows currently stored for `instance_id`. Exposed for
    /// tests asserting retention behaviour; not part of the write path.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count_for_instance(&self, instance_id: i64) -> ActivityResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM tracker_rule_activity WHERE instance_id = ?")
            .bind(instance_id)
            .fetch_one(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("activity.count_for_instance", source))?;
        row.try_get::<i64, _>("n")
            .map_err(|source| DataError::query_failed("activity.count_for_instance", source))
    }

    /// Delete rows for `instance_id` per the retention contract: `days=0`
    /// deletes everything for the instance, `days<0` is coerced to the
    /// platform default, `days>0` deletes rows older than that many days.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn delete_older_than(&self, instance_id: i64, days: i64) -> ActivityResult<u64> {
        let effective = effective_retention_days(days);
        let result = if effective == 0 {
            sqlx::query("DELETE FROM tracker_rule_activity WHERE instance_id = ?")
                .bind(instance_id)
                .execute(self.pool.any())
                .await
        } else {
            sqlx::query("DELETE FROM tracker_rule_activity WHERE instance_id = ? AND created_at < ?")
                .bind(instance_id)
                .bind(retention_cutoff(effective))
                .execute(self.pool.any())
                .await
        }
        .map_err(|source| DataError::query_failed("activity.delete_older_than", source))?;
        Ok(result.rows_affected())
    }

    /// Apply [`Self::delete_older_than`] across every instance using a
    /// single global retention window.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn prune_all(&self, retention_days: i64) -> ActivityResult<u64> {
        let effective = effective_retention_days(retention_days);
        let result = if effective == 0 {
            sqlx::query("DELETE FROM tracker_rule_activity")
                .execute(self.pool.any())
                .await
        } else {
            sqlx::query("DELETE FROM tracker_rule_activity WHERE created_at < ?")
                .bind(retention_cutoff(effective))
                .execute(self.pool.any())
                .await
        }
        .map_err(|source| DataError::query_failed("activity.prune_all", source))?;
        Ok(result.rows_affected())
    }
}
