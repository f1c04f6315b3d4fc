//! Store for [`Run`] execution records.
//!
//! The data model names per-kind `*_runs` tables; this store collapses
//! them into one `runs` table keyed by a `kind` column instead, since
//! [`sentrel_model::Run`] already unifies every job kind as one
//! `RunKind` field. See `DESIGN.md` for the rationale.

use sqlx::Row;

use sentrel_data::{DataError, Dialect, Pool};
use sentrel_model::{Run, RunKind, RunStatus};

use crate::error::RuntimeResult;
use crate::wire;

/// Schema statement for the `runs` table.
#[must_use]
pub const fn schema(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Sqlite => {
            r"CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                status TEXT NOT NULL,
                triggered_by TEXT NOT NULL,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                stats TEXT NOT NULL DEFAULT '{}',
                error TEXT
            )"
        }
        Dialect::Postgres => {
            r"CREATE TABLE IF NOT EXISTS runs (
                id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
                owner_id BIGINT NOT NULL,
                kind TEXT NOT NULL,
                status TEXT NOT NULL,
                triggered_by TEXT NOT NULL,
                started_at TIMESTAMPTZ NOT NULL,
                completed_at TIMESTAMPTZ,
                stats TEXT NOT NULL DEFAULT '{}',
                error TEXT
            )"
        }
    }
}

/// `created_at`-style timestamp formatted for lexicographic comparison,
/// matching the `YYYY-MM-DD HH:MM:SS` convention used across the schema.
fn format_timestamp(value: chrono::DateTime<chrono::Utc>) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn active_status_tags() -> Vec<String> {
    RunStatus::ACTIVE.iter().map(wire::to_tag).collect()
}

fn from_row(row: &sqlx::any::AnyRow) -> RuntimeResult<Run> {
    let kind_tag: String = row.try_get("kind").map_err(|source| DataError::query_failed("runtime.run_row", source))?;
    let status_tag: String = row.try_get("status").map_err(|source| DataError::query_failed("runtime.run_row", source))?;
    let stats_json: String = row.try_get("stats").map_err(|source| DataError::query_failed("runtime.run_row", source))?;
    let started_at_text: String = row.try_get("started_at").map_err(|source| DataError::query_failed("runtime.run_row", source))?;
    let completed_at_text: Option<String> =
        row.try_get("completed_at").map_err(|source| DataError::query_failed("runtime.run_row", source))?;

    Ok(Run {
        id: row.try_get("id").map_err(|source| DataError::query_failed("runtime.run_row", source))?,
        owner_id: row.try_get("owner_id").map_err(|source| DataError::query_failed("runtime.run_row", source))?,
        kind: wire::from_tag::<RunKind>("kind", &kind_tag)?,
        status: wire::from_tag::<RunStatus>("status", &status_tag)?,
        triggered_by: row.try_get("triggered_by").map_err(|source| DataError::query_failed("runtime.run_row", source))?,
        started_at: parse_timestamp(&started_at_text)?,
        completed_at: completed_at_text.as_deref().map(parse_timestamp).transpose()?,
        stats: serde_json::from_str(&stats_json).unwrap_or_else(|_| serde_json::json!({})),
        error: row.try_get("error").map_err(|source| DataError::query_failed("runtime.run_row", source))?,
    })
}

fn parse_timestamp(text: &str) -> RuntimeResult<chrono::DateTime<chrono::Utc>> {
    chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .or_else(|_| chrono::DateTime::parse_from_rfc3339(text).map(|dt| dt.with_timezone(&chrono::Utc)))
        .map_err(|_| DataError::NotFound { entity: "run timestamp" }.into())
}

/// Store over `runs`.
#[derive(Clone)]
pub struct RunStore {
    pool: Pool,
}

impl RunStore {
    /// Construct a store bound to `pool`. Does not create the schema;
    /// callers run [`schema`] as part of their migration bootstrap.
    #[must_use]
    pub const fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new run for `(owner_id, kind)` unless one is already
    /// active, enforcing at-most-one-active in a single statement rather
    /// than a check-then-insert race.
    ///
    /// Returns the new run's id, or `None` if an active run already
    /// exists for this `(owner_id, kind)` pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create_if_no_active(
        &self,
        owner_id: i64,
        kind: RunKind,
        triggered_by: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> RuntimeResult<Option<i64>> {
        let kind_tag = wire::to_tag(&kind);
        let status_tag = wire::to_tag(&RunStatus::Queued);
        let placeholders = active_status_tags().iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let query = format!(
            "INSERT INTO runs (owner_id, kind, status, triggered_by, started_at, stats) \
             SELECT ?, ?, ?, ?, ?, '{{}}' \
             WHERE NOT EXISTS ( \
                SELECT 1 FROM runs WHERE owner_id = ? AND kind = ? AND status IN ({placeholders}) \
             ) RETURNING id"
        );

        let mut builder = sqlx::query(&query)
            .bind(owner_id)
            .bind(&kind_tag)
            .bind(&status_tag)
            .bind(triggered_by)
            .bind(format_timestamp(now))
            .bind(owner_id)
            .bind(&kind_tag);
        for tag in active_status_tags() {
            builder = builder.bind(tag);
        }

        let row = builder
            .fetch_optional(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("runtime.run_create_if_no_active", source))?;
        row.map(|row| row.try_get::<i64, _>("id").map_err(|source| DataError::query_failed("runtime.run_create_if_no_active", source).into()))
            .transpose()
    }

    /// Fetch one run by id.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::NotFound`] if no row exists for `id`.
    pub async fn get(&self, id: i64) -> RuntimeResult<Run> {
        let row = sqlx::query("SELECT * FROM runs WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("runtime.run_get", source))?
            .ok_or(DataError::NotFound { entity: "run" })?;
        from_row(&row)
    }

    /// Fetch the active run for `(owner_id, kind)`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_active(&self, owner_id: i64, kind: RunKind) -> RuntimeResult<Option<Run>> {
        let placeholders = active_status_tags().iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let query = format!("SELECT * FROM runs WHERE owner_id = ? AND kind = ? AND status IN ({placeholders})");
        let mut builder = sqlx::query(&query).bind(owner_id).bind(wire::to_tag(&kind));
        for tag in active_status_tags() {
            builder = builder.bind(tag);
        }
        let row = builder
            .fetch_optional(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("runtime.run_get_active", source))?;
        row.as_ref().map(from_row).transpose()
    }

    /// Update a run's status and, for kinds that report progress, its
    /// stats document.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::NotFound`] if `id` does not exist.
    pub async fn update_status(&self, id: i64, status: RunStatus, stats: &serde_json::Value) -> RuntimeResult<()> {
        let result = sqlx::query("UPDATE runs SET status = ?, stats = ? WHERE id = ?")
            .bind(wire::to_tag(&status))
            .bind(stats.to_string())
            .bind(id)
            .execute(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("runtime.run_update_status", source))?;
        if result.rows_affected() == 0 {
            return Err(DataError::NotFound { entity: "run" }.into());
        }
        Ok(())
    }

    /// Mark a run completed (or failed, if `error` is set).
    ///
    /// # Errors
    ///
    /// Returns [`DataError::NotFound`] if `id` does not exist.
    pub async fn complete(
        &self,
        id: i64,
        completed_at: chrono::DateTime<chrono::Utc>,
        error: Option<&str>,
    ) -> RuntimeResult<()> {
        let status = if error.is_some() { RunStatus::Failed } else { RunStatus::Completed };
        let result = sqlx::query("UPDATE runs SET status = ?, completed_at = ?, error = ? WHERE id = ?")
            .bind(wire::to_tag(&status))
            .bind(format_timestamp(completed_at))
            .bind(error)
            .bind(id)
            .execute(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("runtime.run_complete", source))?;
        if result.rows_affected() == 0 {
            return Err(DataError::NotFound { entity: "run" }.into());
        }
        Ok(())
    }

    /// Sweep every active run at boot, force-failing each with
    /// [`Run::restart_recovery_outcome`]. Returns every recovered run in
    /// its post-recovery state, so a caller can emit one notification per
    /// flipped run.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails partway through the sweep.
    pub async fn recover_after_restart(
        &self,
        now: chrono::DateTime<chrono::Utc>,
        stuck_threshold: chrono::Duration,
    ) -> RuntimeResult<Vec<Run>> {
        let placeholders = active_status_tags().iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let query = format!("SELECT * FROM runs WHERE status IN ({placeholders})");
        let mut builder = sqlx::query(&query);
        for tag in active_status_tags() {
            builder = builder.bind(tag);
        }
        let rows = builder
            .fetch_all(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("runtime.run_recover_after_restart", source))?;

        let mut recovered = Vec::new();
        for row in &rows {
            let run = from_row(row)?;
            if let Some(outcome) = run.restart_recovery_outcome(now, stuck_threshold) {
                self.complete(run.id, outcome.completed_at, Some(&outcome.error)).await?;
                recovered.push(self.get(run.id).await?);
            }
        }
        Ok(recovered)
    }

    /// Delete terminal runs for `owner_id` older than `days`, per the
    /// `days=0 -> delete everything, days<0 -> default` retention
    /// contract shared with the activity log.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn prune_terminal(&self, owner_id: i64, days: i64) -> RuntimeResult<u64> {
        let effective = sentrel_model::effective_retention_days(days);
        let result = if effective == 0 {
            sqlx::query("DELETE FROM runs WHERE owner_id = ? AND completed_at IS NOT NULL")
                .bind(owner_id)
                .execute(self.pool.any())
                .await
        } else {
            let cutoff = format_timestamp(chrono::Utc::now() - chrono::Duration::days(effective));
            sqlx::query("DELETE FROM runs WHERE owner_id = ? AND completed_at IS NOT NULL AND completed_at < ?")
                .bind(owner_id)
                .bind(cutoff)
                .execute(self.pool.any())
                .await
        }
        .map_err(|source| DataError::query_failed("runtime.run_prune_terminal", source))?;
        Ok(result.rows_affected())
    }

    /// Delete terminal runs for `(owner_id, kind)` beyond the `keep` most
    /// recently completed, per the "N recent runs" retention contract for
    /// scan/backup kinds. Rows are kept by `completed_at DESC, id DESC`
    /// order; everything after position `keep` is deleted in one
    /// dialect-aware paginated statement.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn prune_keep_recent(&self, owner_id: i64, kind: RunKind, keep: i64) -> RuntimeResult<u64> {
        let keep = keep.max(0);
        let offset_clause = self.pool.dialect().offset_clause(keep);
        let query = format!(
            "DELETE FROM runs WHERE id IN ( \
                SELECT id FROM runs WHERE owner_id = ? AND kind = ? AND completed_at IS NOT NULL \
                ORDER BY completed_at DESC, id DESC {offset_clause} \
             )"
        );
        let result = sqlx::query(&query)
            .bind(owner_id)
            .bind(wire::to_tag(&kind))
            .execute(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("runtime.run_prune_keep_recent", source))?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> RunStore {
        let pool = Pool::connect("sqlite::memory:").await.unwrap();
        sqlx::query(schema(pool.dialect())).execute(pool.any()).await.unwrap();
        RunStore::new(pool)
    }

    fn now() -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&chrono::Utc)
    }

    #[tokio::test]
    async fn create_if_no_active_enforces_at_most_one() {
        let store = store().await;
        let first = store.create_if_no_active(1, RunKind::Scan, "manual", now()).await.unwrap();
        assert!(first.is_some());
        let second = store.create_if_no_active(1, RunKind::Scan, "manual", now()).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn distinct_kinds_do_not_collide() {
        let store = store().await;
        let scan = store.create_if_no_active(1, RunKind::Scan, "manual", now()).await.unwrap();
        let crossseed = store.create_if_no_active(1, RunKind::Crossseed, "manual", now()).await.unwrap();
        assert!(scan.is_some());
        assert!(crossseed.is_some());
    }

    #[tokio::test]
    async fn get_active_returns_the_in_progress_run() {
        let store = store().await;
        let id = store.create_if_no_active(1, RunKind::Scan, "manual", now()).await.unwrap().unwrap();
        let active = store.get_active(1, RunKind::Scan).await.unwrap().unwrap();
        assert_eq!(active.id, id);
        assert_eq!(active.status, RunStatus::Queued);
    }

    #[tokio::test]
    async fn complete_clears_the_active_slot() {
        let store = store().await;
        let id = store.create_if_no_active(1, RunKind::Scan, "manual", now()).await.unwrap().unwrap();
        store.complete(id, now(), None).await.unwrap();
        assert!(store.get_active(1, RunKind::Scan).await.unwrap().is_none());
        assert_eq!(store.get(id).await.unwrap().status, RunStatus::Completed);

        let retry = store.create_if_no_active(1, RunKind::Scan, "manual", now()).await.unwrap();
        assert!(retry.is_some());
    }

    #[tokio::test]
    async fn recover_after_restart_fails_deleting_family_regardless_of_age() {
        let store = store().await;
        let id = store.create_if_no_active(1, RunKind::Crossseed, "manual", now()).await.unwrap().unwrap();
        store.update_status(id, RunStatus::Searching, &serde_json::json!({})).await.unwrap();

        let recovered = store.recover_after_restart(now(), chrono::Duration::hours(1)).await.unwrap();
        assert_eq!(recovered.len(), 1);
        assert_eq!(recovered[0].id, id);
        let run = store.get(id).await.unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("Marked failed after restart"));
    }

    #[tokio::test]
    async fn prune_terminal_zero_deletes_all_completed_runs_for_owner() {
        let store = store().await;
        let id = store.create_if_no_active(1, RunKind::Scan, "manual", now()).await.unwrap().unwrap();
        store.complete(id, now(), None).await.unwrap();
        let affected = store.prune_terminal(1, 0).await.unwrap();
        assert_eq!(affected, 1);
        assert!(store.get(id).await.is_err());
    }

    #[tokio::test]
    async fn prune_keep_recent_deletes_everything_past_the_retained_count() {
        let store = store().await;
        let mut ids = Vec::new();
        for _ in 0..5 {
            let id = store.create_if_no_active(1, RunKind::Scan, "manual", now()).await.unwrap().unwrap();
            store.complete(id, now(), None).await.unwrap();
            ids.push(id);
        }

        let affected = store.prune_keep_recent(1, RunKind::Scan, 2).await.unwrap();
        assert_eq!(affected, 3);

        assert!(store.get(ids[0]).await.is_err());
        assert!(store.get(ids[1]).await.is_err());
        assert!(store.get(ids[2]).await.is_err());
        assert!(store.get(ids[3]).await.is_ok());
        assert!(store.get(ids[4]).await.is_ok());
    }

    #[tokio::test]
    async fn prune_keep_recent_does_not_touch_other_kinds() {
        let store = store().await;
        let scan_id = store.create_if_no_active(1, RunKind::Scan, "manual", now()).await.unwrap().unwrap();
        store.complete(scan_id, now(), None).await.unwrap();
        let crossseed_id = store.create_if_no_active(1, RunKind::Crossseed, "manual", now()).await.unwrap().unwrap();
        store.complete(crossseed_id, now(), None).await.unwrap();

        store.prune_keep_recent(1, RunKind::Scan, 0).await.unwrap();

        assert!(store.get(scan_id).await.is_err());
        assert!(store.get(crossseed_id).await.is_ok());
    }
}
