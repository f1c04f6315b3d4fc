//! Store for [`TrackerRule`] automations bound to an instance.

use sqlx::Row;

use sentrel_data::{DataError, Dialect, Pool};
use sentrel_model::{ActionConditions, FreeSpaceSource, TrackerRule};

use crate::error::RuntimeResult;
use crate::wire;

/// Schema statement for the `tracker_rules` table.
#[must_use]
pub const fn schema(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Sqlite => {
            r"CREATE TABLE IF NOT EXISTS tracker_rules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                instance_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                tracker_pattern TEXT NOT NULL,
                conditions TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                dry_run INTEGER NOT NULL DEFAULT 0,
                sort_order INTEGER NOT NULL DEFAULT 0,
                interval_s INTEGER,
                free_space_source TEXT,
                UNIQUE (instance_id, name)
            )"
        }
        Dialect::Postgres => {
            r"CREATE TABLE IF NOT EXISTS tracker_rules (
                id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
                instance_id BIGINT NOT NULL,
                name TEXT NOT NULL,
                tracker_pattern TEXT NOT NULL,
                conditions TEXT NOT NULL,
                enabled BOOLEAN NOT NULL DEFAULT TRUE,
                dry_run BOOLEAN NOT NULL DEFAULT FALSE,
                sort_order INTEGER NOT NULL DEFAULT 0,
                interval_s BIGINT,
                free_space_source TEXT,
                UNIQUE (instance_id, name)
            )"
        }
    }
}

fn from_row(row: &sqlx::any::AnyRow) -> RuntimeResult<TrackerRule> {
    let conditions_json: String = row.try_get("conditions").map_err(|source| DataError::query_failed("runtime.rule_row", source))?;
    let conditions: ActionConditions =
        serde_json::from_str(&conditions_json).map_err(|_| DataError::NotFound { entity: "tracker rule conditions" })?;
    let free_space_source: Option<String> =
        row.try_get("free_space_source").map_err(|source| DataError::query_failed("runtime.rule_row", source))?;
    let free_space_source = free_space_source.map(|tag| wire::from_tag::<FreeSpaceSource>("free_space_source", &tag)).transpose()?;

    Ok(TrackerRule {
        id: row.try_get("id").map_err(|source| DataError::query_failed("runtime.rule_row", source))?,
        instance_id: row.try_get("instance_id").map_err(|source| DataError::query_failed("runtime.rule_row", source))?,
        name: row.try_get("name").map_err(|source| DataError::query_failed("runtime.rule_row", source))?,
        tracker_pattern: row.try_get("tracker_pattern").map_err(|source| DataError::query_failed("runtime.rule_row", source))?,
        conditions,
        enabled: row.try_get("enabled").map_err(|source| DataError::query_failed("runtime.rule_row", source))?,
        dry_run: row.try_get("dry_run").map_err(|source| DataError::query_failed("runtime.rule_row", source))?,
        sort_order: row.try_get("sort_order").map_err(|source| DataError::query_failed("runtime.rule_row", source))?,
        interval_s: row.try_get("interval_s").map_err(|source| DataError::query_failed("runtime.rule_row", source))?,
        free_space_source,
    })
}

/// Store over `tracker_rules`.
#[derive(Clone)]
pub struct TrackerRuleStore {
    pool: Pool,
}

impl TrackerRuleStore {
    /// Construct a store bound to `pool`. Does not create the schema;
    /// callers run [`schema`] as part of their migration bootstrap.
    #[must_use]
    pub const fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Insert a new rule, returning its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`DataError`] if the insert fails, including a unique
    /// `(instance_id, name)` violation.
    pub async fn create(&self, rule: &TrackerRule) -> RuntimeResult<i64> {
        let conditions = serde_json::to_string(&rule.conditions).map_err(|_| DataError::NotFound { entity: "tracker rule conditions" })?;
        let free_space_source = rule.free_space_source.map(|source| wire::to_tag(&source));
        let row = sqlx::query(
            "INSERT INTO tracker_rules \
             (instance_id, name, tracker_pattern, conditions, enabled, dry_run, sort_order, interval_s, free_space_source) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(rule.instance_id)
        .bind(&rule.name)
        .bind(&rule.tracker_pattern)
        .bind(conditions)
        .bind(rule.enabled)
        .bind(rule.dry_run)
        .bind(rule.sort_order)
        .bind(rule.interval_s)
        .bind(free_space_source)
        .fetch_one(self.pool.any())
        .await
        .map_err(|source| DataError::query_failed("runtime.rule_create", source))?;
        row.try_get::<i64, _>("id").map_err(|source| DataError::query_failed("runtime.rule_create", source).into())
    }

    /// Fetch one rule by id.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::NotFound`] if no row exists for `id`.
    pub async fn get(&self, id: i64) -> RuntimeResult<TrackerRule> {
        let row = sqlx::query("SELECT * FROM tracker_rules WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("runtime.rule_get", source))?
            .ok_or(DataError::NotFound { entity: "tracker rule" })?;
        from_row(&row)
    }

    /// List every enabled rule for `instance_id`, in dense sort order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_enabled_for_instance(&self, instance_id: i64) -> RuntimeResult<Vec<TrackerRule>> {
        let dialect_true = self.pool.dialect().bool_literal(true);
        let rows = sqlx::query(&format!(
            "SELECT * FROM tracker_rules WHERE instance_id = ? AND enabled = {dialect_true} ORDER BY sort_order, id"
        ))
        .bind(instance_id)
        .fetch_all(self.pool.any())
        .await
        .map_err(|source| DataError::query_failed("runtime.rule_list_enabled_for_instance", source))?;
        rows.iter().map(from_row).collect()
    }

    /// Delete a rule by id.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::NotFound`] if `id` does not exist.
    pub async fn delete(&self, id: i64) -> RuntimeResult<()> {
        let result = sqlx::query("DELETE FROM tracker_rules WHERE id = ?")
            .bind(id)
            .execute(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("runtime.rule_delete", source))?;
        if result.rows_affected() == 0 {
            return Err(DataError::NotFound { entity: "tracker rule" }.into());
        }
        Ok(())
    }

    /// Reassign `sort_order` for every rule in `instance_id` to its dense
    /// position (starting at 0) in `ordered_rule_ids`. All rule ids
    /// belonging to `instance_id` must be present exactly once; otherwise
    /// the whole reorder is rejected and nothing changes.
    ///
    /// Runs as a single transaction: the rollback path is exercised on
    /// every early return so a partial reorder is never committed.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::NotFound`] if `ordered_rule_ids` does not
    /// exactly match the set of rule ids currently owned by
    /// `instance_id`.
    pub async fn reorder(&self, instance_id: i64, ordered_rule_ids: &[i64]) -> RuntimeResult<()> {
        let mut tx = self.pool.begin().await?;

        let existing: Vec<i64> = sqlx::query("SELECT id FROM tracker_rules WHERE instance_id = ?")
            .bind(instance_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(|source| DataError::query_failed("runtime.rule_reorder_select", source))?
            .iter()
            .map(|row| row.try_get::<i64, _>("id"))
            .collect::<sqlx::Result<_>>()
            .map_err(|source| DataError::query_failed("runtime.rule_reorder_select", source))?;

        let mut existing_sorted = existing.clone();
        existing_sorted.sort_unstable();
        let mut wanted_sorted = ordered_rule_ids.to_vec();
        wanted_sorted.sort_unstable();
        if existing_sorted != wanted_sorted {
            tx.rollback().await.map_err(|source| DataError::query_failed("runtime.rule_reorder_rollback", source))?;
            return Err(DataError::NotFound { entity: "tracker rule" }.into());
        }

        for (position, rule_id) in ordered_rule_ids.iter().enumerate() {
            let position = i64::try_from(position).unwrap_or(i64::MAX);
            let result = sqlx::query("UPDATE tracker_rules SET sort_order = ? WHERE id = ? AND instance_id = ?")
                .bind(position)
                .bind(rule_id)
                .bind(instance_id)
                .execute(&mut *tx)
                .await
                .map_err(|source| DataError::query_failed("runtime.rule_reorder_update", source));
            if let Err(err) = result {
                tx.rollback().await.map_err(|source| DataError::query_failed("runtime.rule_reorder_rollback", source))?;
                return Err(err.into());
            }
        }

        tx.commit().await.map_err(|source| DataError::query_failed("runtime.rule_reorder_commit", source))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> TrackerRuleStore {
        let pool = Pool::connect("sqlite::memory:").await.unwrap();
        sqlx::query(schema(pool.dialect())).execute(pool.any()).await.unwrap();
        TrackerRuleStore::new(pool)
    }

    fn sample(instance_id: i64, name: &str) -> TrackerRule {
        TrackerRule {
            id: 0,
            instance_id,
            name: name.to_string(),
            tracker_pattern: "tracker.example".to_string(),
            conditions: ActionConditions::default(),
            enabled: true,
            dry_run: false,
            sort_order: 0,
            interval_s: None,
            free_space_source: Some(FreeSpaceSource::Qbittorrent),
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips_free_space_source() {
        let store = store().await;
        let id = store.create(&sample(1, "tag hd")).await.unwrap();
        let fetched = store.get(id).await.unwrap();
        assert_eq!(fetched.free_space_source, Some(FreeSpaceSource::Qbittorrent));
    }

    #[tokio::test]
    async fn list_enabled_for_instance_orders_by_sort_order() {
        let store = store().await;
        let mut second = sample(1, "second");
        second.sort_order = 2;
        let mut first = sample(1, "first");
        first.sort_order = 1;
        store.create(&second).await.unwrap();
        store.create(&first).await.unwrap();
        let rules = store.list_enabled_for_instance(1).await.unwrap();
        assert_eq!(rules.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn duplicate_name_within_instance_is_a_unique_violation() {
        let store = store().await;
        store.create(&sample(1, "dup")).await.unwrap();
        let err = store.create(&sample(1, "dup")).await.unwrap_err();
        match err {
            crate::error::RuntimeError::Data(data_err) => assert!(data_err.is_unique_constraint()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn reorder_assigns_dense_positions_in_the_given_order() {
        let store = store().await;
        let a = store.create(&sample(1, "a")).await.unwrap();
        let b = store.create(&sample(1, "b")).await.unwrap();
        let c = store.create(&sample(1, "c")).await.unwrap();
        store.reorder(1, &[c, a, b]).await.unwrap();
        let rules = store.list_enabled_for_instance(1).await.unwrap();
        assert_eq!(rules.iter().map(|r| r.id).collect::<Vec<_>>(), vec![c, a, b]);
        assert_eq!(rules.iter().map(|r| r.sort_order).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn reorder_rejects_a_mismatched_id_set() {
        let store = store().await;
        let a = store.create(&sample(1, "a")).await.unwrap();
        let _b = store.create(&sample(1, "b")).await.unwrap();
        let err = store.reorder(1, &[a]).await.unwrap_err();
        assert!(matches!(err, crate::error::RuntimeError::Data(DataError::NotFound { .. })));
    }
}
