//! Store for registered qBittorrent [`Instance`] endpoints.

use sqlx::Row;

use sentrel_data::{DataError, Dialect, Pool};
use sentrel_model::Instance;

use crate::error::RuntimeResult;

/// Schema statement for the `instances` table.
#[must_use]
pub const fn schema(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Sqlite => {
            r"CREATE TABLE IF NOT EXISTS instances (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                url TEXT NOT NULL,
                username TEXT NOT NULL,
                password_ct TEXT NOT NULL,
                basic_username TEXT,
                basic_password_ct TEXT,
                tls_skip_verify INTEGER NOT NULL DEFAULT 0
            )"
        }
        Dialect::Postgres => {
            r"CREATE TABLE IF NOT EXISTS instances (
                id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                url TEXT NOT NULL,
                username TEXT NOT NULL,
                password_ct TEXT NOT NULL,
                basic_username TEXT,
                basic_password_ct TEXT,
                tls_skip_verify BOOLEAN NOT NULL DEFAULT FALSE
            )"
        }
    }
}

fn from_row(row: &sqlx::any::AnyRow) -> sqlx::Result<Instance> {
    Ok(Instance {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        url: row.try_get("url")?,
        username: row.try_get("username")?,
        password_ct: row.try_get("password_ct")?,
        basic_username: row.try_get("basic_username")?,
        basic_password_ct: row.try_get("basic_password_ct")?,
        tls_skip_verify: row.try_get("tls_skip_verify")?,
    })
}

/// Store over `instances`.
#[derive(Clone)]
pub struct InstanceStore {
    pool: Pool,
}

impl InstanceStore {
    /// Construct a store bound to `pool`. Does not create the schema;
    /// callers run [`schema`] as part of their migration bootstrap.
    #[must_use]
    pub const fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Insert a new instance, returning its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`DataError`] if the insert fails, including a unique-name
    /// violation (checkable with [`DataError::is_unique_constraint`]).
    pub async fn create(&self, instance: &Instance) -> RuntimeResult<i64> {
        let row = sqlx::query(
            "INSERT INTO instances (name, url, username, password_ct, basic_username, basic_password_ct, tls_skip_verify) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&instance.name)
        .bind(&instance.url)
        .bind(&instance.username)
        .bind(&instance.password_ct)
        .bind(&instance.basic_username)
        .bind(&instance.basic_password_ct)
        .bind(instance.tls_skip_verify)
        .fetch_one(self.pool.any())
        .await
        .map_err(|source| DataError::query_failed("runtime.instance_create", source))?;
        row.try_get::<i64, _>("id")
            .map_err(|source| DataError::query_failed("runtime.instance_create", source).into())
    }

    /// Fetch one instance by id.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::NotFound`] if no row exists for `id`.
    pub async fn get(&self, id: i64) -> RuntimeResult<Instance> {
        let row = sqlx::query("SELECT * FROM instances WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("runtime.instance_get", source))?
            .ok_or(DataError::NotFound { entity: "instance" })?;
        from_row(&row).map_err(|source| DataError::query_failed("runtime.instance_get", source).into())
    }

    /// List every registered instance, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(&self) -> RuntimeResult<Vec<Instance>> {
        let rows = sqlx::query("SELECT * FROM instances ORDER BY name")
            .fetch_all(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("runtime.instance_list", source))?;
        rows.iter()
            .map(|row| from_row(row).map_err(|source| DataError::query_failed("runtime.instance_list", source).into()))
            .collect()
    }

    /// Overwrite every mutable field of the instance identified by
    /// `instance.id`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::NotFound`] if `instance.id` does not exist.
    pub async fn update(&self, instance: &Instance) -> RuntimeResult<()> {
        let result = sqlx::query(
            "UPDATE instances SET name = ?, url = ?, username = ?, password_ct = ?, \
             basic_username = ?, basic_password_ct = ?, tls_skip_verify = ? WHERE id = ?",
        )
        .bind(&instance.name)
        .bind(&instance.url)
        .bind(&instance.username)
        .bind(&instance.password_ct)
        .bind(&instance.basic_username)
        .bind(&instance.basic_password_ct)
        .bind(instance.tls_skip_verify)
        .bind(instance.id)
        .execute(self.pool.any())
        .await
        .map_err(|source| DataError::query_failed("runtime.instance_update", source))?;
        if result.rows_affected() == 0 {
            return Err(DataError::NotFound { entity: "instance" }.into());
        }
        Ok(())
    }

    /// Delete an instance by id, cascading to every owned child row
    /// (tracker rules, runs, activity log entries) in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::NotFound`] if `id` does not exist.
    pub async fn delete(&self, id: i64) -> RuntimeResult<()> {
        let mut tx = self.pool.begin().await?;

        for (statement, label) in [
            ("DELETE FROM tracker_rule_activity WHERE instance_id = ?", "runtime.instance_delete_activity"),
            ("DELETE FROM tracker_rules WHERE instance_id = ?", "runtime.instance_delete_rules"),
            ("DELETE FROM runs WHERE owner_id = ?", "runtime.instance_delete_runs"),
        ] {
            let result = sqlx::query(statement).bind(id).execute(&mut *tx).await;
            if let Err(source) = result {
                tx.rollback().await.map_err(|source| DataError::query_failed("runtime.instance_delete_rollback", source))?;
                return Err(DataError::query_failed(label, source).into());
            }
        }

        let result = sqlx::query("DELETE FROM instances WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|source| DataError::query_failed("runtime.instance_delete", source))?;
        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(|source| DataError::query_failed("runtime.instance_delete_rollback", source))?;
            return Err(DataError::NotFound { entity: "instance" }.into());
        }

        tx.commit().await.map_err(|source| DataError::query_failed("runtime.instance_delete_commit", source))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> InstanceStore {
        let pool = Pool::connect("sqlite::memory:").await.unwrap();
        sqlx::query(schema(pool.dialect())).execute(pool.any()).await.unwrap();
        InstanceStore::new(pool)
    }

    async fn store_with_children() -> (InstanceStore, crate::tracker_rule::TrackerRuleStore, crate::run::RunStore, sentrel_activity::ActivityStore)
    {
        let pool = Pool::connect("sqlite::memory:").await.unwrap();
        sqlx::query(schema(pool.dialect())).execute(pool.any()).await.unwrap();
        sqlx::query(crate::tracker_rule::schema(pool.dialect())).execute(pool.any()).await.unwrap();
        sqlx::query(crate::run::schema(pool.dialect())).execute(pool.any()).await.unwrap();
        sqlx::query(sentrel_activity::schema(pool.dialect())).execute(pool.any()).await.unwrap();
        (
            InstanceStore::new(pool.clone()),
            crate::tracker_rule::TrackerRuleStore::new(pool.clone()),
            crate::run::RunStore::new(pool.clone()),
            sentrel_activity::ActivityStore::new(pool),
        )
    }

    fn sample() -> Instance {
        Instance {
            id: 0,
            name: "main".to_string(),
            url: "https://qbt.example.com:8080/".to_string(),
            username: "admin".to_string(),
            password_ct: "ct".to_string(),
            basic_username: None,
            basic_password_ct: None,
            tls_skip_verify: false,
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = store().await;
        let id = store.create(&sample()).await.unwrap();
        let fetched = store.get(id).await.unwrap();
        assert_eq!(fetched.name, "main");
    }

    #[tokio::test]
    async fn duplicate_name_is_a_unique_violation() {
        let store = store().await;
        store.create(&sample()).await.unwrap();
        let err = store.create(&sample()).await.unwrap_err();
        match err {
            crate::error::RuntimeError::Data(data_err) => assert!(data_err.is_unique_constraint()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_changes_fields_in_place() {
        let store = store().await;
        let id = store.create(&sample()).await.unwrap();
        let mut updated = store.get(id).await.unwrap();
        updated.tls_skip_verify = true;
        store.update(&updated).await.unwrap();
        assert!(store.get(id).await.unwrap().tls_skip_verify);
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let store = store().await;
        let id = store.create(&sample()).await.unwrap();
        store.delete(id).await.unwrap();
        assert!(store.get(id).await.is_err());
    }

    #[tokio::test]
    async fn delete_cascades_to_rules_runs_and_activity() {
        let (instances, rules, runs, activity) = store_with_children().await;
        let instance_id = instances.create(&sample()).await.unwrap();

        let rule_id = rules
            .create(&sentrel_model::TrackerRule {
                id: 0,
                instance_id,
                name: "seed longer".to_string(),
                tracker_pattern: "tracker.example".to_string(),
                conditions: sentrel_model::ActionConditions::default(),
                enabled: true,
                dry_run: false,
                sort_order: 0,
                interval_s: None,
                free_space_source: None,
            })
            .await
            .unwrap();

        let run_id = runs
            .create_if_no_active(instance_id, sentrel_model::RunKind::Scan, "manual", chrono::Utc::now())
            .await
            .unwrap()
            .unwrap();

        let activity_id = activity
            .record(&sentrel_model::ActivityEntry {
                id: 0,
                instance_id,
                hash: "abc123".to_string(),
                torrent_name: "example.torrent".to_string(),
                tracker_domain: None,
                action: "tag".to_string(),
                rule_id: Some(rule_id),
                rule_name: Some("seed longer".to_string()),
                outcome: sentrel_model::ActivityOutcome::Success,
                reason: None,
                details_json: None,
                created_at: chrono::Utc::now(),
            })
            .await
            .unwrap();

        instances.delete(instance_id).await.unwrap();

        assert!(instances.get(instance_id).await.is_err());
        assert!(rules.get(rule_id).await.is_err());
        assert!(runs.get(run_id).await.is_err());
        assert_eq!(activity.count_for_instance(instance_id).await.unwrap(), 0);
        let _ = activity_id;
    }

    #[tokio::test]
    async fn list_orders_by_name() {
        let store = store().await;
        let mut second = sample();
        second.name = "zeta".to_string();
        let mut first = sample();
        first.name = "alpha".to_string();
        store.create(&second).await.unwrap();
        store.create(&first).await.unwrap();
        let names: Vec<String> = store.list().await.unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["alpha".to_string(), "zeta".to_string()]);
    }
}
