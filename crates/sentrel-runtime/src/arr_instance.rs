//! Store for registered Sonarr/Radarr [`ArrInstance`] endpoints.

use sqlx::Row;

use sentrel_data::{DataError, Dialect, Pool};
use sentrel_model::{ArrInstance, ArrInstanceType};

use crate::error::RuntimeResult;

/// Schema statement for the `arr_instances` table.
#[must_use]
pub const fn schema(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Sqlite => {
            r"CREATE TABLE IF NOT EXISTS arr_instances (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                instance_type TEXT NOT NULL,
                name TEXT NOT NULL UNIQUE,
                base_url TEXT NOT NULL,
                api_key_ct TEXT NOT NULL,
                basic_username TEXT,
                basic_password_ct TEXT
            )"
        }
        Dialect::Postgres => {
            r"CREATE TABLE IF NOT EXISTS arr_instances (
                id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
                instance_type TEXT NOT NULL,
                name TEXT NOT NULL UNIQUE,
                base_url TEXT NOT NULL,
                api_key_ct TEXT NOT NULL,
                basic_username TEXT,
                basic_password_ct TEXT
            )"
        }
    }
}

fn from_row(row: &sqlx::any::AnyRow) -> RuntimeResult<ArrInstance> {
    let instance_type: String = row.try_get("instance_type").map_err(|source| DataError::query_failed("runtime.arr_instance_row", source))?;
    Ok(ArrInstance {
        id: row.try_get("id").map_err(|source| DataError::query_failed("runtime.arr_instance_row", source))?,
        instance_type: ArrInstanceType::parse(&instance_type).map_err(|_| DataError::NotFound { entity: "arr instance type" })?,
        name: row.try_get("name").map_err(|source| DataError::query_failed("runtime.arr_instance_row", source))?,
        base_url: row.try_get("base_url").map_err(|source| DataError::query_failed("runtime.arr_instance_row", source))?,
        api_key_ct: row.try_get("api_key_ct").map_err(|source| DataError::query_failed("runtime.arr_instance_row", source))?,
        basic_username: row.try_get("basic_username").map_err(|source| DataError::query_failed("runtime.arr_instance_row", source))?,
        basic_password_ct: row.try_get("basic_password_ct").map_err(|source| DataError::query_failed("runtime.arr_instance_row", source))?,
    })
}

/// Store over `arr_instances`.
#[derive(Clone)]
pub struct ArrInstanceStore {
    pool: Pool,
}

impl ArrInstanceStore {
    /// Construct a store bound to `pool`. Does not create the schema;
    /// callers run [`schema`] as part of their migration bootstrap.
    #[must_use]
    pub const fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Insert a new ARR instance, returning its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`DataError`] if the insert fails.
    pub async fn create(&self, instance: &ArrInstance) -> RuntimeResult<i64> {
        let row = sqlx::query(
            "INSERT INTO arr_instances (instance_type, name, base_url, api_key_ct, basic_username, basic_password_ct) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(instance.instance_type.as_str())
        .bind(&instance.name)
        .bind(&instance.base_url)
        .bind(&instance.api_key_ct)
        .bind(&instance.basic_username)
        .bind(&instance.basic_password_ct)
        .fetch_one(self.pool.any())
        .await
        .map_err(|source| DataError::query_failed("runtime.arr_instance_create", source))?;
        row.try_get::<i64, _>("id")
            .map_err(|source| DataError::query_failed("runtime.arr_instance_create", source).into())
    }

    /// Fetch one ARR instance by id.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::NotFound`] if no row exists for `id`.
    pub async fn get(&self, id: i64) -> RuntimeResult<ArrInstance> {
        let row = sqlx::query("SELECT * FROM arr_instances WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("runtime.arr_instance_get", source))?
            .ok_or(DataError::NotFound { entity: "arr instance" })?;
        from_row(&row)
    }

    /// List every registered ARR instance of `instance_type`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_by_type(&self, instance_type: ArrInstanceType) -> RuntimeResult<Vec<ArrInstance>> {
        let rows = sqlx::query("SELECT * FROM arr_instances WHERE instance_type = ? ORDER BY name")
            .bind(instance_type.as_str())
            .fetch_all(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("runtime.arr_instance_list_by_type", source))?;
        rows.iter().map(from_row).collect()
    }

    /// Delete an ARR instance by id.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::NotFound`] if `id` does not exist.
    pub async fn delete(&self, id: i64) -> RuntimeResult<()> {
        let result = sqlx::query("DELETE FROM arr_instances WHERE id = ?")
            .bind(id)
            .execute(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("runtime.arr_instance_delete", source))?;
        if result.rows_affected() == 0 {
            return Err(DataError::NotFound { entity: "arr instance" }.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> ArrInstanceStore {
        let pool = Pool::connect("sqlite::memory:").await.unwrap();
        sqlx::query(schema(pool.dialect())).execute(pool.any()).await.unwrap();
        ArrInstanceStore::new(pool)
    }

    fn sample(instance_type: ArrInstanceType) -> ArrInstance {
        ArrInstance {
            id: 0,
            instance_type,
            name: format!("{}-main", instance_type.as_str()),
            base_url: "https://arr.example.com/".to_string(),
            api_key_ct: "ct".to_string(),
            basic_username: None,
            basic_password_ct: None,
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips_the_type() {
        let store = store().await;
        let id = store.create(&sample(ArrInstanceType::Sonarr)).await.unwrap();
        let fetched = store.get(id).await.unwrap();
        assert_eq!(fetched.instance_type, ArrInstanceType::Sonarr);
    }

    #[tokio::test]
    async fn list_by_type_is_scoped() {
        let store = store().await;
        store.create(&sample(ArrInstanceType::Sonarr)).await.unwrap();
        store.create(&sample(ArrInstanceType::Radarr)).await.unwrap();
        let sonarr = store.list_by_type(ArrInstanceType::Sonarr).await.unwrap();
        assert_eq!(sonarr.len(), 1);
        assert_eq!(sonarr[0].instance_type, ArrInstanceType::Sonarr);
    }
}
