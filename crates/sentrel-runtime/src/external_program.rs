//! Store for registered [`ExternalProgram`] invocation targets.

use sqlx::Row;

use sentrel_data::{DataError, Dialect, Pool};
use sentrel_model::{ActionConditions, ExternalProgram, PathMapping};

use crate::error::RuntimeResult;

/// How [`ExternalProgramStore::delete`] handles a program still referenced
/// by a rule's `externalProgram.programId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalProgramDeleteMode {
    /// Fail the delete with [`crate::error::RuntimeError::InUse`] if any
    /// rule still references this program.
    RefuseIfInUse,
    /// Null out the `externalProgram` reference in every referring rule,
    /// then delete the program, all inside one transaction.
    NullReferences,
}

/// Schema statement for the `external_programs` table.
#[must_use]
pub const fn schema(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Sqlite => {
            r"CREATE TABLE IF NOT EXISTS external_programs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                path TEXT NOT NULL,
                args_template TEXT NOT NULL,
                path_mappings TEXT NOT NULL DEFAULT '[]',
                use_terminal INTEGER NOT NULL DEFAULT 0
            )"
        }
        Dialect::Postgres => {
            r"CREATE TABLE IF NOT EXISTS external_programs (
                id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                path TEXT NOT NULL,
                args_template TEXT NOT NULL,
                path_mappings TEXT NOT NULL DEFAULT '[]',
                use_terminal BOOLEAN NOT NULL DEFAULT FALSE
            )"
        }
    }
}

fn from_row(row: &sqlx::any::AnyRow) -> RuntimeResult<ExternalProgram> {
    let mappings_json: String =
        row.try_get("path_mappings").map_err(|source| DataError::query_failed("runtime.external_program_row", source))?;
    let path_mappings: Vec<PathMapping> = serde_json::from_str(&mappings_json).unwrap_or_default();
    Ok(ExternalProgram {
        id: row.try_get("id").map_err(|source| DataError::query_failed("runtime.external_program_row", source))?,
        name: row.try_get("name").map_err(|source| DataError::query_failed("runtime.external_program_row", source))?,
        path: row.try_get("path").map_err(|source| DataError::query_failed("runtime.external_program_row", source))?,
        args_template: row
            .try_get("args_template")
            .map_err(|source| DataError::query_failed("runtime.external_program_row", source))?,
        path_mappings,
        use_terminal: row
            .try_get("use_terminal")
            .map_err(|source| DataError::query_failed("runtime.external_program_row", source))?,
    })
}

/// Store over `external_programs`.
#[derive(Clone)]
pub struct ExternalProgramStore {
    pool: Pool,
}

impl ExternalProgramStore {
    /// Construct a store bound to `pool`. Does not create the schema;
    /// callers run [`schema`] as part of their migration bootstrap.
    #[must_use]
    pub const fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Insert a new program, returning its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`DataError`] if the insert fails.
    pub async fn create(&self, program: &ExternalProgram) -> RuntimeResult<i64> {
        let mappings = serde_json::to_string(&program.path_mappings).unwrap_or_else(|_| "[]".to_string());
        let row = sqlx::query(
            "INSERT INTO external_programs (name, path, args_template, path_mappings, use_terminal) \
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&program.name)
        .bind(&program.path)
        .bind(&program.args_template)
        .bind(mappings)
        .bind(program.use_terminal)
        .fetch_one(self.pool.any())
        .await
        .map_err(|source| DataError::query_failed("runtime.external_program_create", source))?;
        row.try_get::<i64, _>("id")
            .map_err(|source| DataError::query_failed("runtime.external_program_create", source).into())
    }

    /// Fetch one program by id.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::NotFound`] if no row exists for `id`.
    pub async fn get(&self, id: i64) -> RuntimeResult<ExternalProgram> {
        let row = sqlx::query("SELECT * FROM external_programs WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("runtime.external_program_get", source))?
            .ok_or(DataError::NotFound { entity: "external program" })?;
        from_row(&row)
    }

    /// List every registered program, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(&self) -> RuntimeResult<Vec<ExternalProgram>> {
        let rows = sqlx::query("SELECT * FROM external_programs ORDER BY name")
            .fetch_all(self.pool.any())
            .await
            .map_err(|source| DataError::query_failed("runtime.external_program_list", source))?;
        rows.iter().map(from_row).collect()
    }

    /// Delete a program by id, honouring the referring-rule contract per
    /// `mode`. Rules are scanned by deserializing their `conditions`
    /// column rather than with dialect-specific JSON-path SQL, since
    /// `conditions` is stored as plain TEXT under both dialects.
    ///
    /// Runs as a single transaction: the rollback path is exercised on
    /// every early return so a partial update is never committed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::RuntimeError::InUse`] under
    /// [`ExternalProgramDeleteMode::RefuseIfInUse`] when a rule still
    /// references `id`, or [`DataError::NotFound`] if `id` does not exist.
    pub async fn delete(&self, id: i64, mode: ExternalProgramDeleteMode) -> RuntimeResult<()> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query("SELECT id, conditions FROM tracker_rules")
            .fetch_all(&mut *tx)
            .await
            .map_err(|source| DataError::query_failed("runtime.external_program_delete_select", source))?;

        let mut referring = Vec::new();
        for row in &rows {
            let rule_id: i64 = row
                .try_get("id")
                .map_err(|source| DataError::query_failed("runtime.external_program_delete_select", source))?;
            let conditions_json: String = row
                .try_get("conditions")
                .map_err(|source| DataError::query_failed("runtime.external_program_delete_select", source))?;
            let Ok(mut conditions) = serde_json::from_str::<ActionConditions>(&conditions_json) else {
                continue;
            };
            let references = conditions.external_program.as_ref().and_then(|block| block.program_id) == Some(id);
            if references {
                if let Some(block) = conditions.external_program.as_mut() {
                    block.program_id = None;
                }
                referring.push((rule_id, conditions));
            }
        }

        if !referring.is_empty() && matches!(mode, ExternalProgramDeleteMode::RefuseIfInUse) {
            tx.rollback()
                .await
                .map_err(|source| DataError::query_failed("runtime.external_program_delete_rollback", source))?;
            return Err(crate::error::RuntimeError::InUse { entity: "external program", id });
        }

        for (rule_id, conditions) in &referring {
            let json = serde_json::to_string(conditions).unwrap_or_default();
            let result = sqlx::query("UPDATE tracker_rules SET conditions = ? WHERE id = ?")
                .bind(json)
                .bind(rule_id)
                .execute(&mut *tx)
                .await
                .map_err(|source| DataError::query_failed("runtime.external_program_delete_unlink", source));
            if let Err(err) = result {
                tx.rollback()
                    .await
                    .map_err(|source| DataError::query_failed("runtime.external_program_delete_rollback", source))?;
                return Err(err.into());
            }
        }

        let result = sqlx::query("DELETE FROM external_programs WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|source| DataError::query_failed("runtime.external_program_delete", source))?;
        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|source| DataError::query_failed("runtime.external_program_delete_rollback", source))?;
            return Err(DataError::NotFound { entity: "external program" }.into());
        }

        tx.commit().await.map_err(|source| DataError::query_failed("runtime.external_program_delete_commit", source))?;
        Ok(())
    }
}
