//! Migration bootstrap: every store's schema, run idempotently against a
//! fresh or existing database in a fixed order.
//!
//! There is no file-based migration history here: dialect is chosen at
//! connect time (`sqlx::Any` inspects the URL scheme) rather than fixed at
//! build time, so each statement is a `CREATE TABLE IF NOT EXISTS`
//! selected for the connected dialect and applied every boot.

use sentrel_data::{string_pool_schema, Pool};

use crate::error::RuntimeResult;
use crate::{arr_instance, external_program, instance, run, torznab, tracker_rule, transfer};

/// Run every store's schema statement against `pool`.
///
/// # Errors
///
/// Returns an error if any statement fails.
pub async fn migrate(pool: &Pool) -> RuntimeResult<()> {
    let dialect = pool.dialect();
    let statements: Vec<&'static str> = {
        let mut statements = vec![string_pool_schema(dialect), instance::schema(dialect), arr_instance::schema(dialect)];
        statements.extend(torznab::schema(dialect));
        statements.push(external_program::schema(dialect));
        statements.push(tracker_rule::schema(dialect));
        statements.push(run::schema(dialect));
        statements.push(transfer::schema(dialect));
        statements
    };

    for statement in statements {
        sqlx::query(statement)
            .execute(pool.any())
            .await
            .map_err(|source| sentrel_data::DataError::query_failed("runtime.migrate", source))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let pool = Pool::connect("sqlite::memory:").await.unwrap();
        migrate(&pool).await.unwrap();
        migrate(&pool).await.unwrap();
    }
}
