//! Per-instance cross-seed blocklist: infohashes that must never be
//! offered as a match, regardless of how well they score.

use sqlx::Row;

use sentrel_data::{DataError, Dialect, Pool};
use sentrel_model::CrossSeedBlocklistEntry;

use crate::error::CrossSeedResult;

/// Schema statement for the `cross_seed_blocklist` table.
#[must_use]
pub const fn schema(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Sqlite => {
            r"CREATE TABLE IF NOT EXISTS cross_seed_blocklist (
                instance_id INTEGER NOT NULL,
                infohash TEXT NOT NULL,
                note TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (instance_id, infohash)
            )"
        }
        Dialect::Postgres => {
            r"CREATE TABLE IF NOT EXISTS cross_seed_blocklist (
                instance_id BIGINT NOT NULL,
                infohash TEXT NOT NULL,
                note TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (instance_id, infohash)
            )"
        }
    }
}

/// One blocklist lookup result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedLookup {
    /// The normalized infohash that was looked up.
    pub infohash: String,
    /// Whether it is present in the instance's blocklist.
    pub blocked: bool,
}

/// Store over `cross_seed_blocklist`.
#[derive(Clone)]
pub struct CrossSeedBlocklistStore {
    pool: Pool,
}

impl CrossSeedBlocklistStore {
    /// Construct a store bound to `pool`. Does not create the schema;
    /// callers run [`schema`] as part of their migration bootstrap.
    #[must_use]
    pub const fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Insert or refresh a blocklist entry, normalising its infohash.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn insert(&self, entry: &CrossSeedBlocklistEntry) -> CrossSeedResult<()> {
        let infohash = CrossSeedBlocklistEntry::normalize_infohash(&entry.infohash);
        sqlx::query(
            "INSERT INTO cross_seed_blocklist (instance_id, infohash, note) VALUES (?, ?, ?) \
             ON CONFLICT (instance_id, infohash) DO UPDATE SET note = excluded.note",
        )
        .bind(entry.instance_id)
        .bind(infohash)
        .bind(&entry.note)
        .execute(self.pool.any())
        .await
        .map_err(|source| DataError::query_failed("crossseed.blocklist_insert", source))?;
        Ok(())
    }

    /// Look up each of `candidates` against `instance_id`'s blocklist,
    /// normalising every candidate the same way entries are stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_blocked(&self, instance_id: i64, candidates: &[String]) -> CrossSeedResult<Vec<BlockedLookup>> {
        let mut results = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let infohash = CrossSeedBlocklistEntry::normalize_infohash(candidate);
            let row = sqlx::query("SELECT 1 AS hit FROM cross_seed_blocklist WHERE instance_id = ? AND infohash = ?")
                .bind(instance_id)
                .bind(&infohash)
                .fetch_optional(self.pool.any())
                .await
                .map_err(|source| DataError::query_failed("crossseed.find_blocked", source))?;
            results.push(BlockedLookup { infohash, blocked: row.is_some() });
        }
        Ok(results)
    }
}
