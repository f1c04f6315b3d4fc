//! Append-only rule-action activity log entries.

use serde::{Deserialize, Serialize};

/// Outcome of one recorded activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityOutcome {
    /// The action completed (or, for dry-run, would have completed).
    Success,
    /// The action failed.
    Failed,
}

/// Default activity retention window in days, used whenever a caller
/// supplies a negative retention value.
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

/// Resolve a raw retention-days input to the effective value per the
/// retention contract: `0` deletes everything, negative coerces to
/// [`DEFAULT_RETENTION_DAYS`], positive is used as-is.
#[must_use]
pub const fn effective_retention_days(days: i64) -> i64 {
    if days < 0 {
        DEFAULT_RETENTION_DAYS
    } else {
        days
    }
}

/// One row written on every rule action attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Opaque identifier assigned on insert.
    pub id: i64,
    /// Owning instance.
    pub instance_id: i64,
    /// Infohash of the affected torrent.
    pub hash: String,
    /// Display name of the affected torrent at the time of the action.
    pub torrent_name: String,
    /// Primary tracker domain of the affected torrent, if resolvable.
    pub tracker_domain: Option<String>,
    /// Action kind (`"tag"`, `"category"`, `"move"`, `"delete"`, …).
    pub action: String,
    /// Rule that triggered this action, if any.
    pub rule_id: Option<i64>,
    /// Name of the triggering rule at the time of the action.
    pub rule_name: Option<String>,
    /// Outcome of the action.
    pub outcome: ActivityOutcome,
    /// Human-readable reason, e.g. `"dry-run"` or an error summary.
    pub reason: Option<String>,
    /// Structured detail, kind-specific.
    pub details_json: Option<serde_json::Value>,
    /// When the action was attempted.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_retention_days_applies_the_contract() {
        assert_eq!(effective_retention_days(0), 0);
        assert_eq!(effective_retention_days(-1), DEFAULT_RETENTION_DAYS);
        assert_eq!(effective_retention_days(-30), DEFAULT_RETENTION_DAYS);
        assert_eq!(effective_retention_days(30), 30);
    }
}
