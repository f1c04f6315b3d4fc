//! Scheduling-tick interval resolution and restart-recovery thresholds.

use std::time::Duration;

/// Platform default tick interval when a rule or job leaves `interval_s`
/// unset: 15 minutes.
pub const DEFAULT_INTERVAL_S: i64 = 15 * 60;

/// How long a run may sit in an active state before restart recovery
/// considers it stuck.
#[must_use]
pub fn stuck_threshold() -> chrono::Duration {
    chrono::Duration::hours(1)
}

/// Resolve a rule or job's configured `interval_s` into a tick period.
///
/// `None` (null) means the platform default; zero means "never fire on the
/// clock, only in response to an external event" and resolves to `None`;
/// negative values are coerced to the default.
#[must_use]
pub fn resolve_tick_interval(interval_s: Option<i64>) -> Option<Duration> {
    match interval_s {
        None => Some(Duration::from_secs(u64::try_from(DEFAULT_INTERVAL_S).unwrap_or(900))),
        Some(0) => None,
        Some(seconds) if seconds < 0 => Some(Duration::from_secs(u64::try_from(DEFAULT_INTERVAL_S).unwrap_or(900))),
        Some(seconds) => Some(Duration::from_secs(u64::try_from(seconds).unwrap_or(900))),
    }
}
