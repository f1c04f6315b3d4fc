//! Scheduled-job execution state: [`Run`] and the storage-move [`Transfer`]
//! state machine.

use serde::{Deserialize, Serialize};

/// The kind of scheduled job a [`Run`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    /// Hourly backup rotation.
    Hourly,
    /// Daily backup rotation.
    Daily,
    /// Weekly backup rotation.
    Weekly,
    /// Monthly backup rotation.
    Monthly,
    /// User-triggered run outside the regular schedule.
    Manual,
    /// Directory scan reconciling files on disk against torrents.
    Scan,
    /// Orphan scan.
    Orphan,
    /// Cross-seed search sweep.
    Crossseed,
    /// Automation rule sweep.
    Automation,
}

/// Lifecycle status of a [`Run`].
///
/// The generic shape in the data model is
/// `queued/pending -> running/scanning -> (kind-specific) -> completed/
/// success | failed | canceled`; this enum enumerates every state any kind
/// passes through, and [`Run::is_active`] defines the kind-independent
/// active set used for at-most-one enforcement and restart recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Accepted, not yet picked up by a worker.
    Queued,
    /// Actively executing.
    Running,
    /// Actively scanning (dir/orphan scan kinds).
    Scanning,
    /// A scan produced a preview awaiting user confirmation.
    PreviewReady,
    /// Injecting a cross-seed match into the local client.
    Injecting,
    /// Deleting files or torrents as part of the run.
    Deleting,
    /// Searching remote trackers (cross-seed kind).
    Searching,
    /// Finished without error.
    Completed,
    /// Finished with an error.
    Failed,
    /// Stopped by cancellation.
    Canceled,
}

impl RunStatus {
    /// The statuses considered "in progress" for at-most-one enforcement
    /// and restart recovery, per the data model's *Active set* glossary
    /// entry.
    pub const ACTIVE: &'static [Self] = &[
        Self::Queued,
        Self::Running,
        Self::Scanning,
        Self::PreviewReady,
        Self::Injecting,
        Self::Deleting,
        Self::Searching,
    ];

    /// The subset of [`Self::ACTIVE`] whose side effects may have been
    /// interrupted mid-stream and which are therefore always failed at
    /// boot, regardless of how long they have been running.
    pub const DELETING_FAMILY: &'static [Self] = &[Self::Deleting, Self::Injecting, Self::Searching];

    /// Whether this status is in the active set.
    #[must_use]
    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }

    /// Whether this status belongs to the deleting family that is always
    /// failed at boot.
    #[must_use]
    pub fn is_deleting_family(self) -> bool {
        Self::DELETING_FAMILY.contains(&self)
    }

    /// Whether this status is terminal (no further transitions expected).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }
}

/// A concrete execution of a scheduled job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Opaque identifier assigned on insert.
    pub id: i64,
    /// Owning instance (or other entity) id.
    pub owner_id: i64,
    /// Which job this run belongs to.
    pub kind: RunKind,
    /// Current lifecycle status.
    pub status: RunStatus,
    /// What triggered this run (`"scheduler"`, `"manual"`, a webhook id…).
    pub triggered_by: String,
    /// When the run started executing.
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// When the run reached a terminal status, if it has.
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Kind-specific counters serialized as JSON (rows scanned, matches
    /// found, bytes moved, …).
    pub stats: serde_json::Value,
    /// Error detail, set once the run fails.
    pub error: Option<String>,
}

impl Run {
    /// Whether this run is in the active set.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Apply restart recovery: given `now` and `stuck_threshold`, decide
    /// whether this run should be force-failed, and if so produce the
    /// terminal fields to write.
    ///
    /// Per §4.7: runs in the deleting family are always failed at boot
    /// regardless of age; other active runs are failed only once
    /// `started_at` is older than `stuck_threshold`.
    #[must_use]
    pub fn restart_recovery_outcome(
        &self,
        now: chrono::DateTime<chrono::Utc>,
        stuck_threshold: chrono::Duration,
    ) -> Option<RestartRecoveryOutcome> {
        if !self.is_active() {
            return None;
        }
        let stuck_by_age = now - self.started_at >= stuck_threshold;
        if self.status.is_deleting_family() || stuck_by_age {
            Some(RestartRecoveryOutcome {
                error: "Marked failed after restart".to_string(),
                completed_at: now,
            })
        } else {
            None
        }
    }
}

/// Terminal fields to apply to a [`Run`] recovered at boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartRecoveryOutcome {
    /// Fixed error message recorded on the run.
    pub error: String,
    /// Timestamp recorded as `completed_at`.
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// State of a [`Transfer`] (a torrent move between two qBittorrent
/// instances).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    /// Accepted, not yet started.
    Pending,
    /// Preparing the move (resolving paths, validating destination).
    Preparing,
    /// Creating hardlinks/copies at the destination.
    LinksCreating,
    /// Destination links fully created.
    LinksCreated,
    /// Adding the torrent to the destination instance.
    AddingTorrent,
    /// Torrent successfully added at the destination.
    TorrentAdded,
    /// Removing the torrent from the source instance.
    DeletingSource,
    /// Finished without error.
    Completed,
    /// Finished with an error.
    Failed,
    /// Rolled back after a failure partway through.
    RolledBack,
    /// Stopped by cancellation.
    Cancelled,
}

impl TransferState {
    /// The exactly-four terminal states, forming a single source of truth
    /// in code per the data model.
    pub const TERMINAL: &'static [Self] =
        &[Self::Completed, Self::Failed, Self::RolledBack, Self::Cancelled];

    /// Whether this state is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        Self::TERMINAL.contains(&self)
    }
}

/// A torrent move between two qBittorrent instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    /// Opaque identifier assigned on insert.
    pub id: i64,
    /// Source instance id.
    pub source_instance_id: i64,
    /// Destination instance id.
    pub destination_instance_id: i64,
    /// Infohash of the torrent being moved.
    pub hash: String,
    /// Current lifecycle state.
    pub state: TransferState,
    /// When the transfer started.
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// When the transfer reached a terminal state, if it has.
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Error detail, set once the transfer fails.
    pub error: Option<String>,
}

impl Transfer {
    /// Whether this transfer has reached a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn run_with(status: RunStatus, started_at: chrono::DateTime<chrono::Utc>) -> Run {
        Run {
            id: 1,
            owner_id: 1,
            kind: RunKind::Scan,
            status,
            triggered_by: "manual".to_string(),
            started_at,
            completed_at: None,
            stats: serde_json::json!({}),
            error: None,
        }
    }

    #[test]
    fn active_set_matches_glossary_definition() {
        assert!(RunStatus::Queued.is_active());
        assert!(RunStatus::Scanning.is_active());
        assert!(!RunStatus::Completed.is_active());
        assert!(!RunStatus::Failed.is_active());
        assert!(!RunStatus::Canceled.is_active());
    }

    #[test]
    fn deleting_family_always_fails_at_boot_regardless_of_age() {
        let now = chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let run = run_with(RunStatus::Deleting, now - Duration::seconds(5));
        let outcome = run
            .restart_recovery_outcome(now, Duration::hours(1))
            .expect("deleting-family runs are always recovered");
        assert_eq!(outcome.error, "Marked failed after restart");
        assert_eq!(outcome.completed_at, now);
    }

    #[test]
    fn non_deleting_active_run_recovered_only_past_threshold() {
        let now = chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let fresh = run_with(RunStatus::Running, now - Duration::minutes(1));
        assert!(fresh.restart_recovery_outcome(now, Duration::hours(1)).is_none());

        let stuck = run_with(RunStatus::Running, now - Duration::hours(2));
        assert!(stuck.restart_recovery_outcome(now, Duration::hours(1)).is_some());
    }

    #[test]
    fn terminal_run_is_never_recovered() {
        let now = chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let done = run_with(RunStatus::Completed, now - Duration::days(30));
        assert!(done.restart_recovery_outcome(now, Duration::hours(1)).is_none());
    }

    #[test]
    fn transfer_terminal_states_are_exactly_the_four_named() {
        assert!(TransferState::Completed.is_terminal());
        assert!(TransferState::Failed.is_terminal());
        assert!(TransferState::RolledBack.is_terminal());
        assert!(TransferState::Cancelled.is_terminal());
        assert!(!TransferState::Pending.is_terminal());
        assert!(!TransferState::LinksCreating.is_terminal());
    }
}
