//! Event payload types carried across the platform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier assigned to each event emitted by the platform.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Outcome recorded for a single rule action attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The action performed its side effect (or would have, under dry-run).
    Success,
    /// The action failed and was not applied.
    Failed,
}

/// Typed domain events surfaced across the system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A rule's condition tree matched a torrent during a sweep.
    RuleMatched {
        /// Instance that owns the rule.
        instance_id: i64,
        /// Rule that matched.
        rule_id: i64,
        /// Torrent info-hash that matched.
        hash: String,
    },
    /// An action within a rule's pipeline was attempted against a torrent.
    ActionExecuted {
        /// Instance the action ran against.
        instance_id: i64,
        /// Rule the action belongs to, when triggered by automation.
        rule_id: Option<i64>,
        /// Action kind (`tag`, `category`, `move`, `delete`, ...).
        action: String,
        /// Torrent info-hash the action targeted.
        hash: String,
        /// Whether the action succeeded.
        outcome: ActionOutcome,
    },
    /// A scheduled run transitioned to a new status.
    RunStateChanged {
        /// Identifier of the run.
        run_id: i64,
        /// Owning instance, when the run is instance-scoped.
        instance_id: Option<i64>,
        /// New status string.
        status: String,
    },
    /// A cross-instance transfer transitioned to a new state.
    TransferStateChanged {
        /// Identifier of the transfer.
        transfer_id: i64,
        /// New state string.
        state: String,
    },
    /// A user-visible notification was raised for a subscribed event type.
    NotificationRaised {
        /// Notification event type (`run_failed`, `transfer_failed`, ...).
        event_type: String,
        /// Human-readable summary.
        message: String,
    },
}

impl Event {
    /// Machine-friendly discriminator used by downstream transports.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RuleMatched { .. } => "rule_matched",
            Self::ActionExecuted { .. } => "action_executed",
            Self::RunStateChanged { .. } => "run_state_changed",
            Self::TransferStateChanged { .. } => "transfer_state_changed",
            Self::NotificationRaised { .. } => "notification_raised",
        }
    }
}

/// An event paired with its sequence id and emission time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Monotonic identifier assigned on publish.
    pub id: EventId,
    /// Wall-clock time the event was published.
    pub at: DateTime<Utc>,
    /// The event payload itself.
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_payload() {
        assert_eq!(
            Event::RuleMatched {
                instance_id: 1,
                rule_id: 2,
                hash: "abc".into(),
            }
            .kind(),
            "rule_matched"
        );
        assert_eq!(
            Event::NotificationRaised {
                event_type: "run_failed".into(),
                message: "boom".into(),
            }
            .kind(),
            "notification_raised"
        );
    }
}
