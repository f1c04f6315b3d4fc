//! Event bus error primitives.

use crate::payloads::EventId;
use std::fmt::{self, Display, Formatter};

/// The four behavioural error classes, duplicated locally since this crate
/// has no dependency on `sentrel-model`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed or semantically invalid input.
    InvalidInput,
    /// The referenced entity does not exist.
    NotFound,
    /// A unique or check constraint was violated.
    Conflict,
    /// A transport-level failure that may succeed on retry.
    Transient,
}

impl ErrorClass {
    /// Whether this class is worth retrying with backoff.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Transient)
    }
}

/// Error emitted when event publishing fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventBusError {
    /// Failed to deliver an event to the broadcast channel.
    SendFailed {
        /// Identifier assigned to the event.
        event_id: EventId,
        /// Event kind string for filtering in logs.
        event_kind: &'static str,
    },
}

impl EventBusError {
    /// Identifier assigned to the event when the failure occurred.
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        match self {
            Self::SendFailed { event_id, .. } => *event_id,
        }
    }

    /// Event kind string associated with the failed delivery.
    #[must_use]
    pub const fn event_kind(&self) -> &'static str {
        match self {
            Self::SendFailed { event_kind, .. } => event_kind,
        }
    }

    /// `SendFailed` on a broadcast channel means there were zero active
    /// receivers at publish time; classified `Transient` for consistency
    /// with other delivery failures.
    #[must_use]
    pub const fn kind(&self) -> ErrorClass {
        ErrorClass::Transient
    }

    /// Not retried: a channel with no receivers will not gain one by
    /// retrying the same publish.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }
}

impl Display for EventBusError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("event bus send failed")
    }
}

impl std::error::Error for EventBusError {}

/// Result wrapper for event bus operations.
pub type EventBusResult<T> = Result<T, EventBusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_bus_error_exposes_fields() {
        let err = EventBusError::SendFailed {
            event_id: 42,
            event_kind: "run.state_changed",
        };

        assert_eq!(err.event_id(), 42);
        assert_eq!(err.event_kind(), "run.state_changed");
        assert_eq!(err.to_string(), "event bus send failed");
    }
}
