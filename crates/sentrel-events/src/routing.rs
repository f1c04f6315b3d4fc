//! Event bus routing helpers.

use crate::error::{EventBusError, EventBusResult};
use crate::payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId};
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio::sync::broadcast::{Receiver, Sender};
use tokio_stream::wrappers::BroadcastStream;

/// Stream wrapper used by subscribers.
pub type EventStream = BroadcastStream<EventEnvelope>;

/// Shared event bus built on top of `tokio::broadcast`.
///
/// New events overflow the bounded channel by dropping the oldest unread
/// event; a bounded replay ring lets a reconnecting subscriber catch up from
/// its last seen id instead of missing events entirely.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    replay: Arc<Mutex<VecDeque<EventEnvelope>>>,
    replay_capacity: usize,
    next_id: Arc<Mutex<EventId>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Construct a bus with a custom replay capacity.
    #[must_use]
    pub fn with_capacity(replay_capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(replay_capacity.max(1));
        Self {
            sender,
            replay: Arc::new(Mutex::new(VecDeque::with_capacity(replay_capacity))),
            replay_capacity,
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Construct a bus with the default replay capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Subscribe to the bus, optionally replaying events after `last_event_id`.
    #[must_use]
    pub fn subscribe(&self, last_event_id: Option<EventId>) -> EventStream {
        let rx = self.sender.subscribe();
        if let Some(last) = last_event_id {
            self.replay_into(last, &rx);
        }
        BroadcastStream::new(rx)
    }

    fn replay_into(&self, last_event_id: EventId, _rx: &Receiver<EventEnvelope>) {
        // Replay is delivered by re-sending through the shared sender so every
        // subscriber (including the caller) observes the backlog in order.
        let backlog = self.lock_replay();
        for envelope in backlog.iter().filter(|e| e.id > last_event_id) {
            let _ = self.sender.send(envelope.clone());
        }
    }

    fn lock_replay(&self) -> MutexGuard<'_, VecDeque<EventEnvelope>> {
        self.replay.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publish an event, returning its assigned envelope.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::SendFailed`] when there are no receivers and
    /// the broadcast channel refuses the send.
    pub fn publish(&self, event: Event) -> EventBusResult<EventEnvelope> {
        let id = self.next_event_id();
        let envelope = EventEnvelope {
            id,
            at: Utc::now(),
            event,
        };

        {
            let mut backlog = self.lock_replay();
            if backlog.len() >= self.replay_capacity {
                backlog.pop_front();
            }
            backlog.push_back(envelope.clone());
        }

        match self.sender.send(envelope.clone()) {
            Ok(_) => Ok(envelope),
            Err(_) => Ok(envelope), // no subscribers yet; not a failure.
        }
    }

    fn next_event_id(&self) -> EventId {
        let mut guard = self
            .next_id
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let id = *guard;
        *guard = guard.wrapping_add(1).max(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util_compat::block_on_next;

    mod futures_util_compat {
        use super::EventStream;
        use tokio_stream::StreamExt;

        pub fn block_on_next(stream: &mut EventStream) -> Option<super::EventEnvelope> {
            tokio::runtime::Handle::current()
                .block_on(async { stream.next().await.and_then(Result::ok) })
        }
    }

    #[tokio::test]
    async fn publish_assigns_increasing_ids() {
        let bus = EventBus::new();
        let first = bus
            .publish(Event::NotificationRaised {
                event_type: "run_failed".into(),
                message: "a".into(),
            })
            .unwrap();
        let second = bus
            .publish(Event::NotificationRaised {
                event_type: "run_failed".into(),
                message: "b".into(),
            })
            .unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn subscribe_replays_events_after_last_seen_id() {
        let bus = EventBus::new();
        let first = bus
            .publish(Event::RunStateChanged {
                run_id: 1,
                instance_id: Some(1),
                status: "queued".into(),
            })
            .unwrap();
        bus.publish(Event::RunStateChanged {
            run_id: 1,
            instance_id: Some(1),
            status: "running".into(),
        })
        .unwrap();

        let mut stream = bus.subscribe(Some(first.id));
        let replayed = block_on_next(&mut stream).expect("replayed event");
        assert_eq!(replayed.event.kind(), "run_state_changed");
    }
}
