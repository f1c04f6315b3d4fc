#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Typed event bus for the sentrel automation control plane.
//!
//! The bus provides a typed event enum, sequential identifiers, and support
//! for replaying recent events when subscribers reconnect. Internally it
//! uses `tokio::broadcast` with a bounded buffer; when the channel overflows
//! the oldest events are dropped, matching the desired backpressure
//! behaviour described for the notification shipper collaborator.

pub mod error;
pub mod payloads;
pub mod routing;
pub mod topics;

pub use error::{ErrorClass, EventBusError, EventBusResult};
pub use payloads::{ActionOutcome, Event, EventEnvelope, EventId, DEFAULT_REPLAY_CAPACITY};
pub use routing::{EventBus, EventStream};
pub use topics::event_kind;
