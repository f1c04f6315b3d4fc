//! Event topic identifiers used across transports.

/// Machine-friendly discriminator for subscriber-side filtering.
#[must_use]
pub const fn event_kind(event: &crate::payloads::Event) -> &'static str {
    event.kind()
}
