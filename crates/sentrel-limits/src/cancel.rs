//! Cooperative cancellation shared across a worker's suspension points.

use tokio::sync::watch;

/// The write half of a cancellation signal; the scheduler holds one per
/// worker and fires it to request a stop.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

/// The read half of a cancellation signal; every suspension point inside a
/// worker (database call, HTTP call, limiter wait, timer tick) races
/// against this token.
#[derive(Debug, Clone)]
pub struct CancelToken {
    receiver: watch::Receiver<bool>,
}

/// Construct a linked `(handle, token)` pair, not yet cancelled.
#[must_use]
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (sender, receiver) = watch::channel(false);
    (CancelHandle { sender }, CancelToken { receiver })
}

impl CancelHandle {
    /// Request cancellation. Idempotent: firing twice is a no-op the
    /// second time.
    pub fn cancel(&self) {
        let _ = self.sender.send_if_modified(|cancelled| {
            let was_cancelled = *cancelled;
            *cancelled = true;
            !was_cancelled
        });
    }
}

impl CancelToken {
    /// Whether cancellation has already been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once cancellation is requested. Awaiting this alongside a
    /// database call, HTTP call, or limiter wait in a `tokio::select!` is
    /// the standard way a worker observes cancellation at a suspension
    /// point.
    pub async fn cancelled(&mut self) {
        if self.is_cancelled() {
            return;
        }
        // A sender is always held by the paired `CancelHandle` for the
        // lifetime of a worker, so `changed()` only returns `Err` after
        // that handle is dropped - treat that the same as cancellation.
        let _ = self.receiver.changed().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_resolves_after_handle_cancels() {
        let (handle, mut token) = cancel_pair();
        assert!(!token.is_cancelled());
        handle.cancel();
        token.cancelled().await;
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn double_cancel_is_idempotent() {
        let (handle, token) = cancel_pair();
        handle.cancel();
        handle.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cloned_tokens_observe_the_same_cancellation() {
        let (handle, token) = cancel_pair();
        let mut cloned = token.clone();
        handle.cancel();
        cloned.cancelled().await;
        assert!(token.is_cancelled());
    }
}
