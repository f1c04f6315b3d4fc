//! Exponential backoff for `Transient`-class errors.

use std::time::Duration;

use tokio::time::sleep;

use crate::cancel::CancelToken;

/// Anything exposing whether it is worth retrying. Every per-crate error
/// type's `is_retryable()` satisfies this.
pub trait Retryable {
    /// Whether a call that failed with `self` may succeed if retried.
    fn is_retryable(&self) -> bool;
}

/// Backoff schedule for [`retry_with_backoff`]: delays double after every
/// attempt, starting at `base` and never exceeding `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub base: Duration,
    /// Delay never exceeds this, regardless of attempt count.
    pub max: Duration,
    /// Total attempts, including the first. `attempts=1` never retries.
    pub attempts: u32,
}

impl BackoffConfig {
    /// A config that retries 3 additional times, starting at 500ms and
    /// capping at 30s, matching the default per-endpoint cap.
    #[must_use]
    pub const fn default_endpoint_cap() -> Self {
        Self { base: Duration::from_millis(500), max: Duration::from_secs(30), attempts: 4 }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let scale = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(scale).min(self.max)
    }
}

/// Retry `operation` up to `config.attempts` times while it fails with a
/// retryable error, waiting an exponentially increasing delay between
/// attempts. A cancellation observed on `cancel` aborts the wait and
/// returns the most recent error immediately. Returns the first
/// non-retryable error, or the last error once attempts are exhausted.
pub async fn retry_with_backoff<T, E, F, Fut>(
    config: BackoffConfig,
    cancel: &mut CancelToken,
    mut operation: F,
) -> Result<T, E>
where
    E: Retryable,
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        let outcome = operation().await;
        let error = match outcome {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };
        if !error.is_retryable() || attempt + 1 >= config.attempts || cancel.is_cancelled() {
            return Err(error);
        }
        let delay = config.delay_for(attempt);
        attempt += 1;
        tokio::select! {
            () = cancel.cancelled() => return Err(error),
            () = sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::cancel_pair;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq, Eq)]
    struct Failure(bool);

    impl Retryable for Failure {
        fn is_retryable(&self) -> bool {
            self.0
        }
    }

    fn fast(attempts: u32) -> BackoffConfig {
        BackoffConfig { base: Duration::from_millis(1), max: Duration::from_millis(5), attempts }
    }

    #[tokio::test]
    async fn succeeds_without_retry_when_operation_succeeds_first_try() {
        let (_handle, mut token) = cancel_pair();
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(fast(3), &mut token, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Failure>(42)
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let (_handle, mut token) = cancel_pair();
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(fast(5), &mut token, || async {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            if attempt < 2 { Err(Failure(true)) } else { Ok(attempt) }
        })
        .await;
        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_immediately_on_non_retryable_failure() {
        let (_handle, mut token) = cancel_pair();
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(fast(5), &mut token, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(Failure(false))
        })
        .await;
        assert_eq!(result, Err(Failure(false)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_attempts_exhausted() {
        let (_handle, mut token) = cancel_pair();
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(fast(3), &mut token, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(Failure(true))
        })
        .await;
        assert_eq!(result, Err(Failure(true)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancellation_aborts_the_backoff_wait() {
        let (handle, mut token) = cancel_pair();
        handle.cancel();
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(fast(5), &mut token, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(Failure(true))
        })
        .await;
        assert_eq!(result, Err(Failure(true)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
