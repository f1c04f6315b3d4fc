//! Token-bucket limiter and the per-host registry that shares instances.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tokio::time::sleep;

use crate::cancel::CancelToken;
use crate::error::{LimitsError, LimitsResult};

/// Configuration for one token bucket: `rate_limit` tokens are available
/// per `rate_period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Tokens made available per `rate_period`.
    pub rate_limit: u32,
    /// Replenishment period.
    pub rate_period: Duration,
}

/// A token-bucket rate limiter. Internally scales tokens by
/// [`Self::TOKEN_SCALE`] so that fractional refill amounts (sub-token
/// progress between polls) are not lost to integer truncation.
#[derive(Debug)]
pub struct TokenBucket {
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    config: RateLimitConfig,
    tokens: u128,
    last_refill: Instant,
}

impl TokenBucket {
    const TOKEN_SCALE: u128 = 1_000_000;

    /// Construct a bucket starting at full capacity.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        let capacity = Self::capacity_for(config);
        Self {
            state: Mutex::new(BucketState {
                config,
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    fn capacity_for(config: RateLimitConfig) -> u128 {
        u128::from(config.rate_limit) * Self::TOKEN_SCALE
    }

    /// Acquire one token, waiting for refill if none is available.
    /// Cancellation aborts the wait with [`LimitsError::Cancelled`].
    ///
    /// # Errors
    ///
    /// Returns [`LimitsError::Cancelled`] if `cancel` fires before a token
    /// becomes available.
    pub async fn wait(&self, cancel: &mut CancelToken) -> LimitsResult<()> {
        loop {
            let retry_after = {
                let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                state.refill(Instant::now());
                if state.tokens >= Self::TOKEN_SCALE {
                    state.tokens -= Self::TOKEN_SCALE;
                    return Ok(());
                }
                state.retry_delay()
            };
            if cancel.is_cancelled() {
                return Err(LimitsError::Cancelled);
            }
            tokio::select! {
                () = cancel.cancelled() => return Err(LimitsError::Cancelled),
                () = sleep(retry_after) => {}
            }
        }
    }
}

impl BucketState {
    fn capacity(&self) -> u128 {
        TokenBucket::capacity_for(self.config)
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        if elapsed == Duration::ZERO {
            return;
        }
        let period_micros = self.config.rate_period.as_micros();
        let capacity = self.capacity();
        if period_micros == 0 || capacity == 0 {
            self.tokens = capacity;
            self.last_refill = now;
            return;
        }
        let replenished = capacity.saturating_mul(elapsed.as_micros()) / period_micros;
        if replenished > 0 {
            self.tokens = (self.tokens + replenished).min(capacity);
            self.last_refill = now;
        }
    }

    fn retry_delay(&self) -> Duration {
        let capacity = self.capacity();
        if capacity == 0 {
            return Duration::from_secs(1);
        }
        let period_micros = self.config.rate_period.as_micros();
        if period_micros == 0 {
            return Duration::ZERO;
        }
        let deficit = TokenBucket::TOKEN_SCALE.saturating_sub(self.tokens);
        let needed = deficit.saturating_mul(period_micros);
        let retry_micros = needed.div_ceil(capacity).min(u128::from(u64::MAX));
        Duration::from_micros(u64::try_from(retry_micros).unwrap_or(u64::MAX))
    }
}

/// A process-wide `host -> limiter` map. Every client constructed for the
/// same host must go through [`Self::get_or_create`] so that they share the
/// exact same [`TokenBucket`] instance; different hosts get independent
/// buckets.
#[derive(Default)]
pub struct LimiterRegistry {
    limiters: Mutex<HashMap<String, std::sync::Arc<TokenBucket>>>,
}

impl LimiterRegistry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the shared limiter for `host`, constructing it with `config`
    /// on first use. Subsequent calls for the same host ignore `config` and
    /// return the existing instance, matching the "never construct
    /// per-request limiters" design note.
    #[must_use]
    pub fn get_or_create(&self, host: &str, config: RateLimitConfig) -> std::sync::Arc<TokenBucket> {
        let mut limiters = self.limiters.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        limiters
            .entry(host.to_string())
            .or_insert_with(|| std::sync::Arc::new(TokenBucket::new(config)))
            .clone()
    }
}
