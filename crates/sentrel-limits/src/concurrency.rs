//! Bounded concurrency pools shared by free-space probes and external
//! program invocations, keyed per instance to avoid saturating local I/O.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::cancel::CancelToken;
use crate::error::{LimitsError, LimitsResult};

/// A process-wide `instance_id -> semaphore` map, mirroring
/// [`crate::limiter::LimiterRegistry`]'s shared-instance guarantee but for
/// bounded concurrency instead of rate.
#[derive(Default)]
pub struct ConcurrencyRegistry {
    pools: Mutex<HashMap<i64, Arc<Semaphore>>>,
}

impl ConcurrencyRegistry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the shared pool for `instance_id`, constructing it with
    /// `max_concurrent` permits on first use.
    #[must_use]
    pub fn get_or_create(&self, instance_id: i64, max_concurrent: usize) -> Arc<Semaphore> {
        let mut pools = self.pools.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        pools
            .entry(instance_id)
            .or_insert_with(|| Arc::new(Semaphore::new(max_concurrent.max(1))))
            .clone()
    }

    /// Acquire one permit from the instance's pool, honouring cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`LimitsError::Cancelled`] if `cancel` fires before a permit
    /// becomes available.
    pub async fn acquire(
        &self,
        instance_id: i64,
        max_concurrent: usize,
        cancel: &mut CancelToken,
    ) -> LimitsResult<OwnedSemaphorePermit> {
        let pool = self.get_or_create(instance_id, max_concurrent);
        tokio::select! {
            () = cancel.cancelled() => Err(LimitsError::Cancelled),
            permit = pool.acquire_owned() => permit.map_err(|_| LimitsError::Cancelled),
        }
    }
}
