//! A single `(owner_id, job_kind)` worker: a tick loop that claims a run,
//! executes its job body, and records the terminal state, cooperatively
//! cancellable between ticks and mid-run.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use sentrel_limits::CancelToken;
use sentrel_model::RunKind;
use sentrel_runtime::RunStore;

use crate::job::{JobContext, JobRunner};
use crate::tick::resolve_tick_interval;

/// Command sent to a running worker from the supervisor.
pub enum WorkerCommand {
    /// Run the job body once, regardless of the tick clock (an externally
    /// triggered run, or a manual kick from an operator).
    RunNow,
}

/// Drives one `(owner_id, kind)` worker's tick loop until its command
/// channel closes or its cancellation token fires.
pub struct Worker {
    owner_id: i64,
    kind: RunKind,
    interval_s: Option<i64>,
    runs: RunStore,
    job: Arc<dyn JobRunner>,
}

impl Worker {
    /// Construct a worker for `(owner_id, kind)`, ticking at `interval_s`
    /// (resolved per the null/0/negative rules in [`resolve_tick_interval`]).
    #[must_use]
    pub fn new(owner_id: i64, kind: RunKind, interval_s: Option<i64>, runs: RunStore, job: Arc<dyn JobRunner>) -> Self {
        Self { owner_id, kind, interval_s, runs, job }
    }

    /// Run the tick loop until `commands` closes or `cancel` fires.
    ///
    /// Mirrors the supervisor's command-channel-plus-timer `select!` shape:
    /// whichever fires first is handled, and a closed channel ends the
    /// loop cleanly. A job body failure is recorded on the run and logged;
    /// it never tears down the worker itself.
    pub async fn run(mut self, mut commands: tokio::sync::mpsc::Receiver<WorkerCommand>, mut cancel: CancelToken) {
        let Some(period) = resolve_tick_interval(self.interval_s) else {
            info!(owner_id = self.owner_id, kind = ?self.kind, "worker has no clock interval, waiting for external triggers only");
            loop {
                tokio::select! {
                    command = commands.recv() => {
                        match command {
                            Some(WorkerCommand::RunNow) => self.tick(&mut cancel).await,
                            None => break,
                        }
                    }
                    () = cancel.cancelled() => break,
                }
            }
            return;
        };

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(WorkerCommand::RunNow) => self.tick(&mut cancel).await,
                        None => break,
                    }
                }
                _ = ticker.tick() => self.tick(&mut cancel).await,
                () = cancel.cancelled() => break,
            }
        }
    }

    async fn tick(&mut self, cancel: &mut CancelToken) {
        let now = Utc::now();
        let claimed = self.runs.create_if_no_active(self.owner_id, self.kind, "scheduler", now).await;
        let run_id = match claimed {
            Ok(Some(run_id)) => run_id,
            Ok(None) => {
                debug!(owner_id = self.owner_id, kind = ?self.kind, "skipping tick, a run is already active");
                return;
            }
            Err(err) => {
                warn!(owner_id = self.owner_id, kind = ?self.kind, error = %err, "failed to claim a run for this tick");
                return;
            }
        };

        let ctx = JobContext { owner_id: self.owner_id, kind: self.kind, run_id, now };
        let outcome = self.job.run(&ctx, cancel).await;
        let completed_at = Utc::now();

        let result = match outcome {
            Ok(stats) => {
                if let Err(err) = self.runs.update_status(run_id, sentrel_model::RunStatus::Completed, &stats).await {
                    warn!(run_id, error = %err, "failed to record job stats before completion");
                }
                self.runs.complete(run_id, completed_at, None).await
            }
            Err(err) if cancel.is_cancelled() => {
                info!(run_id, owner_id = self.owner_id, kind = ?self.kind, error = %err, "run canceled");
                self.runs.complete(run_id, completed_at, Some("canceled")).await
            }
            Err(err) => {
                warn!(run_id, owner_id = self.owner_id, kind = ?self.kind, error = %err, "job body failed");
                self.runs.complete(run_id, completed_at, Some(&err.to_string())).await
            }
        };

        if let Err(err) = result {
            warn!(run_id, error = %err, "failed to record run completion");
        }
    }
}

/// A handle a supervisor keeps for a spawned worker: its command sender
/// and cancellation trigger, plus the join handle for graceful shutdown.
pub struct WorkerHandle {
    /// Sends commands to the worker's tick loop.
    pub commands: tokio::sync::mpsc::Sender<WorkerCommand>,
    /// Cancels the worker's current and future ticks.
    pub cancel: sentrel_limits::CancelHandle,
    /// Completes once the worker's tick loop exits.
    pub join: tokio::task::JoinHandle<()>,
}

/// Spawn `worker`'s tick loop as a background task, returning a handle the
/// supervisor uses to command and later shut it down.
#[must_use]
pub fn spawn(worker: Worker) -> WorkerHandle {
    let (tx, rx) = tokio::sync::mpsc::channel(8);
    let (cancel_handle, cancel_token) = sentrel_limits::cancel_pair();
    let join = tokio::spawn(async move {
        worker.run(rx, cancel_token).await;
    });
    WorkerHandle { commands: tx, cancel: cancel_handle, join }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use sentrel_limits::cancel_pair;
    use sentrel_runtime::migrate;
    use sentrel_test_support::sqlite_pool;

    use super::*;

    struct CountingJob {
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl JobRunner for CountingJob {
        async fn run(&self, _ctx: &JobContext, _cancel: &mut CancelToken) -> crate::error::SchedulerResult<serde_json::Value> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::json!({}))
        }
    }

    #[tokio::test]
    async fn run_now_claims_and_completes_a_run() {
        let pool = sqlite_pool().await.unwrap();
        migrate(&pool).await.unwrap();
        let runs = RunStore::new(pool);
        let counter = Arc::new(AtomicUsize::new(0));
        let job = Arc::new(CountingJob { runs: Arc::clone(&counter) });
        let worker = Worker::new(1, RunKind::Automation, Some(0), runs.clone(), job);

        let (tx, rx) = tokio::sync::mpsc::channel(8);
        let (cancel_handle, cancel_token) = cancel_pair();
        let handle = tokio::spawn(worker.run(rx, cancel_token));

        tx.send(WorkerCommand::RunNow).await.unwrap();
        drop(tx);
        handle.await.unwrap();
        cancel_handle.cancel();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(runs.get_active(1, RunKind::Automation).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn a_tick_is_skipped_while_a_run_is_already_active() {
        let pool = sqlite_pool().await.unwrap();
        migrate(&pool).await.unwrap();
        let runs = RunStore::new(pool);
        runs.create_if_no_active(1, RunKind::Automation, "scheduler", Utc::now()).await.unwrap();

        let counter = Arc::new(AtomicUsize::new(0));
        let job = Arc::new(CountingJob { runs: Arc::clone(&counter) });
        let mut worker = Worker::new(1, RunKind::Automation, Some(0), runs, job);
        let (_handle, mut cancel) = cancel_pair();

        worker.tick(&mut cancel).await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
