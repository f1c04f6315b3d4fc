//! The process-wide supervisor: one worker per `(instance_id, job_kind)`,
//! boot-time restart recovery, and graceful shutdown of every worker.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use sentrel_actions::{ExternalProgramRunner, QbitClient};
use sentrel_activity::ActivityStore;
use sentrel_events::{Event, EventBus};
use sentrel_model::RunKind;
use sentrel_runtime::{ExternalProgramStore, InstanceStore, RunStore, TrackerRuleStore};

use crate::automation::AutomationRunner;
use crate::error::SchedulerResult;
use crate::retention::{default_policy_for, RetentionRunner};
use crate::snapshot::TorrentSource;
use crate::tick::{stuck_threshold, DEFAULT_INTERVAL_S};
use crate::worker::{spawn, WorkerHandle};

/// Injected capabilities the automation job body needs for every instance.
/// A single set is shared across every spawned automation worker, matching
/// the "process holds a single AEAD key"-style singleton pattern used
/// elsewhere for process-wide shared state.
pub struct AutomationDeps {
    /// Torrent listing capability.
    pub torrent_source: Arc<dyn TorrentSource>,
    /// qBittorrent mutation capability.
    pub qbit: Arc<dyn QbitClient>,
    /// External-program invocation capability.
    pub program_runner: Arc<dyn ExternalProgramRunner>,
}

/// Owns every running `(instance_id, job_kind)` worker for the process.
pub struct Supervisor {
    instances: InstanceStore,
    rules: TrackerRuleStore,
    programs: ExternalProgramStore,
    runs: RunStore,
    activity: ActivityStore,
    events: EventBus,
    automation: AutomationDeps,
    workers: HashMap<(i64, RunKind), WorkerHandle>,
}

impl Supervisor {
    /// Run boot-time restart recovery (flipping stuck/interrupted runs to
    /// `failed` and publishing one [`Event::RunStateChanged`] per flipped
    /// run), then spawn an automation worker and a retention worker per
    /// registered instance.
    ///
    /// # Errors
    ///
    /// Returns an error if listing instances or rules, or recovering
    /// interrupted runs, fails.
    pub async fn boot(
        instances: InstanceStore,
        rules: TrackerRuleStore,
        programs: ExternalProgramStore,
        runs: RunStore,
        activity: ActivityStore,
        events: EventBus,
        automation: AutomationDeps,
    ) -> SchedulerResult<Self> {
        let recovered = runs.recover_after_restart(chrono::Utc::now(), stuck_threshold()).await?;
        for run in &recovered {
            warn!(run_id = run.id, owner_id = run.owner_id, kind = ?run.kind, "recovered a run interrupted by restart");
            let _ = events.publish(Event::RunStateChanged {
                run_id: run.id,
                instance_id: Some(run.owner_id),
                status: run_status_tag(run.status).to_string(),
            });
        }

        let mut supervisor = Self {
            instances,
            rules,
            programs,
            runs,
            activity,
            events,
            automation,
            workers: HashMap::new(),
        };
        supervisor.spawn_all().await?;
        Ok(supervisor)
    }

    async fn spawn_all(&mut self) -> SchedulerResult<()> {
        let instances = self.instances.list().await?;
        for instance in instances {
            self.spawn_automation_worker(instance.id).await?;
            self.spawn_retention_worker(instance.id, RunKind::Scan).await;
        }
        Ok(())
    }

    async fn spawn_automation_worker(&mut self, instance_id: i64) -> SchedulerResult<()> {
        let rules = self.rules.list_enabled_for_instance(instance_id).await?;
        let interval_s = rules
            .iter()
            .filter_map(|rule| rule.interval_s)
            .filter(|seconds| *seconds > 0)
            .min()
            .or(Some(DEFAULT_INTERVAL_S));

        let runner = AutomationRunner::new(
            self.instances.clone(),
            self.rules.clone(),
            self.programs.clone(),
            self.activity.clone(),
            Arc::clone(&self.automation.torrent_source),
            Arc::clone(&self.automation.qbit),
            Arc::clone(&self.automation.program_runner),
        );
        let worker = crate::worker::Worker::new(instance_id, RunKind::Automation, interval_s, self.runs.clone(), Arc::new(runner));
        self.workers.insert((instance_id, RunKind::Automation), spawn(worker));
        info!(instance_id, "spawned automation worker");
        Ok(())
    }

    async fn spawn_retention_worker(&mut self, instance_id: i64, kind: RunKind) {
        let policy = default_policy_for(kind);
        let runner = RetentionRunner::new(self.runs.clone(), policy);
        let worker = crate::worker::Worker::new(instance_id, kind, None, self.runs.clone(), Arc::new(runner));
        self.workers.insert((instance_id, kind), spawn(worker));
        info!(instance_id, kind = ?kind, "spawned retention worker");
    }

    /// Cancel every worker and wait for its tick loop to exit.
    pub async fn shutdown(self) {
        for (_, handle) in self.workers {
            handle.cancel.cancel();
            drop(handle.commands);
            if let Err(err) = handle.join.await {
                warn!(error = %err, "worker task panicked during shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use sentrel_limits::CancelToken;
    use sentrel_model::TorrentView;
    use sentrel_runtime::migrate;
    use sentrel_test_support::{sample_instance, sqlite_pool};

    use crate::snapshot::TorrentSource;

    use super::*;

    struct EmptySource;

    #[async_trait]
    impl TorrentSource for EmptySource {
        async fn list_torrents(&self, _instance_id: i64) -> SchedulerResult<Vec<TorrentView>> {
            Ok(Vec::new())
        }
    }

    struct NoopQbit;

    #[async_trait]
    impl QbitClient for NoopQbit {
        async fn add_tags(&self, _: &[String], _: &[String], _: &mut CancelToken) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
        async fn remove_tags(&self, _: &[String], _: &[String], _: &mut CancelToken) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
        async fn delete_tag(&self, _: &str, _: &mut CancelToken) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
        async fn set_category(&self, _: &[String], _: &str, _: &mut CancelToken) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
        async fn set_location(&self, _: &[String], _: &str, _: &mut CancelToken) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
        async fn set_speed_limits(&self, _: &[String], _: Option<i64>, _: Option<i64>, _: &mut CancelToken) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
        async fn set_share_limits(&self, _: &[String], _: Option<f64>, _: Option<i64>, _: &mut CancelToken) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
        async fn pause(&self, _: &[String], _: &mut CancelToken) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
        async fn resume(&self, _: &[String], _: &mut CancelToken) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
        async fn recheck(&self, _: &[String], _: &mut CancelToken) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
        async fn reannounce(&self, _: &[String], _: &mut CancelToken) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
        async fn delete(&self, _: &[String], _: bool, _: &mut CancelToken) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
    }

    struct NoopProgramRunner;

    #[async_trait]
    impl ExternalProgramRunner for NoopProgramRunner {
        async fn invoke(
            &self,
            _program: &sentrel_model::ExternalProgram,
            _hash: &str,
            _path_mappings: &[sentrel_model::PathMapping],
            _cancel: &mut CancelToken,
        ) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
    }

    fn deps() -> AutomationDeps {
        AutomationDeps {
            torrent_source: Arc::new(EmptySource),
            qbit: Arc::new(NoopQbit),
            program_runner: Arc::new(NoopProgramRunner),
        }
    }

    #[tokio::test]
    async fn boot_recovers_a_stuck_run_and_publishes_an_event() {
        let pool = sqlite_pool().await.unwrap();
        migrate(&pool).await.unwrap();
        sqlx::query(sentrel_activity::schema(pool.dialect())).execute(pool.any()).await.unwrap();

        let instances = InstanceStore::new(pool.clone());
        let rules = TrackerRuleStore::new(pool.clone());
        let programs = ExternalProgramStore::new(pool.clone());
        let runs = RunStore::new(pool.clone());
        let activity = ActivityStore::new(pool);

        let instance_id = instances.create(&sample_instance()).await.unwrap();
        let stuck_start = Utc::now() - Duration::hours(3);
        runs.create_if_no_active(instance_id, RunKind::Automation, "scheduler", stuck_start).await.unwrap();

        let events = EventBus::new();
        let mut stream = events.subscribe(None);

        let supervisor = Supervisor::boot(instances, rules, programs, runs.clone(), activity, events, deps()).await.unwrap();
        // Join every spawned worker before inspecting state so a worker's own
        // instant first tick can't race the assertions below.
        supervisor.shutdown().await;

        let recovered = runs.get_active(instance_id, RunKind::Automation).await.unwrap();
        assert!(recovered.is_none(), "the stuck run should have been completed, not left active");

        use tokio_stream::StreamExt;
        let envelope = stream.next().await.unwrap().unwrap();
        assert_eq!(envelope.event.kind(), "run_state_changed");
    }
}

const fn run_status_tag(status: sentrel_model::RunStatus) -> &'static str {
    use sentrel_model::RunStatus;
    match status {
        RunStatus::Queued => "queued",
        RunStatus::Running => "running",
        RunStatus::Scanning => "scanning",
        RunStatus::PreviewReady => "preview_ready",
        RunStatus::Injecting => "injecting",
        RunStatus::Deleting => "deleting",
        RunStatus::Searching => "searching",
        RunStatus::Completed => "completed",
        RunStatus::Failed => "failed",
        RunStatus::Canceled => "canceled",
    }
}
