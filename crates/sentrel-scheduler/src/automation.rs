//! The automation job body: for one instance, snapshot its torrents, load
//! every enabled rule in sort order, and run each rule's action pipeline
//! against the torrents whose tracker domain matches the rule's pattern.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use sentrel_actions::pipeline::{run_rule, PipelineContext};
use sentrel_actions::{ExternalProgramRunner, QbitClient};
use sentrel_activity::ActivityStore;
use sentrel_limits::CancelToken;
use sentrel_model::TorrentView;
use sentrel_rules::RegexCache;
use sentrel_runtime::{ExternalProgramStore, InstanceStore, TrackerRuleStore};

use crate::error::{SchedulerError, SchedulerResult};
use crate::job::{JobContext, JobRunner};
use crate::snapshot::TorrentSource;

/// Runs the automation sweep for one qBittorrent instance: every enabled
/// rule, in ascending `sort_order`, applied to the subset of the
/// instance's current torrents whose tracker matches the rule's pattern.
pub struct AutomationRunner {
    instances: InstanceStore,
    rules: TrackerRuleStore,
    programs: ExternalProgramStore,
    activity: ActivityStore,
    torrent_source: Arc<dyn TorrentSource>,
    qbit: Arc<dyn QbitClient>,
    program_runner: Arc<dyn ExternalProgramRunner>,
    regex_cache: RegexCache,
}

impl AutomationRunner {
    /// Construct a runner over the given stores and injected capabilities.
    #[must_use]
    pub fn new(
        instances: InstanceStore,
        rules: TrackerRuleStore,
        programs: ExternalProgramStore,
        activity: ActivityStore,
        torrent_source: Arc<dyn TorrentSource>,
        qbit: Arc<dyn QbitClient>,
        program_runner: Arc<dyn ExternalProgramRunner>,
    ) -> Self {
        Self {
            instances,
            rules,
            programs,
            activity,
            torrent_source,
            qbit,
            program_runner,
            regex_cache: RegexCache::new(),
        }
    }

    fn matching_views<'a>(rule: &sentrel_model::TrackerRule, views: &'a [TorrentView]) -> Vec<&'a TorrentView> {
        let domains = rule.tracker_domains();
        if domains.is_empty() {
            return views.iter().collect();
        }
        views.iter().filter(|view| domains.contains(&view.tracker.as_str())).collect()
    }
}

#[async_trait]
impl JobRunner for AutomationRunner {
    async fn run(&self, ctx: &JobContext, cancel: &mut CancelToken) -> SchedulerResult<serde_json::Value> {
        let instance = self.instances.get(ctx.owner_id).await?;
        let rules = self.rules.list_enabled_for_instance(ctx.owner_id).await?;
        let programs: HashMap<i64, sentrel_model::ExternalProgram> =
            self.programs.list().await?.into_iter().map(|program| (program.id, program)).collect();
        let views = self.torrent_source.list_torrents(ctx.owner_id).await?;

        let mut rules_applied = 0u64;
        let mut torrents_matched = 0u64;

        for rule in &rules {
            if cancel.is_cancelled() {
                break;
            }
            let matching: Vec<TorrentView> = Self::matching_views(rule, &views).into_iter().cloned().collect();
            if matching.is_empty() {
                continue;
            }

            let pipeline_ctx = PipelineContext {
                instance: &instance,
                rule,
                qbit: self.qbit.as_ref(),
                program_runner: self.program_runner.as_ref(),
                activity: &self.activity,
                programs: &programs,
                regex_cache: &self.regex_cache,
                sibling_index: None,
                free_space_probe: None,
                free_space_path: None,
                now: ctx.now,
            };

            run_rule(&pipeline_ctx, &matching, cancel).await.map_err(SchedulerError::Actions)?;
            rules_applied += 1;
            torrents_matched += u64::try_from(matching.len()).unwrap_or(u64::MAX);
        }

        Ok(json!({
            "rules_applied": rules_applied,
            "torrents_seen": views.len(),
            "torrents_matched": torrents_matched,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;

    use sentrel_actions::ExternalProgramRunner;
    use sentrel_limits::cancel_pair;
    use sentrel_model::{ActionConditions, ExternalProgram, PathMapping, SimpleAction, TrackerRule};
    use sentrel_runtime::migrate;
    use sentrel_test_support::{sample_instance, sample_torrent_view, sqlite_pool};

    use super::*;

    #[derive(Default, Clone)]
    struct RecordingClient {
        calls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl QbitClient for RecordingClient {
        async fn add_tags(&self, _hashes: &[String], _tags: &[String], _cancel: &mut sentrel_limits::CancelToken) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
        async fn remove_tags(&self, _hashes: &[String], _tags: &[String], _cancel: &mut sentrel_limits::CancelToken) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
        async fn delete_tag(&self, _tag: &str, _cancel: &mut sentrel_limits::CancelToken) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
        async fn set_category(&self, _hashes: &[String], _category: &str, _cancel: &mut sentrel_limits::CancelToken) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
        async fn set_location(&self, _hashes: &[String], _path: &str, _cancel: &mut sentrel_limits::CancelToken) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
        async fn set_speed_limits(
            &self,
            _hashes: &[String],
            _upload_bytes_s: Option<i64>,
            _download_bytes_s: Option<i64>,
            _cancel: &mut sentrel_limits::CancelToken,
        ) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
        async fn set_share_limits(
            &self,
            _hashes: &[String],
            _ratio_limit: Option<f64>,
            _seeding_time_minutes: Option<i64>,
            _cancel: &mut sentrel_limits::CancelToken,
        ) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
        async fn pause(&self, hashes: &[String], _cancel: &mut sentrel_limits::CancelToken) -> sentrel_actions::ActionsResult<()> {
            self.calls.lock().unwrap().push(format!("pause:{}", hashes.join(",")));
            Ok(())
        }
        async fn resume(&self, _hashes: &[String], _cancel: &mut sentrel_limits::CancelToken) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
        async fn recheck(&self, _hashes: &[String], _cancel: &mut sentrel_limits::CancelToken) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
        async fn reannounce(&self, _hashes: &[String], _cancel: &mut sentrel_limits::CancelToken) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
        async fn delete(&self, _hashes: &[String], _delete_files: bool, _cancel: &mut sentrel_limits::CancelToken) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
    }

    struct NoopProgramRunner;

    #[async_trait]
    impl ExternalProgramRunner for NoopProgramRunner {
        async fn invoke(
            &self,
            _program: &ExternalProgram,
            _hash: &str,
            _path_mappings: &[PathMapping],
            _cancel: &mut sentrel_limits::CancelToken,
        ) -> sentrel_actions::ActionsResult<()> {
            Ok(())
        }
    }

    struct FixedSource {
        views: Vec<TorrentView>,
    }

    #[async_trait]
    impl TorrentSource for FixedSource {
        async fn list_torrents(&self, _instance_id: i64) -> SchedulerResult<Vec<TorrentView>> {
            Ok(self.views.clone())
        }
    }

    async fn activity_store() -> ActivityStore {
        let pool = sqlite_pool().await.unwrap();
        sqlx::query(sentrel_activity::schema(pool.dialect())).execute(pool.any()).await.unwrap();
        ActivityStore::new(pool)
    }

    fn pause_rule(tracker_pattern: &str) -> TrackerRule {
        TrackerRule {
            id: 1,
            instance_id: 1,
            name: "rule".to_string(),
            tracker_pattern: tracker_pattern.to_string(),
            conditions: ActionConditions { pause: Some(SimpleAction { enabled: true, condition: None }), ..ActionConditions::default() },
            enabled: true,
            dry_run: false,
            sort_order: 0,
            interval_s: None,
            free_space_source: None,
        }
    }

    #[tokio::test]
    async fn only_torrents_matching_the_rules_tracker_are_evaluated() {
        let pool = sqlite_pool().await.unwrap();
        migrate(&pool).await.unwrap();
        let instances = InstanceStore::new(pool.clone());
        let rules = TrackerRuleStore::new(pool.clone());
        let programs = ExternalProgramStore::new(pool.clone());
        let activity = activity_store().await;

        let instance = sample_instance();
        let instance_id = instances.create(&instance).await.unwrap();
        rules.create(&pause_rule("tracker.example")).await.unwrap();

        let mut matching = sample_torrent_view();
        matching.hash = "hash-match".to_string();
        matching.tracker = "tracker.example".to_string();
        let mut other = sample_torrent_view();
        other.hash = "hash-other".to_string();
        other.tracker = "other.example".to_string();

        let client = RecordingClient::default();
        let runner = AutomationRunner::new(
            instances,
            rules,
            programs,
            activity,
            Arc::new(FixedSource { views: vec![matching, other] }),
            Arc::new(client.clone()),
            Arc::new(NoopProgramRunner),
        );

        let ctx = JobContext { owner_id: instance_id, kind: sentrel_model::RunKind::Automation, run_id: 1, now: Utc::now() };
        let (_handle, mut cancel) = cancel_pair();
        let stats = runner.run(&ctx, &mut cancel).await.unwrap();

        assert_eq!(stats["torrents_matched"], 1);
        assert_eq!(client.calls.lock().unwrap().as_slice(), ["pause:hash-match"]);
    }

    #[tokio::test]
    async fn a_rule_with_no_matching_torrents_is_skipped_without_error() {
        let pool = sqlite_pool().await.unwrap();
        migrate(&pool).await.unwrap();
        let instances = InstanceStore::new(pool.clone());
        let rules = TrackerRuleStore::new(pool.clone());
        let programs = ExternalProgramStore::new(pool.clone());
        let activity = activity_store().await;

        let instance_id = instances.create(&sample_instance()).await.unwrap();
        rules.create(&pause_rule("tracker.example")).await.unwrap();

        let mut other = sample_torrent_view();
        other.tracker = "other.example".to_string();

        let client = RecordingClient::default();
        let runner = AutomationRunner::new(
            instances,
            rules,
            programs,
            activity,
            Arc::new(FixedSource { views: vec![other] }),
            Arc::new(client.clone()),
            Arc::new(NoopProgramRunner),
        );

        let ctx = JobContext { owner_id: instance_id, kind: sentrel_model::RunKind::Automation, run_id: 1, now: Utc::now() };
        let (_handle, mut cancel) = cancel_pair();
        let stats = runner.run(&ctx, &mut cancel).await.unwrap();

        assert_eq!(stats["rules_applied"], 0);
        assert!(client.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn matching_views_treats_an_empty_pattern_as_matching_everything() {
        let mut rule = pause_rule("");
        rule.tracker_pattern = String::new();
        let views = vec![sample_torrent_view()];
        assert_eq!(AutomationRunner::matching_views(&rule, &views).len(), 1);
    }

    #[test]
    fn matching_views_honors_multiple_comma_separated_domains() {
        let rule = pause_rule("a.example,b.example");
        let mut a = sample_torrent_view();
        a.tracker = "a.example".to_string();
        let mut c = sample_torrent_view();
        c.tracker = "c.example".to_string();
        let views = vec![a, c];
        assert_eq!(AutomationRunner::matching_views(&rule, &views).len(), 1);
    }
}
