//! Orchestrates one rule's action blocks against a batch of torrents in
//! the fixed order the data model specifies: tags, category, move,
//! speed limits, share limits, recheck, reannounce, pause/resume,
//! external program, delete.

use chrono::{DateTime, Utc};

use sentrel_activity::ActivityStore;
use sentrel_limits::CancelToken;
use sentrel_model::{ActivityEntry, ActivityOutcome, ExternalProgram, Instance, RuleCondition, TorrentView, TrackerRule};
use sentrel_rules::{evaluate, EvaluationContext, FreeSpaceProbe, RegexCache, SiblingIndex};
use std::collections::HashMap;

use crate::actions;
use crate::capability::{ExternalProgramRunner, QbitClient};
use crate::error::ActionsResult;

/// Everything one rule's action pipeline needs beyond the torrent batch
/// itself.
pub struct PipelineContext<'a> {
    /// Instance owning `rule` and every torrent in the batch.
    pub instance: &'a Instance,
    /// The rule being applied.
    pub rule: &'a TrackerRule,
    /// qBittorrent capability adapter.
    pub qbit: &'a dyn QbitClient,
    /// External-program invocation adapter.
    pub program_runner: &'a dyn ExternalProgramRunner,
    /// Activity log sink.
    pub activity: &'a ActivityStore,
    /// Registered external programs, keyed by id, for `externalProgram`
    /// resolution.
    pub programs: &'a HashMap<i64, ExternalProgram>,
    /// Shared compiled-regex cache for condition evaluation.
    pub regex_cache: &'a RegexCache,
    /// Sibling category index for `EXISTS_IN`/`CONTAINS_IN` leaves.
    pub sibling_index: Option<&'a dyn SiblingIndex>,
    /// Filesystem probe for `FREE_SPACE` leaves under `FreeSpaceSource::Path`.
    pub free_space_probe: Option<&'a dyn FreeSpaceProbe>,
    /// Path to probe when the rule's free-space source is `Path`.
    pub free_space_path: Option<&'a str>,
    /// Wall-clock time used for condition evaluation and activity
    /// timestamps.
    pub now: DateTime<Utc>,
}

impl PipelineContext<'_> {
    pub(crate) fn eval_ctx(&self) -> EvaluationContext<'_> {
        EvaluationContext {
            now: self.now,
            regex_cache: self.regex_cache,
            sibling_index: self.sibling_index,
            free_space_probe: self.free_space_probe,
            free_space_source: self.rule.free_space_source,
            free_space_path: self.free_space_path,
        }
    }

    /// Whether `condition` matches `view`, treating an absent condition
    /// as an unconditional match.
    pub(crate) fn condition_matches(&self, view: &TorrentView, condition: &Option<RuleCondition>) -> bool {
        match condition {
            None => true,
            Some(condition) => evaluate(condition, view, &self.eval_ctx()).matched,
        }
    }

    /// Append one activity row. A write failure here is surfaced to the
    /// caller but never rolls back the action it is logging; per-action
    /// functions call this after the capability call already returned.
    pub(crate) async fn log(
        &self,
        view: &TorrentView,
        action: &str,
        outcome: ActivityOutcome,
        reason: Option<String>,
        details: Option<serde_json::Value>,
    ) -> ActionsResult<()> {
        self.activity
            .record(&ActivityEntry {
                id: 0,
                instance_id: self.instance.id,
                hash: view.hash.clone(),
                torrent_name: view.name.clone(),
                tracker_domain: (!view.tracker.is_empty()).then(|| view.tracker.clone()),
                action: action.to_string(),
                rule_id: Some(self.rule.id),
                rule_name: Some(self.rule.name.clone()),
                outcome,
                reason,
                details_json: details,
                created_at: self.now,
            })
            .await?;
        Ok(())
    }

    /// Whether this action's side effects should be suppressed and
    /// logged as `outcome=success, reason=dry-run` instead.
    pub(crate) const fn dry_run(&self) -> bool {
        self.rule.dry_run
    }
}

/// Run every enabled action block of `ctx.rule` against `views`, in the
/// fixed order the data model specifies. `views` is the full set of
/// torrents in the rule's tracker scope, not pre-filtered by any action
/// block's own `condition` - that filtering happens per block, since
/// `tags` full mode needs to see non-matching torrents to reverse a
/// previous tag application.
///
/// # Errors
///
/// Returns the first error raised while writing an activity row or
/// invoking a capability. One action block failing does not stop later
/// blocks from running.
pub async fn run_rule(ctx: &PipelineContext<'_>, views: &[TorrentView], cancel: &mut CancelToken) -> ActionsResult<()> {
    let conditions = &ctx.rule.conditions;

    if let Some(action) = &conditions.tags {
        actions::apply_tags(ctx, views, action, cancel).await?;
    }
    if let Some(action) = &conditions.category {
        actions::apply_category(ctx, views, action, cancel).await?;
    }
    if let Some(action) = &conditions.move_action {
        actions::apply_move(ctx, views, action, cancel).await?;
    }
    if let Some(action) = &conditions.speed_limits {
        actions::apply_speed_limits(ctx, views, action, cancel).await?;
    }
    if let Some(action) = &conditions.share_limits {
        actions::apply_share_limits(ctx, views, action, cancel).await?;
    }
    if let Some(action) = &conditions.recheck {
        actions::apply_simple(ctx, views, action, actions::SimpleKind::Recheck, cancel).await?;
    }
    if let Some(action) = &conditions.reannounce {
        actions::apply_simple(ctx, views, action, actions::SimpleKind::Reannounce, cancel).await?;
    }
    if let Some(action) = &conditions.pause {
        actions::apply_simple(ctx, views, action, actions::SimpleKind::Pause, cancel).await?;
    }
    if let Some(action) = &conditions.resume {
        actions::apply_simple(ctx, views, action, actions::SimpleKind::Resume, cancel).await?;
    }
    if let Some(action) = &conditions.external_program {
        actions::apply_external_program(ctx, views, action, cancel).await?;
    }
    if let Some(action) = &conditions.delete {
        actions::apply_delete(ctx, views, action, cancel).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;

    use sentrel_activity::{schema, ActivityStore};
    use sentrel_data::Pool;
    use sentrel_limits::cancel_pair;
    use sentrel_model::{
        ActionConditions, AtomicScope, CategoryAction, DeleteAction, DeleteMode, ExternalProgram,
        Field, Grouping, GroupingGroup, HardlinkScope, MoveAction, Operator, PathMapping,
        RuleCondition, TagMode, TagsAction, TrackerRule,
    };
    use sentrel_rules::RegexCache;
    use sentrel_test_support::{sample_instance, sample_torrent_view};

    use super::*;

    #[derive(Default, Clone)]
    struct RecordingClient {
        calls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl QbitClient for RecordingClient {
        async fn add_tags(&self, hashes: &[String], tags: &[String], _cancel: &mut CancelToken) -> ActionsResult<()> {
            self.calls.lock().unwrap().push(format!("add_tags:{}:{}", hashes.join(","), tags.join(",")));
            Ok(())
        }
        async fn remove_tags(&self, hashes: &[String], tags: &[String], _cancel: &mut CancelToken) -> ActionsResult<()> {
            self.calls.lock().unwrap().push(format!("remove_tags:{}:{}", hashes.join(","), tags.join(",")));
            Ok(())
        }
        async fn delete_tag(&self, tag: &str, _cancel: &mut CancelToken) -> ActionsResult<()> {
            self.calls.lock().unwrap().push(format!("delete_tag:{tag}"));
            Ok(())
        }
        async fn set_category(&self, hashes: &[String], category: &str, _cancel: &mut CancelToken) -> ActionsResult<()> {
            self.calls.lock().unwrap().push(format!("set_category:{}:{category}", hashes.join(",")));
            Ok(())
        }
        async fn set_location(&self, hashes: &[String], path: &str, _cancel: &mut CancelToken) -> ActionsResult<()> {
            self.calls.lock().unwrap().push(format!("set_location:{}:{path}", hashes.join(",")));
            Ok(())
        }
        async fn set_speed_limits(
            &self,
            hashes: &[String],
            _upload_bytes_s: Option<i64>,
            _download_bytes_s: Option<i64>,
            _cancel: &mut CancelToken,
        ) -> ActionsResult<()> {
            self.calls.lock().unwrap().push(format!("set_speed_limits:{}", hashes.join(",")));
            Ok(())
        }
        async fn set_share_limits(
            &self,
            hashes: &[String],
            _ratio_limit: Option<f64>,
            _seeding_time_minutes: Option<i64>,
            _cancel: &mut CancelToken,
        ) -> ActionsResult<()> {
            self.calls.lock().unwrap().push(format!("set_share_limits:{}", hashes.join(",")));
            Ok(())
        }
        async fn pause(&self, hashes: &[String], _cancel: &mut CancelToken) -> ActionsResult<()> {
            self.calls.lock().unwrap().push(format!("pause:{}", hashes.join(",")));
            Ok(())
        }
        async fn resume(&self, hashes: &[String], _cancel: &mut CancelToken) -> ActionsResult<()> {
            self.calls.lock().unwrap().push(format!("resume:{}", hashes.join(",")));
            Ok(())
        }
        async fn recheck(&self, hashes: &[String], _cancel: &mut CancelToken) -> ActionsResult<()> {
            self.calls.lock().unwrap().push(format!("recheck:{}", hashes.join(",")));
            Ok(())
        }
        async fn reannounce(&self, hashes: &[String], _cancel: &mut CancelToken) -> ActionsResult<()> {
            self.calls.lock().unwrap().push(format!("reannounce:{}", hashes.join(",")));
            Ok(())
        }
        async fn delete(&self, hashes: &[String], delete_files: bool, _cancel: &mut CancelToken) -> ActionsResult<()> {
            self.calls.lock().unwrap().push(format!("delete:{}:{delete_files}", hashes.join(",")));
            Ok(())
        }
    }

    struct NoopProgramRunner;

    #[async_trait]
    impl ExternalProgramRunner for NoopProgramRunner {
        async fn invoke(
            &self,
            _program: &ExternalProgram,
            hash: &str,
            _path_mappings: &[PathMapping],
            _cancel: &mut CancelToken,
        ) -> ActionsResult<()> {
            let _ = hash;
            Ok(())
        }
    }

    fn rule_with(conditions: ActionConditions, dry_run: bool) -> TrackerRule {
        TrackerRule {
            id: 1,
            instance_id: 1,
            name: "rule".to_string(),
            tracker_pattern: "tracker.example".to_string(),
            conditions,
            enabled: true,
            dry_run,
            sort_order: 0,
            interval_s: None,
            free_space_source: None,
        }
    }

    fn movies_condition() -> RuleCondition {
        RuleCondition::Leaf {
            field: Field::Category,
            operator: Operator::Equal,
            value: Some("movies".to_string()),
            min_value: None,
            max_value: None,
            regex: false,
            negate: false,
        }
    }

    async fn activity_store() -> ActivityStore {
        let pool = Pool::connect("sqlite::memory:").await.unwrap();
        sqlx::query(schema(pool.dialect())).execute(pool.any()).await.unwrap();
        ActivityStore::new(pool)
    }

    #[tokio::test]
    async fn tags_full_mode_adds_to_matching_and_removes_from_non_matching() {
        let client = RecordingClient::default();
        let programs = HashMap::new();
        let runner = NoopProgramRunner;
        let activity = activity_store().await;
        let cache = RegexCache::new();
        let instance = sample_instance();

        let tags = TagsAction {
            enabled: true,
            tags: vec!["hd".to_string()],
            mode: Some(TagMode::Full),
            delete_from_client: None,
            use_tracker_as_tag: None,
            use_display_name: None,
            condition: Some(movies_condition()),
        };
        let rule = rule_with(ActionConditions { tags: Some(tags), ..ActionConditions::default() }, false);

        let mut matching = sample_torrent_view();
        matching.hash = "hash-movie".to_string();
        matching.category = "movies".to_string();
        let mut other = sample_torrent_view();
        other.hash = "hash-tv".to_string();
        other.category = "tv".to_string();

        let ctx = PipelineContext {
            instance: &instance,
            rule: &rule,
            qbit: &client,
            program_runner: &runner,
            activity: &activity,
            programs: &programs,
            regex_cache: &cache,
            sibling_index: None,
            free_space_probe: None,
            free_space_path: None,
            now: Utc::now(),
        };
        let (_handle, mut cancel) = cancel_pair();

        run_rule(&ctx, &[matching, other], &mut cancel).await.unwrap();

        let calls = client.calls.lock().unwrap();
        assert!(calls.contains(&"add_tags:hash-movie:hd".to_string()));
        assert!(calls.contains(&"remove_tags:hash-tv:hd".to_string()));
    }

    #[tokio::test]
    async fn dry_run_suppresses_capability_calls_but_logs_success() {
        let client = RecordingClient::default();
        let programs = HashMap::new();
        let runner = NoopProgramRunner;
        let activity = activity_store().await;
        let cache = RegexCache::new();
        let instance = sample_instance();

        let pause = sentrel_model::SimpleAction { enabled: true, condition: None };
        let rule = rule_with(ActionConditions { pause: Some(pause), ..ActionConditions::default() }, true);
        let view = sample_torrent_view();

        let ctx = PipelineContext {
            instance: &instance,
            rule: &rule,
            qbit: &client,
            program_runner: &runner,
            activity: &activity,
            programs: &programs,
            regex_cache: &cache,
            sibling_index: None,
            free_space_probe: None,
            free_space_path: None,
            now: Utc::now(),
        };
        let (_handle, mut cancel) = cancel_pair();

        run_rule(&ctx, &[view], &mut cancel).await.unwrap();

        assert!(client.calls.lock().unwrap().is_empty());
        assert_eq!(activity.count_for_instance(instance.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn category_include_cross_seeds_extends_to_siblings() {
        let client = RecordingClient::default();
        let programs = HashMap::new();
        let runner = NoopProgramRunner;
        let activity = activity_store().await;
        let cache = RegexCache::new();
        let instance = sample_instance();

        let category = CategoryAction {
            enabled: true,
            category: "archive".to_string(),
            include_cross_seeds: Some(true),
            group_id: None,
            block_if_cross_seed_in_categories: vec![],
            condition: None,
        };
        let rule = rule_with(ActionConditions { category: Some(category), ..ActionConditions::default() }, false);

        let mut a = sample_torrent_view();
        a.hash = "hash-a".to_string();
        let mut b = sample_torrent_view();
        b.hash = "hash-b".to_string();

        let ctx = PipelineContext {
            instance: &instance,
            rule: &rule,
            qbit: &client,
            program_runner: &runner,
            activity: &activity,
            programs: &programs,
            regex_cache: &cache,
            sibling_index: None,
            free_space_probe: None,
            free_space_path: None,
            now: Utc::now(),
        };
        let (_handle, mut cancel) = cancel_pair();

        run_rule(&ctx, &[a, b], &mut cancel).await.unwrap();

        let calls = client.calls.lock().unwrap();
        assert!(calls.iter().any(|c| c.starts_with("set_category:") && c.contains("hash-a") && c.contains("hash-b")));
    }

    #[tokio::test]
    async fn move_is_blocked_when_cross_seed_exists_on_instance() {
        let client = RecordingClient::default();
        let programs = HashMap::new();
        let runner = NoopProgramRunner;
        let activity = activity_store().await;
        let cache = RegexCache::new();
        let instance = sample_instance();

        let move_action = MoveAction {
            enabled: true,
            path: "/data/archive".to_string(),
            block_if_cross_seed: Some(true),
            group_id: None,
            atomic: AtomicScope::None,
            condition: None,
        };
        let rule = rule_with(ActionConditions { move_action: Some(move_action), ..ActionConditions::default() }, false);

        let mut view = sample_torrent_view();
        view.is_grouped = true;

        let ctx = PipelineContext {
            instance: &instance,
            rule: &rule,
            qbit: &client,
            program_runner: &runner,
            activity: &activity,
            programs: &programs,
            regex_cache: &cache,
            sibling_index: None,
            free_space_probe: None,
            free_space_path: None,
            now: Utc::now(),
        };
        let (_handle, mut cancel) = cancel_pair();

        run_rule(&ctx, &[view], &mut cancel).await.unwrap();

        assert!(client.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn atomic_move_group_skips_whole_group_when_one_member_fails_condition() {
        let client = RecordingClient::default();
        let programs = HashMap::new();
        let runner = NoopProgramRunner;
        let activity = activity_store().await;
        let cache = RegexCache::new();
        let instance = sample_instance();

        let grouping = Grouping {
            default_group_id: None,
            groups: vec![GroupingGroup {
                id: "g1".to_string(),
                keys: vec![Field::ContentPath],
                ambiguous_policy: sentrel_model::AmbiguousPolicy::VerifyOverlap,
                min_file_overlap_percent: 50.0,
            }],
        };
        let move_action = MoveAction {
            enabled: true,
            path: "/data/archive".to_string(),
            block_if_cross_seed: None,
            group_id: Some("g1".to_string()),
            atomic: AtomicScope::All,
            condition: Some(movies_condition()),
        };
        let mut conditions = ActionConditions { move_action: Some(move_action), ..ActionConditions::default() };
        conditions.grouping = Some(grouping);
        let rule = rule_with(conditions, false);

        let mut a = sample_torrent_view();
        a.hash = "hash-a".to_string();
        a.content_path = "/data/shared".to_string();
        a.category = "movies".to_string();
        let mut b = sample_torrent_view();
        b.hash = "hash-b".to_string();
        b.content_path = "/data/shared".to_string();
        b.category = "tv".to_string();

        let ctx = PipelineContext {
            instance: &instance,
            rule: &rule,
            qbit: &client,
            program_runner: &runner,
            activity: &activity,
            programs: &programs,
            regex_cache: &cache,
            sibling_index: None,
            free_space_probe: None,
            free_space_path: None,
            now: Utc::now(),
        };
        let (_handle, mut cancel) = cancel_pair();

        run_rule(&ctx, &[a, b], &mut cancel).await.unwrap();

        assert!(client.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_skips_when_hardlinks_leak_outside_and_not_included() {
        let client = RecordingClient::default();
        let programs = HashMap::new();
        let runner = NoopProgramRunner;
        let activity = activity_store().await;
        let cache = RegexCache::new();
        let instance = sample_instance();

        let delete = DeleteAction {
            enabled: true,
            mode: DeleteMode::DeleteWithFiles,
            include_hardlinks: Some(false),
            group_id: None,
            atomic: AtomicScope::None,
            condition: None,
        };
        let rule = rule_with(ActionConditions { delete: Some(delete), ..ActionConditions::default() }, false);

        let mut view = sample_torrent_view();
        view.hardlink_scope = HardlinkScope::OutsideQbittorrent;

        let ctx = PipelineContext {
            instance: &instance,
            rule: &rule,
            qbit: &client,
            program_runner: &runner,
            activity: &activity,
            programs: &programs,
            regex_cache: &cache,
            sibling_index: None,
            free_space_probe: None,
            free_space_path: None,
            now: Utc::now(),
        };
        let (_handle, mut cancel) = cancel_pair();

        run_rule(&ctx, &[view], &mut cancel).await.unwrap();

        assert!(client.calls.lock().unwrap().is_empty());
    }
}
