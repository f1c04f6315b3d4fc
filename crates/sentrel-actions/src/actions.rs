//! Per-action-block execution. Each function here is called once per
//! pipeline run for its block, iterates the torrent batch itself (rather
//! than being driven per-torrent by the caller), since several blocks
//! need cross-torrent context: `tags` full mode needs the non-matching
//! torrents to reverse a stale tag, `category`/`move`/`delete` need
//! cross-seed siblings and atomic group membership.

use std::collections::HashMap;

use sentrel_limits::CancelToken;
use sentrel_model::{
    ActivityOutcome, AtomicScope, CategoryAction, DeleteAction, DeleteMode, ExternalProgramAction,
    HardlinkScope, MoveAction, ShareLimitsAction, SimpleAction, SpeedLimitsAction, TagMode,
    TagsAction, TorrentView,
};

use crate::error::{ActionsError, ActionsResult};
use crate::grouping;
use crate::pipeline::PipelineContext;

/// Write one activity row per view in `views`, all sharing `outcome`.
async fn log_outcome(
    ctx: &PipelineContext<'_>,
    views: &[&TorrentView],
    action: &str,
    outcome: &ActionsResult<()>,
) -> ActionsResult<()> {
    for view in views {
        match outcome {
            Ok(()) => {
                let reason = ctx.dry_run().then(|| "dry-run".to_string());
                ctx.log(view, action, ActivityOutcome::Success, reason, None).await?;
            }
            Err(err) => {
                ctx.log(view, action, ActivityOutcome::Failed, Some(err.to_string()), None).await?;
            }
        }
    }
    Ok(())
}

/// Resolve the grouping definition referenced by `group_id`, if any, into
/// index groups over `views`.
fn resolve_group_for_action(
    ctx: &PipelineContext<'_>,
    views: &[TorrentView],
    group_id: Option<&str>,
) -> Option<Vec<Vec<usize>>> {
    let group_id = group_id?;
    let grouping = ctx.rule.conditions.grouping.as_ref()?;
    let group = grouping.groups.iter().find(|candidate| candidate.id == group_id)?;
    Some(grouping::resolve_groups(views, group))
}

/// Whether `index`'s atomic group (if any) is fully satisfied, i.e. every
/// member also matches `condition`. Returns `true` when there is no
/// group to check, so non-atomic blocks always pass.
fn atomic_group_satisfied(
    ctx: &PipelineContext<'_>,
    views: &[TorrentView],
    resolved_groups: &Option<Vec<Vec<usize>>>,
    index: usize,
    condition: &Option<sentrel_model::RuleCondition>,
) -> bool {
    let Some(groups) = resolved_groups else {
        return true;
    };
    let Some(members) = groups.iter().find(|members| members.contains(&index)) else {
        return true;
    };
    members.iter().all(|&member| ctx.condition_matches(&views[member], condition))
}

pub(crate) async fn apply_tags(
    ctx: &PipelineContext<'_>,
    views: &[TorrentView],
    action: &TagsAction,
    cancel: &mut CancelToken,
) -> ActionsResult<()> {
    if !action.enabled {
        return Ok(());
    }
    let mode = action.mode.unwrap_or(TagMode::Full);
    let delete_from_client = action.delete_from_client.unwrap_or(false);
    let use_tracker_as_tag = action.use_tracker_as_tag.unwrap_or(false);

    for view in views {
        let matched = ctx.condition_matches(view, &action.condition);
        let mut tags = action.tags.clone();
        if use_tracker_as_tag && !view.tracker.is_empty() {
            tags.push(view.tracker.clone());
        }
        if tags.is_empty() {
            continue;
        }

        let should_add = matched && matches!(mode, TagMode::Full | TagMode::Add);
        let should_remove = (matched && mode == TagMode::Remove) || (!matched && mode == TagMode::Full);
        if !should_add && !should_remove {
            continue;
        }

        if delete_from_client && !ctx.dry_run() {
            for tag in &tags {
                ctx.qbit.delete_tag(tag, cancel).await?;
            }
        }

        let hashes = vec![view.hash.clone()];
        if should_add {
            let result = if ctx.dry_run() {
                Ok(())
            } else {
                ctx.qbit.add_tags(&hashes, &tags, cancel).await
            };
            log_outcome(ctx, &[view], "tag:add", &result).await?;
        }
        if should_remove {
            let result = if ctx.dry_run() {
                Ok(())
            } else {
                ctx.qbit.remove_tags(&hashes, &tags, cancel).await
            };
            log_outcome(ctx, &[view], "tag:remove", &result).await?;
        }
    }
    Ok(())
}

pub(crate) async fn apply_category(
    ctx: &PipelineContext<'_>,
    views: &[TorrentView],
    action: &CategoryAction,
    cancel: &mut CancelToken,
) -> ActionsResult<()> {
    if !action.enabled {
        return Ok(());
    }
    let include_cross_seeds = action.include_cross_seeds.unwrap_or(false);

    let mut siblings: HashMap<(&str, &str), Vec<usize>> = HashMap::new();
    for (index, view) in views.iter().enumerate() {
        siblings.entry((view.content_path.as_str(), view.save_path.as_str())).or_default().push(index);
    }

    for (index, view) in views.iter().enumerate() {
        if !ctx.condition_matches(view, &action.condition) {
            continue;
        }
        let sibling_indices = &siblings[&(view.content_path.as_str(), view.save_path.as_str())];

        if !action.block_if_cross_seed_in_categories.is_empty() {
            let blocked = sibling_indices
                .iter()
                .filter(|&&sibling| sibling != index)
                .any(|&sibling| action.block_if_cross_seed_in_categories.contains(&views[sibling].category));
            if blocked {
                ctx.log(
                    view,
                    "category",
                    ActivityOutcome::Success,
                    Some("blocked: cross-seed sibling in listed category".to_string()),
                    None,
                )
                .await?;
                continue;
            }
        }

        let targets: Vec<&TorrentView> = if include_cross_seeds {
            sibling_indices.iter().map(|&sibling| &views[sibling]).collect()
        } else {
            vec![view]
        };
        let hashes: Vec<String> = targets.iter().map(|target| target.hash.clone()).collect();

        let result = if ctx.dry_run() {
            Ok(())
        } else {
            ctx.qbit.set_category(&hashes, &action.category, cancel).await
        };
        log_outcome(ctx, &targets, "category", &result).await?;
    }
    Ok(())
}

pub(crate) async fn apply_move(
    ctx: &PipelineContext<'_>,
    views: &[TorrentView],
    action: &MoveAction,
    cancel: &mut CancelToken,
) -> ActionsResult<()> {
    if !action.enabled {
        return Ok(());
    }
    let block_if_cross_seed = action.block_if_cross_seed.unwrap_or(false);
    let resolved_groups = resolve_group_for_action(ctx, views, action.group_id.as_deref());

    for (index, view) in views.iter().enumerate() {
        if !ctx.condition_matches(view, &action.condition) {
            continue;
        }
        if block_if_cross_seed && view.is_grouped {
            ctx.log(view, "move", ActivityOutcome::Success, Some("blocked: cross-seed exists on instance".to_string()), None).await?;
            continue;
        }
        if action.atomic == AtomicScope::All
            && !atomic_group_satisfied(ctx, views, &resolved_groups, index, &action.condition)
        {
            ctx.log(view, "move", ActivityOutcome::Success, Some("atomic-group-incomplete".to_string()), None).await?;
            continue;
        }

        let hashes = vec![view.hash.clone()];
        let result = if ctx.dry_run() {
            Ok(())
        } else {
            ctx.qbit.set_location(&hashes, &action.path, cancel).await
        };
        log_outcome(ctx, &[view], "move", &result).await?;
    }
    Ok(())
}

pub(crate) async fn apply_speed_limits(
    ctx: &PipelineContext<'_>,
    views: &[TorrentView],
    action: &SpeedLimitsAction,
    cancel: &mut CancelToken,
) -> ActionsResult<()> {
    if !action.enabled {
        return Ok(());
    }
    let upload_bytes_s = action.upload_ki_b.map(|kib| kib * 1024);
    let download_bytes_s = action.download_ki_b.map(|kib| kib * 1024);

    for view in views {
        if !ctx.condition_matches(view, &action.condition) {
            continue;
        }
        let hashes = vec![view.hash.clone()];
        let result = if ctx.dry_run() {
            Ok(())
        } else {
            ctx.qbit.set_speed_limits(&hashes, upload_bytes_s, download_bytes_s, cancel).await
        };
        log_outcome(ctx, &[view], "speed-limits", &result).await?;
    }
    Ok(())
}

pub(crate) async fn apply_share_limits(
    ctx: &PipelineContext<'_>,
    views: &[TorrentView],
    action: &ShareLimitsAction,
    cancel: &mut CancelToken,
) -> ActionsResult<()> {
    if !action.enabled {
        return Ok(());
    }
    for view in views {
        if !ctx.condition_matches(view, &action.condition) {
            continue;
        }
        let hashes = vec![view.hash.clone()];
        let result = if ctx.dry_run() {
            Ok(())
        } else {
            ctx.qbit.set_share_limits(&hashes, action.ratio_limit, action.seeding_time_minutes, cancel).await
        };
        log_outcome(ctx, &[view], "share-limits", &result).await?;
    }
    Ok(())
}

/// Which symmetric single-flag action [`apply_simple`] is executing.
#[derive(Debug, Clone, Copy)]
pub(crate) enum SimpleKind {
    Pause,
    Resume,
    Recheck,
    Reannounce,
}

impl SimpleKind {
    const fn action_name(self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Recheck => "recheck",
            Self::Reannounce => "reannounce",
        }
    }
}

pub(crate) async fn apply_simple(
    ctx: &PipelineContext<'_>,
    views: &[TorrentView],
    action: &SimpleAction,
    kind: SimpleKind,
    cancel: &mut CancelToken,
) -> ActionsResult<()> {
    if !action.enabled {
        return Ok(());
    }
    for view in views {
        if !ctx.condition_matches(view, &action.condition) {
            continue;
        }
        let hashes = vec![view.hash.clone()];
        let result = if ctx.dry_run() {
            Ok(())
        } else {
            match kind {
                SimpleKind::Pause => ctx.qbit.pause(&hashes, cancel).await,
                SimpleKind::Resume => ctx.qbit.resume(&hashes, cancel).await,
                SimpleKind::Recheck => ctx.qbit.recheck(&hashes, cancel).await,
                SimpleKind::Reannounce => ctx.qbit.reannounce(&hashes, cancel).await,
            }
        };
        log_outcome(ctx, &[view], kind.action_name(), &result).await?;
    }
    Ok(())
}

pub(crate) async fn apply_external_program(
    ctx: &PipelineContext<'_>,
    views: &[TorrentView],
    action: &ExternalProgramAction,
    cancel: &mut CancelToken,
) -> ActionsResult<()> {
    if !action.enabled {
        return Ok(());
    }
    for view in views {
        if !ctx.condition_matches(view, &action.condition) {
            continue;
        }
        let Some(program_id) = action.program_id else {
            continue;
        };
        let Some(program) = ctx.programs.get(&program_id) else {
            ctx.log(
                view,
                "external-program",
                ActivityOutcome::Failed,
                Some(ActionsError::UnknownProgram { program_id }.to_string()),
                None,
            )
            .await?;
            continue;
        };
        let result = if ctx.dry_run() {
            Ok(())
        } else {
            ctx.program_runner.invoke(program, &view.hash, &program.path_mappings, cancel).await
        };
        log_outcome(ctx, &[view], "external-program", &result).await?;
    }
    Ok(())
}

pub(crate) async fn apply_delete(
    ctx: &PipelineContext<'_>,
    views: &[TorrentView],
    action: &DeleteAction,
    cancel: &mut CancelToken,
) -> ActionsResult<()> {
    if !action.enabled {
        return Ok(());
    }
    let include_hardlinks = action.include_hardlinks.unwrap_or(false);
    let resolved_groups = resolve_group_for_action(ctx, views, action.group_id.as_deref());

    for (index, view) in views.iter().enumerate() {
        if !ctx.condition_matches(view, &action.condition) {
            continue;
        }

        if view.hardlink_scope == HardlinkScope::OutsideQbittorrent && !include_hardlinks {
            ctx.log(
                view,
                "delete",
                ActivityOutcome::Success,
                Some("skipped: hardlinks leak outside qbittorrent".to_string()),
                None,
            )
            .await?;
            continue;
        }

        if action.atomic == AtomicScope::All
            && !atomic_group_satisfied(ctx, views, &resolved_groups, index, &action.condition)
        {
            ctx.log(view, "delete", ActivityOutcome::Success, Some("atomic-group-incomplete".to_string()), None).await?;
            continue;
        }

        let delete_files = match action.mode {
            DeleteMode::Delete => false,
            DeleteMode::DeleteWithFiles | DeleteMode::DeleteWithFilesIncludeCrossSeeds => true,
            DeleteMode::DeleteWithFilesPreserveCrossSeeds => !view.is_grouped,
        };

        let hashes = vec![view.hash.clone()];
        let result = if ctx.dry_run() {
            Ok(())
        } else {
            ctx.qbit.delete(&hashes, delete_files, cancel).await
        };
        log_outcome(ctx, &[view], "delete", &result).await?;
    }
    Ok(())
}
