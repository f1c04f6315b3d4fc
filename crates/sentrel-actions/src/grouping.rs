//! Resolves `grouping.groups[]` membership for `atomic`/`includeCrossSeeds`
//! action blocks: building each torrent's group key, and settling
//! ambiguous membership per [`AmbiguousPolicy`].

use std::collections::HashMap;

use sentrel_model::{AmbiguousPolicy, Field, GroupingGroup, TorrentView};

/// Stringify one field of `view` for use as part of a group key. This is
/// a grouping-only concern, distinct from the evaluator's comparison
/// semantics in `sentrel-rules`.
#[must_use]
fn field_value_string(view: &TorrentView, field: Field) -> String {
    match field {
        Field::Name => view.name.clone(),
        Field::Category => view.category.clone(),
        Field::Tags => view.tags.clone(),
        Field::SavePath => view.save_path.clone(),
        Field::ContentPath => view.content_path.clone(),
        Field::Tracker => view.tracker.clone(),
        Field::Comment => view.comment.clone(),
        Field::State => view.state.clone(),
        Field::RlsTitle => view.rls_title.clone(),
        Field::RlsGroup => view.rls_group.clone(),
        Field::RlsResolution => view.rls_resolution.clone(),
        Field::RlsSource => view.rls_source.clone(),
        Field::Size => view.size.to_string(),
        Field::TotalSize => view.total_size.to_string(),
        Field::Downloaded => view.downloaded.to_string(),
        Field::Uploaded => view.uploaded.to_string(),
        Field::AmountLeft => view.amount_left.to_string(),
        Field::FreeSpace => view.free_space.map(|v| v.to_string()).unwrap_or_default(),
        Field::AddedOn | Field::AddedOnAge => view.added_on.to_string(),
        Field::CompletionOn | Field::CompletionOnAge => view.completion_on.to_string(),
        Field::LastActivity | Field::LastActivityAge => view.last_activity.to_string(),
        Field::SeedingTime => view.seeding_time.to_string(),
        Field::TimeActive => view.time_active.to_string(),
        Field::Eta => view.eta.to_string(),
        Field::Reannounce => view.reannounce.to_string(),
        Field::Ratio => view.ratio.to_string(),
        Field::Progress => view.progress.to_string(),
        Field::Availability => view.availability.to_string(),
        Field::Popularity => view.popularity.to_string(),
        Field::DlSpeed => view.dl_speed.to_string(),
        Field::UpSpeed => view.up_speed.to_string(),
        Field::DlLimit => view.dl_limit.to_string(),
        Field::UpLimit => view.up_limit.to_string(),
        Field::NumSeeds => view.num_seeds.to_string(),
        Field::NumLeechs => view.num_leechs.to_string(),
        Field::NumComplete => view.num_complete.to_string(),
        Field::NumIncomplete => view.num_incomplete.to_string(),
        Field::TrackersCount => view.trackers_count.to_string(),
        Field::GroupSize => view.group_size.to_string(),
        Field::Private => view.private.to_string(),
        Field::IsUnregistered => view.is_unregistered.to_string(),
        Field::HasMissingFiles => view.has_missing_files.to_string(),
        Field::IsGrouped => view.is_grouped.to_string(),
        Field::HardlinkScope => format!("{:?}", view.hardlink_scope),
    }
}

/// The group key tuple for `view` under `group`.
#[must_use]
pub fn group_key(view: &TorrentView, group: &GroupingGroup) -> Vec<String> {
    group.keys.iter().map(|field| field_value_string(view, *field)).collect()
}

/// Percentage of `candidate`'s files (by count) whose `(relative_path,
/// size)` also appears in `sibling`.
#[must_use]
fn file_overlap_percent(candidate: &TorrentView, sibling: &TorrentView) -> f64 {
    if candidate.files.is_empty() {
        return 0.0;
    }
    let sibling_files: std::collections::HashSet<(&str, i64)> =
        sibling.files.iter().map(|f| (f.relative_path.as_str(), f.size)).collect();
    let matched = candidate
        .files
        .iter()
        .filter(|f| sibling_files.contains(&(f.relative_path.as_str(), f.size)))
        .count();
    100.0 * (matched as f64) / (candidate.files.len() as f64)
}

/// Partition `views` into groups keyed by `group`, resolving ambiguous
/// (non-unique) key collisions per [`AmbiguousPolicy`]: `verify_overlap`
/// keeps only the candidate whose file overlap against the other
/// colliding members meets `min_file_overlap_percent`; `skip` drops every
/// ambiguous member entirely.
///
/// Returns the resolved groups, each a list of view indices into `views`.
#[must_use]
pub fn resolve_groups<'a>(views: &'a [TorrentView], group: &GroupingGroup) -> Vec<Vec<usize>> {
    let mut by_key: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
    for (index, view) in views.iter().enumerate() {
        by_key.entry(group_key(view, group)).or_default().push(index);
    }

    let mut resolved = Vec::new();
    for members in by_key.into_values() {
        if members.len() <= 1 {
            resolved.push(members);
            continue;
        }
        match group.ambiguous_policy {
            AmbiguousPolicy::Skip => {}
            AmbiguousPolicy::VerifyOverlap => {
                let kept: Vec<usize> = members
                    .iter()
                    .copied()
                    .filter(|&index| {
                        members.iter().copied().filter(|&other| other != index).any(|other| {
                            file_overlap_percent(&views[index], &views[other]) >= group.min_file_overlap_percent
                        })
                    })
                    .collect();
                if !kept.is_empty() {
                    resolved.push(kept);
                }
            }
        }
    }
    resolved
}
