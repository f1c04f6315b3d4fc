//! Evaluates a [`RuleCondition`] tree against a [`TorrentView`].

use chrono::{DateTime, Utc};

use sentrel_model::{Field, FieldKind, FreeSpaceSource, GroupOperator, HardlinkScope, Operator, RuleCondition, TorrentView};

use crate::regex_cache::RegexCache;

/// A sibling category index used to resolve `EXISTS_IN`/`CONTAINS_IN`
/// leaves against `NAME`.
pub trait SiblingIndex {
    /// Whether `candidate` exists in the named category.
    fn contains(&self, category: &str, candidate: &str) -> bool;
}

/// An injected filesystem probe used to resolve `FREE_SPACE` leaves whose
/// rule specifies [`FreeSpaceSource::Path`].
pub trait FreeSpaceProbe {
    /// Bytes free at `path`, or `None` if the probe failed.
    fn probe(&self, path: &str) -> Option<i64>;
}

/// Everything the evaluator needs beyond the condition tree and the
/// torrent view itself.
pub struct EvaluationContext<'a> {
    /// Wall-clock time used for `*_AGE` derivations.
    pub now: DateTime<Utc>,
    /// Shared compiled-regex cache.
    pub regex_cache: &'a RegexCache,
    /// Sibling category index for `EXISTS_IN`/`CONTAINS_IN`, if the caller
    /// has one available.
    pub sibling_index: Option<&'a dyn SiblingIndex>,
    /// Filesystem probe for `FREE_SPACE` under [`FreeSpaceSource::Path`].
    pub free_space_probe: Option<&'a dyn FreeSpaceProbe>,
    /// The rule's configured free-space source.
    pub free_space_source: Option<FreeSpaceSource>,
    /// The path to probe when `free_space_source` is
    /// [`FreeSpaceSource::Path`].
    pub free_space_path: Option<&'a str>,
}

/// A non-fatal condition encountered while evaluating one leaf: a regex
/// failed to compile, a lookup had no index to consult, or a free-space
/// probe failed. The leaf itself still evaluates to `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationWarning {
    /// Human-readable detail.
    pub message: String,
}

/// Result of evaluating a condition tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationOutcome {
    /// Whether the tree matched.
    pub matched: bool,
    /// Non-fatal warnings collected while evaluating leaves.
    pub warnings: Vec<EvaluationWarning>,
}

/// Evaluate `condition` against `view`.
#[must_use]
pub fn evaluate(condition: &RuleCondition, view: &TorrentView, ctx: &EvaluationContext<'_>) -> EvaluationOutcome {
    let mut warnings = Vec::new();
    let matched = eval_node(condition, view, ctx, &mut warnings);
    EvaluationOutcome { matched, warnings }
}

fn eval_node(
    node: &RuleCondition,
    view: &TorrentView,
    ctx: &EvaluationContext<'_>,
    warnings: &mut Vec<EvaluationWarning>,
) -> bool {
    match node {
        RuleCondition::Leaf {
            field,
            operator,
            value,
            min_value,
            max_value,
            regex,
            negate,
        } => {
            let result = eval_leaf(*field, *operator, value.as_deref(), *min_value, *max_value, *regex, view, ctx, warnings);
            if *negate { !result } else { result }
        }
        RuleCondition::Group {
            operator,
            conditions,
            negate,
        } => {
            // `all()`/`any()` already give the vacuous-truth behaviour the
            // design calls for: an empty AND is true, an empty OR is false.
            let result = match operator {
                GroupOperator::And => conditions.iter().all(|child| eval_node(child, view, ctx, warnings)),
                GroupOperator::Or => conditions.iter().any(|child| eval_node(child, view, ctx, warnings)),
            };
            if *negate { !result } else { result }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn eval_leaf(
    field: Field,
    operator: Operator,
    value: Option<&str>,
    min_value: Option<f64>,
    max_value: Option<f64>,
    regex_flag: bool,
    view: &TorrentView,
    ctx: &EvaluationContext<'_>,
    warnings: &mut Vec<EvaluationWarning>,
) -> bool {
    match field.kind() {
        FieldKind::String => eval_string_leaf(field, operator, value, regex_flag, view, ctx, warnings),
        FieldKind::Numeric => eval_numeric_leaf(field, operator, value, min_value, max_value, view, ctx, warnings),
        FieldKind::Boolean => eval_boolean_leaf(field, operator, value, view),
        FieldKind::Enum => eval_enum_leaf(field, operator, value, view),
        FieldKind::Temporal => eval_temporal_leaf(field, operator, value, min_value, max_value, view),
    }
}

fn eval_string_leaf(
    field: Field,
    operator: Operator,
    value: Option<&str>,
    regex_flag: bool,
    view: &TorrentView,
    ctx: &EvaluationContext<'_>,
    warnings: &mut Vec<EvaluationWarning>,
) -> bool {
    if matches!(operator, Operator::ExistsIn | Operator::ContainsIn) {
        return eval_lookup_leaf(field, operator, value, view, ctx, warnings);
    }
    let Some(raw) = resolve_string_field(field, view) else {
        return false;
    };
    let use_regex = regex_flag || matches!(operator, Operator::Matches);
    if field.is_multi_valued() {
        raw.split(',')
            .map(str::trim)
            .filter(|element| !element.is_empty())
            .any(|element| eval_string_predicate(operator, element, value, use_regex, ctx, warnings))
    } else {
        eval_string_predicate(operator, raw, value, use_regex, ctx, warnings)
    }
}

fn eval_string_predicate(
    operator: Operator,
    candidate: &str,
    value: Option<&str>,
    use_regex: bool,
    ctx: &EvaluationContext<'_>,
    warnings: &mut Vec<EvaluationWarning>,
) -> bool {
    if use_regex {
        let Some(pattern) = value else { return false };
        return match ctx.regex_cache.get_or_compile(pattern) {
            Ok(compiled) => compiled.is_match(candidate),
            Err(source) => {
                warnings.push(EvaluationWarning {
                    message: source.to_string(),
                });
                false
            }
        };
    }
    let Some(value) = value else { return false };
    let candidate_lower = candidate.to_ascii_lowercase();
    let value_lower = value.to_ascii_lowercase();
    match operator {
        Operator::Equal => candidate_lower == value_lower,
        Operator::NotEqual => candidate_lower != value_lower,
        Operator::Contains => candidate_lower.contains(&value_lower),
        Operator::NotContains => !candidate_lower.contains(&value_lower),
        Operator::StartsWith => candidate_lower.starts_with(&value_lower),
        Operator::EndsWith => candidate_lower.ends_with(&value_lower),
        _ => false,
    }
}

fn eval_lookup_leaf(
    field: Field,
    operator: Operator,
    value: Option<&str>,
    view: &TorrentView,
    ctx: &EvaluationContext<'_>,
    warnings: &mut Vec<EvaluationWarning>,
) -> bool {
    if field != Field::Name {
        return false;
    }
    let Some(category) = value else { return false };
    match ctx.sibling_index {
        Some(index) => matches!(operator, Operator::ExistsIn | Operator::ContainsIn) && index.contains(category, &view.name),
        None => {
            warnings.push(EvaluationWarning {
                message: format!("no sibling index provided for lookup against `{category}`"),
            });
            false
        }
    }
}

fn resolve_string_field(field: Field, view: &TorrentView) -> Option<&str> {
    Some(match field {
        Field::Name => view.name.as_str(),
        Field::Category => view.category.as_str(),
        Field::Tags => view.tags.as_str(),
        Field::SavePath => view.save_path.as_str(),
        Field::ContentPath => view.content_path.as_str(),
        Field::Tracker => view.tracker.as_str(),
        Field::Comment => view.comment.as_str(),
        Field::State => view.state.as_str(),
        Field::RlsTitle => view.rls_title.as_str(),
        Field::RlsGroup => view.rls_group.as_str(),
        Field::RlsResolution => view.rls_resolution.as_str(),
        Field::RlsSource => view.rls_source.as_str(),
        _ => return None,
    })
}

fn eval_numeric_leaf(
    field: Field,
    operator: Operator,
    value: Option<&str>,
    min_value: Option<f64>,
    max_value: Option<f64>,
    view: &TorrentView,
    ctx: &EvaluationContext<'_>,
    warnings: &mut Vec<EvaluationWarning>,
) -> bool {
    let Some(candidate) = resolve_numeric_field(field, view, ctx, warnings) else {
        return false;
    };
    eval_numeric_predicate(operator, candidate, value, min_value, max_value)
}

fn resolve_numeric_field(
    field: Field,
    view: &TorrentView,
    ctx: &EvaluationContext<'_>,
    warnings: &mut Vec<EvaluationWarning>,
) -> Option<f64> {
    if let Some(source) = field.age_source() {
        let timestamp = resolve_temporal_field(source, view);
        if timestamp == 0 {
            return None;
        }
        return Some((ctx.now.timestamp() - timestamp) as f64);
    }
    match field {
        Field::Size => Some(view.size as f64),
        Field::TotalSize => Some(view.total_size as f64),
        Field::Downloaded => Some(view.downloaded as f64),
        Field::Uploaded => Some(view.uploaded as f64),
        Field::AmountLeft => Some(view.amount_left as f64),
        Field::FreeSpace => resolve_free_space(view, ctx, warnings),
        Field::Ratio => Some(view.ratio),
        Field::Progress => Some(view.progress),
        Field::Availability => Some(view.availability),
        Field::Popularity => Some(view.popularity),
        Field::DlSpeed => Some(view.dl_speed as f64),
        Field::UpSpeed => Some(view.up_speed as f64),
        Field::DlLimit => Some(view.dl_limit as f64),
        Field::UpLimit => Some(view.up_limit as f64),
        Field::NumSeeds => Some(view.num_seeds as f64),
        Field::NumLeechs => Some(view.num_leechs as f64),
        Field::NumComplete => Some(view.num_complete as f64),
        Field::NumIncomplete => Some(view.num_incomplete as f64),
        Field::TrackersCount => Some(view.trackers_count as f64),
        Field::GroupSize => Some(view.group_size as f64),
        _ => None,
    }
}

fn resolve_free_space(view: &TorrentView, ctx: &EvaluationContext<'_>, warnings: &mut Vec<EvaluationWarning>) -> Option<f64> {
    if let Some(bytes) = view.free_space {
        return Some(bytes as f64);
    }
    match ctx.free_space_source {
        Some(FreeSpaceSource::Path) => {
            let probe = ctx.free_space_probe?;
            let Some(path) = ctx.free_space_path else {
                warnings.push(EvaluationWarning {
                    message: "free space source is `path` but no path is configured".to_string(),
                });
                return None;
            };
            match probe.probe(path) {
                Some(bytes) => Some(bytes as f64),
                None => {
                    warnings.push(EvaluationWarning {
                        message: format!("free space probe failed for path `{path}`"),
                    });
                    None
                }
            }
        }
        Some(FreeSpaceSource::Qbittorrent) | None => {
            warnings.push(EvaluationWarning {
                message: "free space was not resolved onto the torrent view".to_string(),
            });
            None
        }
    }
}

fn eval_numeric_predicate(operator: Operator, candidate: f64, value: Option<&str>, min_value: Option<f64>, max_value: Option<f64>) -> bool {
    if operator == Operator::Between {
        let (Some(min), Some(max)) = (min_value, max_value) else {
            return false;
        };
        return candidate >= min && candidate <= max;
    }
    let Some(value) = value.and_then(|raw| raw.parse::<f64>().ok()) else {
        return false;
    };
    match operator {
        Operator::Equal => (candidate - value).abs() < f64::EPSILON,
        Operator::NotEqual => (candidate - value).abs() >= f64::EPSILON,
        Operator::LessThan => candidate < value,
        Operator::LessOrEqual => candidate <= value,
        Operator::GreaterThan => candidate > value,
        Operator::GreaterOrEqual => candidate >= value,
        _ => false,
    }
}

fn eval_boolean_leaf(field: Field, operator: Operator, value: Option<&str>, view: &TorrentView) -> bool {
    let Some(candidate) = resolve_boolean_field(field, view) else {
        return false;
    };
    let Some(expected) = value.and_then(parse_bool) else {
        return false;
    };
    match operator {
        Operator::Equal => candidate == expected,
        Operator::NotEqual => candidate != expected,
        _ => false,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn resolve_boolean_field(field: Field, view: &TorrentView) -> Option<bool> {
    Some(match field {
        Field::Private => view.private,
        Field::IsUnregistered => view.is_unregistered,
        Field::HasMissingFiles => view.has_missing_files,
        Field::IsGrouped => view.is_grouped,
        _ => return None,
    })
}

fn eval_enum_leaf(field: Field, operator: Operator, value: Option<&str>, view: &TorrentView) -> bool {
    if field != Field::HardlinkScope {
        return false;
    }
    let Some(expected) = value.and_then(parse_hardlink_scope) else {
        return false;
    };
    match operator {
        Operator::Equal => view.hardlink_scope == expected,
        Operator::NotEqual => view.hardlink_scope != expected,
        _ => false,
    }
}

fn parse_hardlink_scope(raw: &str) -> Option<HardlinkScope> {
    match raw {
        "none" => Some(HardlinkScope::None),
        "torrents_only" => Some(HardlinkScope::TorrentsOnly),
        "outside_qbittorrent" => Some(HardlinkScope::OutsideQbittorrent),
        _ => None,
    }
}

fn eval_temporal_leaf(field: Field, operator: Operator, value: Option<&str>, min_value: Option<f64>, max_value: Option<f64>, view: &TorrentView) -> bool {
    let candidate = resolve_temporal_field(field, view) as f64;
    eval_numeric_predicate(operator, candidate, value, min_value, max_value)
}

fn resolve_temporal_field(field: Field, view: &TorrentView) -> i64 {
    match field {
        Field::AddedOn => view.added_on,
        Field::CompletionOn => view.completion_on,
        Field::LastActivity => view.last_activity,
        Field::SeedingTime => view.seeding_time,
        Field::TimeActive => view.time_active,
        Field::Eta => view.eta,
        Field::Reannounce => view.reannounce,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentrel_model::TorrentFile;

    fn base_view() -> TorrentView {
        TorrentView {
            hash: "abc123".to_string(),
            name: "Foo.2024.1080p".to_string(),
            category: "movies".to_string(),
            tags: String::new(),
            save_path: "/data".to_string(),
            content_path: "/data/Foo.2024.1080p".to_string(),
            tracker: "tracker.example".to_string(),
            comment: String::new(),
            state: "uploading".to_string(),
            rls_title: String::new(),
            rls_group: String::new(),
            rls_resolution: String::new(),
            rls_source: String::new(),
            size: 1_000,
            total_size: 1_000,
            downloaded: 1_000,
            uploaded: 2_000,
            amount_left: 0,
            free_space: None,
            added_on: 0,
            completion_on: 0,
            last_activity: 0,
            seeding_time: 3_600,
            time_active: 7_200,
            eta: 0,
            reannounce: 0,
            ratio: 2.0,
            progress: 1.0,
            availability: 1.0,
            popularity: 0.5,
            dl_speed: 0,
            up_speed: 1_024,
            dl_limit: 0,
            up_limit: 0,
            num_seeds: 4,
            num_leechs: 1,
            num_complete: 10,
            num_incomplete: 2,
            trackers_count: 1,
            group_size: 0,
            private: true,
            is_unregistered: false,
            has_missing_files: false,
            is_grouped: false,
            hardlink_scope: HardlinkScope::None,
            files: vec![TorrentFile {
                relative_path: "Foo.2024.1080p.mkv".to_string(),
                size: 1_000,
            }],
        }
    }

    fn ctx(cache: &RegexCache) -> EvaluationContext<'_> {
        EvaluationContext {
            now: DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc),
            regex_cache: cache,
            sibling_index: None,
            free_space_probe: None,
            free_space_source: None,
            free_space_path: None,
        }
    }

    fn leaf(field: Field, operator: Operator, value: &str) -> RuleCondition {
        RuleCondition::Leaf {
            field,
            operator,
            value: Some(value.to_string()),
            min_value: None,
            max_value: None,
            regex: false,
            negate: false,
        }
    }

    #[test]
    fn string_contains_is_case_insensitive() {
        let cache = RegexCache::new();
        let view = base_view();
        let condition = leaf(Field::Name, Operator::Contains, "1080P");
        assert!(evaluate(&condition, &view, &ctx(&cache)).matched);
    }

    #[test]
    fn negate_inverts_leaf_result() {
        let cache = RegexCache::new();
        let view = base_view();
        let mut condition = leaf(Field::Name, Operator::Contains, "1080P");
        if let RuleCondition::Leaf { negate, .. } = &mut condition {
            *negate = true;
        }
        assert!(!evaluate(&condition, &view, &ctx(&cache)).matched);
    }

    #[test]
    fn empty_and_group_is_vacuously_true_empty_or_group_is_false() {
        let cache = RegexCache::new();
        let view = base_view();
        let and_group = RuleCondition::Group {
            operator: GroupOperator::And,
            conditions: vec![],
            negate: false,
        };
        let or_group = RuleCondition::Group {
            operator: GroupOperator::Or,
            conditions: vec![],
            negate: false,
        };
        assert!(evaluate(&and_group, &view, &ctx(&cache)).matched);
        assert!(!evaluate(&or_group, &view, &ctx(&cache)).matched);
    }

    #[test]
    fn and_short_circuits_on_first_false_child() {
        let cache = RegexCache::new();
        let view = base_view();
        let group = RuleCondition::Group {
            operator: GroupOperator::And,
            conditions: vec![
                leaf(Field::Category, Operator::Equal, "tv"),
                leaf(Field::Name, Operator::Contains, "1080p"),
            ],
            negate: false,
        };
        assert!(!evaluate(&group, &view, &ctx(&cache)).matched);
    }

    #[test]
    fn between_uses_min_and_max_value_inclusive() {
        let cache = RegexCache::new();
        let view = base_view();
        let condition = RuleCondition::Leaf {
            field: Field::Ratio,
            operator: Operator::Between,
            value: None,
            min_value: Some(1.0),
            max_value: Some(2.0),
            regex: false,
            negate: false,
        };
        assert!(evaluate(&condition, &view, &ctx(&cache)).matched);
    }

    #[test]
    fn age_field_fails_when_timestamp_is_unset() {
        let cache = RegexCache::new();
        let view = base_view();
        let condition = leaf(Field::AddedOnAge, Operator::GreaterThan, "0");
        assert!(!evaluate(&condition, &view, &ctx(&cache)).matched);
    }

    #[test]
    fn age_field_computes_seconds_since_timestamp() {
        let cache = RegexCache::new();
        let mut view = base_view();
        let now = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        view.added_on = now.timestamp() - 3_600;
        let condition = leaf(Field::AddedOnAge, Operator::GreaterOrEqual, "3600");
        let mut context = ctx(&cache);
        context.now = now;
        assert!(evaluate(&condition, &view, &context).matched);
    }

    #[test]
    fn tags_field_matches_per_element() {
        let cache = RegexCache::new();
        let mut view = base_view();
        view.tags = "hd, remux".to_string();
        let condition = leaf(Field::Tags, Operator::Equal, "remux");
        assert!(evaluate(&condition, &view, &ctx(&cache)).matched);
    }

    #[test]
    fn invalid_regex_yields_false_leaf_and_a_warning() {
        let cache = RegexCache::new();
        let view = base_view();
        let condition = RuleCondition::Leaf {
            field: Field::Name,
            operator: Operator::Matches,
            value: Some("(unclosed".to_string()),
            min_value: None,
            max_value: None,
            regex: false,
            negate: false,
        };
        let outcome = evaluate(&condition, &view, &ctx(&cache));
        assert!(!outcome.matched);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn free_space_without_source_or_probe_fails_with_warning() {
        let cache = RegexCache::new();
        let view = base_view();
        let condition = leaf(Field::FreeSpace, Operator::GreaterThan, "0");
        let outcome = evaluate(&condition, &view, &ctx(&cache));
        assert!(!outcome.matched);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn hardlink_scope_compares_against_enum_value() {
        let cache = RegexCache::new();
        let view = base_view();
        let condition = leaf(Field::HardlinkScope, Operator::Equal, "none");
        assert!(evaluate(&condition, &view, &ctx(&cache)).matched);
    }
}
