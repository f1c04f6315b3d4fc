//! Rule (`Automation`/`TrackerRule`) and condition-tree types.
//!
//! This module is pure data: normalization (legacy `tag` lifting, tracker
//! pattern dedup) and regex compilation live in the rules-evaluation crate
//! built on top of these types.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::field::Field;

/// A comparison operator usable in a [`RuleCondition::Leaf`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    /// Equality.
    Equal,
    /// Inequality.
    NotEqual,
    /// Substring containment (strings) or membership (list fields).
    Contains,
    /// Negated [`Operator::Contains`].
    NotContains,
    /// String prefix match.
    StartsWith,
    /// String suffix match.
    EndsWith,
    /// Case-insensitive regular expression match.
    Matches,
    /// Strictly less than.
    LessThan,
    /// Less than or equal to.
    LessOrEqual,
    /// Strictly greater than.
    GreaterThan,
    /// Greater than or equal to.
    GreaterOrEqual,
    /// Inclusive numeric range `[minValue, maxValue]`.
    Between,
    /// Value exists as a key in a sibling category index.
    ExistsIn,
    /// Value exists as a key in a sibling category index, scoped to a
    /// specific nested field.
    ContainsIn,
}

/// A node in a rule's condition tree: either a leaf comparison or a logical
/// group over child nodes.
///
/// `IsGroup` per the data model is true only when a node carries a logical
/// operator *and* has children; a bare leaf that happens to set
/// `operator=AND` is still a leaf. That invariant falls naturally out of
/// representing the two cases as distinct enum variants rather than one
/// flat struct with a nullable `conditions[]` and is verified by
/// [`RuleCondition::is_group`] purely for parity with the design notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleCondition {
    /// A single field comparison.
    Leaf {
        /// Field being compared.
        field: Field,
        /// Comparison operator.
        operator: Operator,
        /// Scalar comparison value (string/number/bool rendered as text).
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        /// Lower bound for [`Operator::Between`].
        #[serde(skip_serializing_if = "Option::is_none")]
        min_value: Option<f64>,
        /// Upper bound for [`Operator::Between`].
        #[serde(skip_serializing_if = "Option::is_none")]
        max_value: Option<f64>,
        /// Whether `value` should be treated as a regular expression even
        /// when `operator != MATCHES`.
        #[serde(default)]
        regex: bool,
        /// Invert the leaf's truth value after evaluation.
        #[serde(default)]
        negate: bool,
    },
    /// A logical AND/OR group over child conditions.
    Group {
        /// Logical combinator.
        operator: GroupOperator,
        /// Child conditions.
        conditions: Vec<RuleCondition>,
        /// Invert the group's truth value after short-circuit evaluation.
        #[serde(default)]
        negate: bool,
    },
}

/// Logical combinator for a [`RuleCondition::Group`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupOperator {
    /// Short-circuits on the first `false` child; vacuously `true`.
    And,
    /// Short-circuits on the first `true` child; vacuously `false`.
    Or,
}

impl RuleCondition {
    /// Whether this node is a group, per the design-notes definition: a
    /// node is a group iff it carries a logical operator and has children.
    /// Always true for [`RuleCondition::Group`] as represented here, since
    /// the variant has no "childless group" state to collapse into a leaf;
    /// an empty `conditions[]` is still a group (and evaluates per the
    /// vacuous-truth rule for its operator).
    #[must_use]
    pub const fn is_group(&self) -> bool {
        matches!(self, Self::Group { .. })
    }
}

/// Tag-mutation mode for the `tags[]` action block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagMode {
    /// Add configured tags to matches, remove from non-matches (scoped to
    /// the rule's tracker pattern).
    Full,
    /// Only add configured tags to matches.
    Add,
    /// Only remove configured tags from matches.
    Remove,
}

/// Deletion mode for the `delete` action block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeleteMode {
    /// Remove the torrent from the client only.
    Delete,
    /// Remove the torrent and its payload files.
    DeleteWithFiles,
    /// Remove the torrent and payload files not shared with a cross-seed.
    DeleteWithFilesPreserveCrossSeeds,
    /// Remove the torrent and payload files even if shared with a
    /// cross-seed (requires local filesystem access).
    DeleteWithFilesIncludeCrossSeeds,
}

/// Scope for `atomic` group evaluation on `move`/`delete` action blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtomicScope {
    /// No atomic grouping; each torrent is evaluated independently.
    None,
    /// Every member of the referenced group must satisfy the condition
    /// before any member is acted on.
    All,
}

impl AtomicScope {
    /// Parse the wire representation (`""` or `"all"`).
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value == "all" {
            Self::All
        } else {
            Self::None
        }
    }
}

/// The `speedLimits` action block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeedLimitsAction {
    /// Whether this block is active.
    pub enabled: bool,
    /// Upload limit in KiB/s, if capped.
    pub upload_ki_b: Option<i64>,
    /// Download limit in KiB/s, if capped.
    pub download_ki_b: Option<i64>,
    /// Condition gating when this block applies.
    pub condition: Option<RuleCondition>,
}

/// The `shareLimits` action block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShareLimitsAction {
    /// Whether this block is active.
    pub enabled: bool,
    /// Ratio ceiling, if capped.
    pub ratio_limit: Option<f64>,
    /// Seeding-time ceiling in minutes, if capped.
    pub seeding_time_minutes: Option<i64>,
    /// Condition gating when this block applies.
    pub condition: Option<RuleCondition>,
}

/// A symmetric single-flag action block (`pause`, `resume`, `recheck`,
/// `reannounce`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimpleAction {
    /// Whether this block is active.
    pub enabled: bool,
    /// Condition gating when this block applies.
    pub condition: Option<RuleCondition>,
}

/// The `delete` action block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteAction {
    /// Whether this block is active.
    pub enabled: bool,
    /// Which removal semantics to apply.
    pub mode: DeleteMode,
    /// Honour hardlinks that leak outside the qBittorrent torrent set.
    pub include_hardlinks: Option<bool>,
    /// Group id for atomic evaluation.
    pub group_id: Option<String>,
    /// Atomic scope for group evaluation.
    #[serde(default)]
    pub atomic: AtomicScope,
    /// Condition gating when this block applies.
    pub condition: Option<RuleCondition>,
}

impl Default for AtomicScope {
    fn default() -> Self {
        Self::None
    }
}

/// The `tags[]` action block. The legacy singular `tag` field is not
/// represented here: normalization lifts it into `tags[0]` before this
/// struct is constructed, and lowers it back out as a computed alias on
/// serialization performed by the rules crate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagsAction {
    /// Whether this block is active.
    pub enabled: bool,
    /// Tags to add or remove, depending on `mode`.
    pub tags: Vec<String>,
    /// Add/remove/full semantics.
    pub mode: Option<TagMode>,
    /// Purge the managed tag from qBittorrent before reapplication.
    pub delete_from_client: Option<bool>,
    /// Derive the tag from the torrent's primary tracker domain.
    pub use_tracker_as_tag: Option<bool>,
    /// Resolve the tracker domain through a per-instance display-name map.
    pub use_display_name: Option<bool>,
    /// Condition gating when this block applies.
    pub condition: Option<RuleCondition>,
}

/// The `category` action block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryAction {
    /// Whether this block is active.
    pub enabled: bool,
    /// Target category name.
    pub category: String,
    /// Whether cross-seed siblings follow the category change.
    pub include_cross_seeds: Option<bool>,
    /// Group id for atomic evaluation.
    pub group_id: Option<String>,
    /// Vetoes the change if a cross-seed sibling sits in any of these
    /// categories.
    pub block_if_cross_seed_in_categories: Vec<String>,
    /// Condition gating when this block applies.
    pub condition: Option<RuleCondition>,
}

/// The `move` action block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveAction {
    /// Whether this block is active.
    pub enabled: bool,
    /// Destination storage path.
    pub path: String,
    /// Vetoes the move when any cross-seed exists anywhere on the instance.
    pub block_if_cross_seed: Option<bool>,
    /// Group id for atomic evaluation.
    pub group_id: Option<String>,
    /// Atomic scope for group evaluation.
    #[serde(default)]
    pub atomic: AtomicScope,
    /// Condition gating when this block applies.
    pub condition: Option<RuleCondition>,
}

/// The `externalProgram` action block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalProgramAction {
    /// Whether this block is active.
    pub enabled: bool,
    /// Referenced [`crate::instance::ExternalProgram`] id.
    pub program_id: Option<i64>,
    /// Condition gating when this block applies.
    pub condition: Option<RuleCondition>,
}

/// Ambiguity-resolution policy for a [`GroupingGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguousPolicy {
    /// Fall back to a file-overlap check against the sibling whose
    /// `min_file_overlap_percent` threshold must be met.
    VerifyOverlap,
    /// Drop ambiguous torrents from the group.
    Skip,
}

/// One named grouping definition referenced by `groupId` fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingGroup {
    /// Group identifier, referenced by action blocks' `groupId`.
    pub id: String,
    /// Torrent-view fields forming the group key tuple.
    pub keys: Vec<Field>,
    /// How to resolve ambiguous membership.
    pub ambiguous_policy: AmbiguousPolicy,
    /// Minimum file-overlap percentage required when resolving ambiguity
    /// via [`AmbiguousPolicy::VerifyOverlap`].
    pub min_file_overlap_percent: f64,
}

/// The `grouping` action block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Grouping {
    /// Group id applied when an action block omits its own `groupId`.
    pub default_group_id: Option<String>,
    /// Named group definitions.
    pub groups: Vec<GroupingGroup>,
}

/// The top-level JSON document attached to a rule (`conditions` column).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionConditions {
    /// Speed-limit action block.
    pub speed_limits: Option<SpeedLimitsAction>,
    /// Share-limit action block.
    pub share_limits: Option<ShareLimitsAction>,
    /// Pause action block.
    pub pause: Option<SimpleAction>,
    /// Resume action block.
    pub resume: Option<SimpleAction>,
    /// Recheck action block.
    pub recheck: Option<SimpleAction>,
    /// Reannounce action block.
    pub reannounce: Option<SimpleAction>,
    /// Delete action block.
    pub delete: Option<DeleteAction>,
    /// Tag action block.
    pub tags: Option<TagsAction>,
    /// Category action block.
    pub category: Option<CategoryAction>,
    /// Move action block.
    #[serde(rename = "move")]
    pub move_action: Option<MoveAction>,
    /// External-program action block.
    pub external_program: Option<ExternalProgramAction>,
    /// Grouping definitions referenced by other action blocks.
    pub grouping: Option<Grouping>,
}

impl ActionConditions {
    /// True iff every action block is absent or disabled. Rules carrying
    /// only disabled blocks are treated the same as rules with none: they
    /// contribute no side effects, per the emptiness contract in §4.4.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let blocks_enabled = [
            self.speed_limits.as_ref().is_some_and(|a| a.enabled),
            self.share_limits.as_ref().is_some_and(|a| a.enabled),
            self.pause.as_ref().is_some_and(|a| a.enabled),
            self.resume.as_ref().is_some_and(|a| a.enabled),
            self.recheck.as_ref().is_some_and(|a| a.enabled),
            self.reannounce.as_ref().is_some_and(|a| a.enabled),
            self.delete.as_ref().is_some_and(|a| a.enabled),
            self.tags.as_ref().is_some_and(|a| a.enabled),
            self.category.as_ref().is_some_and(|a| a.enabled),
            self.move_action.as_ref().is_some_and(|a| a.enabled),
            self.external_program.as_ref().is_some_and(|a| a.enabled),
        ];
        !blocks_enabled.into_iter().any(|enabled| enabled)
    }

    /// Validate that at least one action block is present and enabled.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyActionConditions`] when [`Self::is_empty`]
    /// holds.
    pub fn validate_non_empty(&self) -> ModelResult<()> {
        if self.is_empty() {
            return Err(ModelError::EmptyActionConditions);
        }
        Ok(())
    }
}

/// A rule bound to an [`crate::instance::Instance`] (the `Automation` /
/// `TrackerRule` entity — the spec treats the legacy dual naming as one
/// entity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerRule {
    /// Opaque identifier assigned on insert.
    pub id: i64,
    /// Owning instance.
    pub instance_id: i64,
    /// Display name; unique within the owning instance.
    pub name: String,
    /// Comma-separated tracker domain pattern, normalized form.
    pub tracker_pattern: String,
    /// Action document.
    pub conditions: ActionConditions,
    /// Whether this rule is evaluated by the scheduler.
    pub enabled: bool,
    /// When true, actions are logged but not executed.
    pub dry_run: bool,
    /// Dense sort position within the owning instance.
    pub sort_order: i32,
    /// Tick interval override; `None` means the platform default.
    pub interval_s: Option<i64>,
    /// Source of `FREE_SPACE` field resolution for this rule's conditions.
    pub free_space_source: Option<FreeSpaceSource>,
}

impl TrackerRule {
    /// Tracker domains derived from [`Self::tracker_pattern`] by splitting
    /// on commas (the normalized form uses commas exclusively; see the
    /// rules crate's `normalize` for the comma/semicolon/pipe input
    /// acceptance).
    #[must_use]
    pub fn tracker_domains(&self) -> Vec<&str> {
        self.tracker_pattern
            .split(',')
            .map(str::trim)
            .filter(|domain| !domain.is_empty())
            .collect()
    }

    /// Validate name and action-document invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] describing the first violated invariant.
    pub fn validate(&self) -> ModelResult<()> {
        if self.name.trim().is_empty() {
            return Err(ModelError::EmptyName);
        }
        self.conditions.validate_non_empty()
    }
}

/// Source of truth for a rule's `FREE_SPACE` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FreeSpaceSource {
    /// `free_space_on_disk` as reported by the qBittorrent instance.
    Qbittorrent,
    /// An injected filesystem probe against a configured path.
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_group_true_only_for_group_variant() {
        let leaf = RuleCondition::Leaf {
            field: Field::Name,
            operator: Operator::Equal,
            value: Some("x".to_string()),
            min_value: None,
            max_value: None,
            regex: false,
            negate: false,
        };
        assert!(!leaf.is_group());

        let group = RuleCondition::Group {
            operator: GroupOperator::And,
            conditions: vec![],
            negate: false,
        };
        assert!(group.is_group());
    }

    #[test]
    fn action_conditions_empty_when_no_blocks_enabled() {
        let conditions = ActionConditions::default();
        assert!(conditions.is_empty());
        assert!(conditions.validate_non_empty().is_err());
    }

    #[test]
    fn action_conditions_empty_when_blocks_present_but_disabled() {
        let conditions = ActionConditions {
            pause: Some(SimpleAction {
                enabled: false,
                condition: None,
            }),
            ..ActionConditions::default()
        };
        assert!(conditions.is_empty());
    }

    #[test]
    fn action_conditions_non_empty_when_one_block_enabled() {
        let conditions = ActionConditions {
            pause: Some(SimpleAction {
                enabled: true,
                condition: None,
            }),
            ..ActionConditions::default()
        };
        assert!(!conditions.is_empty());
        assert!(conditions.validate_non_empty().is_ok());
    }

    #[test]
    fn atomic_scope_parses_all_and_defaults_to_none() {
        assert_eq!(AtomicScope::parse("all"), AtomicScope::All);
        assert_eq!(AtomicScope::parse(""), AtomicScope::None);
        assert_eq!(AtomicScope::parse("bogus"), AtomicScope::None);
    }

    #[test]
    fn tracker_domains_splits_normalized_comma_pattern() {
        let rule = TrackerRule {
            id: 1,
            instance_id: 1,
            name: "r".to_string(),
            tracker_pattern: "alpha.example,beta.example".to_string(),
            conditions: ActionConditions {
                pause: Some(SimpleAction {
                    enabled: true,
                    condition: None,
                }),
                ..ActionConditions::default()
            },
            enabled: true,
            dry_run: false,
            sort_order: 0,
            interval_s: None,
            free_space_source: None,
        };
        assert_eq!(rule.tracker_domains(), vec!["alpha.example", "beta.example"]);
        assert!(rule.validate().is_ok());
    }
}
