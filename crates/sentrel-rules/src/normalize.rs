//! Condition normalization: legacy field lifting and tracker pattern
//! canonicalization.

use serde::{Deserialize, Serialize};

use sentrel_model::{ActionConditions, RuleCondition, TagMode, TagsAction};

/// Wire shape of the `tags[]` action block, accepting both the legacy
/// singular `tag` field and the current `tags[]` list. Deserializing this
/// and calling [`normalize_tags_document`] is the supported path from
/// untrusted JSON into [`sentrel_model::TagsAction`]; constructing
/// `TagsAction` directly is for code that already holds normalized data.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagsActionDocument {
    /// Whether this block is active.
    #[serde(default)]
    pub enabled: bool,
    /// Legacy singular tag field.
    #[serde(default)]
    pub tag: Option<String>,
    /// Current tag list; entries may be empty strings from loosely-typed
    /// upstream JSON and are dropped during normalization.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Add/remove/full semantics.
    #[serde(default)]
    pub mode: Option<TagMode>,
    /// Purge the managed tag from qBittorrent before reapplication.
    #[serde(default)]
    pub delete_from_client: Option<bool>,
    /// Derive the tag from the torrent's primary tracker domain.
    #[serde(default)]
    pub use_tracker_as_tag: Option<bool>,
    /// Resolve the tracker domain through a per-instance display-name map.
    #[serde(default)]
    pub use_display_name: Option<bool>,
    /// Condition gating when this block applies.
    #[serde(default)]
    pub condition: Option<RuleCondition>,
}

/// Normalize a [`TagsActionDocument`] into [`TagsAction`]:
///
/// 1. If `tag` is present and `tags` is empty, lift `tag` into `tags[0]`.
/// 2. Drop empty entries from `tags[]`.
/// 3. The legacy `tag` alias is not stored on [`TagsAction`]; recover it on
///    output via [`tags_action_tag_alias`].
#[must_use]
pub fn normalize_tags_document(document: TagsActionDocument) -> TagsAction {
    let mut tags: Vec<String> = document.tags.into_iter().filter(|tag| !tag.is_empty()).collect();
    if tags.is_empty() {
        if let Some(legacy) = document.tag.filter(|tag| !tag.is_empty()) {
            tags.push(legacy);
        }
    }
    TagsAction {
        enabled: document.enabled,
        tags,
        mode: document.mode,
        delete_from_client: document.delete_from_client,
        use_tracker_as_tag: document.use_tracker_as_tag,
        use_display_name: document.use_display_name,
        condition: document.condition,
    }
}

/// The legacy `tag` alias for a normalized [`TagsAction`]: `tags[0]` if
/// present, else `None`. Readers that only understand the legacy singular
/// field should be given this value on output.
#[must_use]
pub fn tags_action_tag_alias(action: &TagsAction) -> Option<&str> {
    action.tags.first().map(String::as_str)
}

/// Trim and deduplicate a tracker-domain pattern: split on `,`, `;`, `|`;
/// strip whitespace; preserve first-seen order; rejoin as comma-separated.
///
/// `domain_override`, when present, takes precedence over `pattern` as the
/// source to normalize — callers typically pass the form field the user
/// actually edited. This function is idempotent: re-normalizing its own
/// output (with no override) reproduces it exactly, since a normalized
/// pattern has no whitespace, no duplicate entries, and uses only commas as
/// separators.
#[must_use]
pub fn normalize_tracker_pattern(pattern: &str, domain_override: Option<&str>) -> String {
    let source = domain_override.unwrap_or(pattern);
    let mut seen = std::collections::HashSet::new();
    let mut ordered = Vec::new();
    for part in source.split([',', ';', '|']) {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            ordered.push(trimmed.to_string());
        }
    }
    ordered.join(",")
}

/// True iff every action block in `conditions` is absent or disabled.
/// Delegates to [`ActionConditions::is_empty`]; kept as a free function
/// since the design notes name `isEmpty(conditions)` at the module level.
#[must_use]
pub fn is_empty(conditions: &ActionConditions) -> bool {
    conditions.is_empty()
}
