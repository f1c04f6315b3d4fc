//! Read-only torrent snapshot consumed by the rule evaluator.

use serde::{Deserialize, Serialize};

use crate::field::HardlinkScope;

/// A single file entry inside a torrent, as reported by the qBittorrent
/// capability or parsed from a cross-seed candidate's file list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentFile {
    /// Path relative to the torrent's content root.
    pub relative_path: String,
    /// File size in bytes.
    pub size: i64,
}

/// A precomputed, read-only view of one torrent, built by the worker ahead
/// of rule evaluation. Every field named in the catalogue in
/// [`crate::field::Field`] has a corresponding member here; fields absent
/// from a given torrent (e.g. no tracker configured) are represented by
/// their type's natural empty/zero value, which the evaluator's
/// missing-field handling then treats as a failed leaf where appropriate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentView {
    /// Infohash, the torrent's stable identifier.
    pub hash: String,
    /// Display name.
    pub name: String,
    /// Current category.
    pub category: String,
    /// Current tags, already comma-joined as qBittorrent reports them.
    pub tags: String,
    /// Configured save path.
    pub save_path: String,
    /// Resolved content path.
    pub content_path: String,
    /// Primary tracker domain.
    pub tracker: String,
    /// User comment field.
    pub comment: String,
    /// qBittorrent torrent state string.
    pub state: String,
    /// Release-parser-derived title, if parseable.
    pub rls_title: String,
    /// Release-parser-derived group, if parseable.
    pub rls_group: String,
    /// Release-parser-derived resolution, if parseable.
    pub rls_resolution: String,
    /// Release-parser-derived source, if parseable.
    pub rls_source: String,

    /// Content size, excluding cross-seed dedupe.
    pub size: i64,
    /// Total size including every file in the torrent.
    pub total_size: i64,
    /// Bytes downloaded so far.
    pub downloaded: i64,
    /// Bytes uploaded so far.
    pub uploaded: i64,
    /// Bytes remaining to download.
    pub amount_left: i64,
    /// Free space on the save path's filesystem, resolved per the rule's
    /// `freeSpaceSource`; `None` when not yet resolved for this evaluation.
    pub free_space: Option<i64>,

    /// When the torrent was added, as a unix timestamp; `0` means unset.
    pub added_on: i64,
    /// When the torrent finished downloading; `0` means unset.
    pub completion_on: i64,
    /// Last observed peer activity; `0` means unset.
    pub last_activity: i64,
    /// Cumulative seeding time in seconds.
    pub seeding_time: i64,
    /// Cumulative active time in seconds.
    pub time_active: i64,
    /// Estimated seconds to completion.
    pub eta: i64,
    /// Seconds until next tracker reannounce.
    pub reannounce: i64,

    /// Upload/download ratio.
    pub ratio: f64,
    /// Download progress, `0.0..=1.0`.
    pub progress: f64,
    /// Piece availability across connected peers.
    pub availability: f64,
    /// Cross-seed popularity score.
    pub popularity: f64,

    /// Current download speed, bytes/s.
    pub dl_speed: i64,
    /// Current upload speed, bytes/s.
    pub up_speed: i64,
    /// Configured download limit, bytes/s (0 = unlimited).
    pub dl_limit: i64,
    /// Configured upload limit, bytes/s (0 = unlimited).
    pub up_limit: i64,

    /// Connected seeds.
    pub num_seeds: i64,
    /// Connected leechers.
    pub num_leechs: i64,
    /// Seeds reported by the tracker.
    pub num_complete: i64,
    /// Leechers reported by the tracker.
    pub num_incomplete: i64,
    /// Number of trackers configured on the torrent.
    pub trackers_count: i64,
    /// Size of the torrent's cross-seed group; `0` when ungrouped.
    pub group_size: i64,

    /// Whether the torrent is marked private.
    pub private: bool,
    /// Whether the tracker reports the torrent as unregistered.
    pub is_unregistered: bool,
    /// Whether any referenced file is missing from disk.
    pub has_missing_files: bool,
    /// Whether the torrent belongs to a cross-seed group.
    pub is_grouped: bool,

    /// Hardlink containment scope.
    pub hardlink_scope: HardlinkScope,

    /// Files making up this torrent, used by cross-seed verification and by
    /// `grouping` file-overlap checks.
    pub files: Vec<TorrentFile>,
}

/// One blocklisted infohash for an instance's cross-seed pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossSeedBlocklistEntry {
    /// Owning instance.
    pub instance_id: i64,
    /// Lowercased, trimmed infohash.
    pub infohash: String,
    /// Free-text reason the entry was blocked.
    pub note: Option<String>,
    /// When the entry was created.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl CrossSeedBlocklistEntry {
    /// Normalize a raw infohash the way blocklist lookups expect: lowercase
    /// and trimmed of surrounding whitespace.
    #[must_use]
    pub fn normalize_infohash(raw: &str) -> String {
        raw.trim().to_ascii_lowercase()
    }
}
