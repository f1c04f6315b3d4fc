//! The torrent-view field catalogue referenced by condition leaves.

use serde::{Deserialize, Serialize};

/// A field resolvable against a [`crate::torrent::TorrentView`].
///
/// Variant names mirror the wire vocabulary in the data model (`NAME`,
/// `SAVE_PATH`, `RATIO`, …) so that condition JSON round-trips without a
/// translation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Field {
    // -- string fields --
    /// Torrent display name.
    Name,
    /// Current category.
    Category,
    /// Comma-separated tag list.
    Tags,
    /// Configured save path.
    SavePath,
    /// Resolved content path (save path plus root item, if any).
    ContentPath,
    /// Primary tracker domain.
    Tracker,
    /// User comment field.
    Comment,
    /// qBittorrent torrent state string.
    State,
    /// Release-parser-derived title.
    RlsTitle,
    /// Release-parser-derived group.
    RlsGroup,
    /// Release-parser-derived resolution.
    RlsResolution,
    /// Release-parser-derived source.
    RlsSource,

    // -- byte counters --
    /// Content size, excluding cross-seed dedupe.
    Size,
    /// Total size including every file in the torrent.
    TotalSize,
    /// Bytes downloaded so far.
    Downloaded,
    /// Bytes uploaded so far.
    Uploaded,
    /// Bytes remaining to download.
    AmountLeft,
    /// Free space on the save path's filesystem, per `freeSpaceSource`.
    FreeSpace,

    // -- temporal fields (seconds-resolution unix timestamps) --
    /// When the torrent was added.
    AddedOn,
    /// When the torrent finished downloading.
    CompletionOn,
    /// Last observed peer activity.
    LastActivity,
    /// Cumulative seeding time in seconds.
    SeedingTime,
    /// Cumulative active time in seconds.
    TimeActive,
    /// Estimated seconds to completion.
    Eta,
    /// Seconds until next tracker reannounce.
    Reannounce,
    /// `now - AddedOn`.
    AddedOnAge,
    /// `now - CompletionOn`.
    CompletionOnAge,
    /// `now - LastActivity`.
    LastActivityAge,

    // -- float fields --
    /// Upload/download ratio.
    Ratio,
    /// Download progress, `0.0..=1.0`.
    Progress,
    /// Piece availability across connected peers.
    Availability,
    /// Cross-seed popularity score.
    Popularity,

    // -- speed fields --
    /// Current download speed, bytes/s.
    DlSpeed,
    /// Current upload speed, bytes/s.
    UpSpeed,
    /// Configured download limit, bytes/s (0 = unlimited).
    DlLimit,
    /// Configured upload limit, bytes/s (0 = unlimited).
    UpLimit,

    // -- count fields --
    /// Connected seeds.
    NumSeeds,
    /// Connected leechers.
    NumLeechs,
    /// Seeds reported by the tracker.
    NumComplete,
    /// Leechers reported by the tracker.
    NumIncomplete,
    /// Number of trackers configured on the torrent.
    TrackersCount,
    /// Size of the torrent's cross-seed group, if grouped.
    GroupSize,

    // -- boolean fields --
    /// Whether the torrent is marked private.
    Private,
    /// Whether the tracker reports the torrent as unregistered.
    IsUnregistered,
    /// Whether any referenced file is missing from disk.
    HasMissingFiles,
    /// Whether the torrent belongs to a cross-seed group.
    IsGrouped,

    // -- enum fields --
    /// Hardlink containment scope.
    HardlinkScope,
}

/// How a [`Field`]'s value should be compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Case-insensitive string comparisons, `CONTAINS`/`MATCHES` etc.
    String,
    /// Numeric comparisons; integer/float mismatches coerce to float.
    Numeric,
    /// `EQUAL`/`NOT_EQUAL` against literal `true`/`false`.
    Boolean,
    /// A fixed enumeration (currently only `HARDLINK_SCOPE`).
    Enum,
    /// Seconds-resolution unix timestamp; supports the `*_AGE` derivation.
    Temporal,
}

impl Field {
    /// The comparison semantics this field uses.
    #[must_use]
    pub const fn kind(self) -> FieldKind {
        match self {
            Self::Name
            | Self::Category
            | Self::Tags
            | Self::SavePath
            | Self::ContentPath
            | Self::Tracker
            | Self::Comment
            | Self::State
            | Self::RlsTitle
            | Self::RlsGroup
            | Self::RlsResolution
            | Self::RlsSource => FieldKind::String,
            Self::Size
            | Self::TotalSize
            | Self::Downloaded
            | Self::Uploaded
            | Self::AmountLeft
            | Self::FreeSpace
            | Self::Ratio
            | Self::Progress
            | Self::Availability
            | Self::Popularity
            | Self::DlSpeed
            | Self::UpSpeed
            | Self::DlLimit
            | Self::UpLimit
            | Self::NumSeeds
            | Self::NumLeechs
            | Self::NumComplete
            | Self::NumIncomplete
            | Self::TrackersCount
            | Self::GroupSize
            | Self::AddedOnAge
            | Self::CompletionOnAge
            | Self::LastActivityAge => FieldKind::Numeric,
            Self::AddedOn
            | Self::CompletionOn
            | Self::LastActivity
            | Self::SeedingTime
            | Self::TimeActive
            | Self::Eta
            | Self::Reannounce => FieldKind::Temporal,
            Self::Private | Self::IsUnregistered | Self::HasMissingFiles | Self::IsGrouped => {
                FieldKind::Boolean
            }
            Self::HardlinkScope => FieldKind::Enum,
        }
    }

    /// Whether this field splits its string value on commas and matches per
    /// element (currently only `TAGS`).
    #[must_use]
    pub const fn is_multi_valued(self) -> bool {
        matches!(self, Self::Tags)
    }

    /// Whether this field is an `*_AGE` derivation of a temporal field, and
    /// if so, which one it derives from.
    #[must_use]
    pub const fn age_source(self) -> Option<Self> {
        match self {
            Self::AddedOnAge => Some(Self::AddedOn),
            Self::CompletionOnAge => Some(Self::CompletionOn),
            Self::LastActivityAge => Some(Self::LastActivity),
            _ => None,
        }
    }
}

/// Enumerated values accepted by the `HARDLINK_SCOPE` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardlinkScope {
    /// No file in the torrent has a link count greater than one.
    None,
    /// All hardlinks are contained within the qBittorrent torrent set.
    TorrentsOnly,
    /// At least one hardlink leaks outside the qBittorrent torrent set.
    OutsideQbittorrent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_is_multi_valued_and_others_are_not() {
        assert!(Field::Tags.is_multi_valued());
        assert!(!Field::Name.is_multi_valued());
    }

    #[test]
    fn age_fields_derive_from_their_timestamp_source() {
        assert_eq!(Field::AddedOnAge.age_source(), Some(Field::AddedOn));
        assert_eq!(Field::Name.age_source(), None);
    }

    #[test]
    fn field_kind_matches_catalogue_categories() {
        assert_eq!(Field::Name.kind(), FieldKind::String);
        assert_eq!(Field::Size.kind(), FieldKind::Numeric);
        assert_eq!(Field::Private.kind(), FieldKind::Boolean);
        assert_eq!(Field::HardlinkScope.kind(), FieldKind::Enum);
        assert_eq!(Field::AddedOn.kind(), FieldKind::Temporal);
    }
}
