//! Reusable domain-object builders for cross-crate test suites.

use sentrel_model::{HardlinkScope, Instance, TorrentFile, TorrentView};

/// A well-formed [`Instance`] suitable as a default in tests that don't
/// care about its specific values.
#[must_use]
pub fn sample_instance() -> Instance {
    Instance {
        id: 1,
        name: "main".to_string(),
        url: "https://qbt.example.com:8080/".to_string(),
        username: "admin".to_string(),
        password_ct: "ct".to_string(),
        basic_username: None,
        basic_password_ct: None,
        tls_skip_verify: false,
    }
}

/// A well-formed [`TorrentView`] suitable as a default in tests that don't
/// care about its specific values; override fields with struct-update
/// syntax as needed.
#[must_use]
pub fn sample_torrent_view() -> TorrentView {
    TorrentView {
        hash: "0123456789abcdef0123456789abcdef01234567".to_string(),
        name: "Example.Release.2024.1080p".to_string(),
        category: "movies".to_string(),
        tags: String::new(),
        save_path: "/data/torrents".to_string(),
        content_path: "/data/torrents/Example.Release.2024.1080p".to_string(),
        tracker: "tracker.example".to_string(),
        comment: String::new(),
        state: "uploading".to_string(),
        rls_title: "Example Release".to_string(),
        rls_group: "GROUP".to_string(),
        rls_resolution: "1080p".to_string(),
        rls_source: "WEB".to_string(),
        size: 10_000_000_000,
        total_size: 10_000_000_000,
        downloaded: 10_000_000_000,
        uploaded: 5_000_000_000,
        amount_left: 0,
        free_space: Some(500_000_000_000),
        added_on: 1_700_000_000,
        completion_on: 1_700_003_600,
        last_activity: 1_700_100_000,
        seeding_time: 96_400,
        time_active: 100_000,
        eta: 0,
        reannounce: 0,
        ratio: 0.5,
        progress: 1.0,
        availability: 1.0,
        popularity: 0.1,
        dl_speed: 0,
        up_speed: 102_400,
        dl_limit: 0,
        up_limit: 0,
        num_seeds: 10,
        num_leechs: 2,
        num_complete: 20,
        num_incomplete: 3,
        trackers_count: 1,
        group_size: 0,
        private: true,
        is_unregistered: false,
        has_missing_files: false,
        is_grouped: false,
        hardlink_scope: HardlinkScope::None,
        files: vec![TorrentFile {
            relative_path: "Example.Release.2024.1080p.mkv".to_string(),
            size: 10_000_000_000,
        }],
    }
}
