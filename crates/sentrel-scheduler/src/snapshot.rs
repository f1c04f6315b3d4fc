//! Capability for listing the current torrents on one instance.
//!
//! [`sentrel_actions::QbitClient`] only exposes mutating calls (the action
//! pipeline never needs to list torrents itself); the worker's tick needs a
//! read side to build the snapshot it then evaluates rules against, so the
//! scheduler defines its own small capability trait for it.

use async_trait::async_trait;

use sentrel_model::TorrentView;

use crate::error::SchedulerResult;

/// Snapshot source for one qBittorrent instance's torrents.
#[async_trait]
pub trait TorrentSource: Send + Sync {
    /// List every torrent currently known to the instance identified by
    /// `instance_id`.
    async fn list_torrents(&self, instance_id: i64) -> SchedulerResult<Vec<TorrentView>>;
}
