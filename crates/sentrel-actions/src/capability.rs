//! Injected capabilities the action pipeline drives: the qBittorrent wire
//! client and external-program invocation. Both are out of scope for this
//! crate's own implementation; callers inject a concrete adapter.

use async_trait::async_trait;

use sentrel_limits::CancelToken;
use sentrel_model::{ExternalProgram, PathMapping};

use crate::error::ActionsResult;

/// Single-torrent and batch qBittorrent WebUI operations the pipeline
/// needs. Every method is idempotent: calling `pause` on an already-paused
/// torrent is not an error.
#[async_trait]
pub trait QbitClient: Send + Sync {
    /// Add `tags` to `hashes`.
    async fn add_tags(&self, hashes: &[String], tags: &[String], cancel: &mut CancelToken) -> ActionsResult<()>;
    /// Remove `tags` from `hashes`.
    async fn remove_tags(&self, hashes: &[String], tags: &[String], cancel: &mut CancelToken) -> ActionsResult<()>;
    /// Delete `tag` from the instance's known tag list entirely.
    async fn delete_tag(&self, tag: &str, cancel: &mut CancelToken) -> ActionsResult<()>;
    /// Reassign `hashes` to `category`.
    async fn set_category(&self, hashes: &[String], category: &str, cancel: &mut CancelToken) -> ActionsResult<()>;
    /// Move `hashes` to `path`.
    async fn set_location(&self, hashes: &[String], path: &str, cancel: &mut CancelToken) -> ActionsResult<()>;
    /// Set per-torrent upload/download speed caps in bytes/s; `None`
    /// leaves that direction unlimited.
    async fn set_speed_limits(
        &self,
        hashes: &[String],
        upload_bytes_s: Option<i64>,
        download_bytes_s: Option<i64>,
        cancel: &mut CancelToken,
    ) -> ActionsResult<()>;
    /// Set per-torrent share limits.
    async fn set_share_limits(
        &self,
        hashes: &[String],
        ratio_limit: Option<f64>,
        seeding_time_minutes: Option<i64>,
        cancel: &mut CancelToken,
    ) -> ActionsResult<()>;
    /// Pause `hashes`.
    async fn pause(&self, hashes: &[String], cancel: &mut CancelToken) -> ActionsResult<()>;
    /// Resume `hashes`.
    async fn resume(&self, hashes: &[String], cancel: &mut CancelToken) -> ActionsResult<()>;
    /// Force a hash recheck on `hashes`.
    async fn recheck(&self, hashes: &[String], cancel: &mut CancelToken) -> ActionsResult<()>;
    /// Force a tracker reannounce on `hashes`.
    async fn reannounce(&self, hashes: &[String], cancel: &mut CancelToken) -> ActionsResult<()>;
    /// Remove `hashes` from the client, optionally deleting payload files.
    async fn delete(&self, hashes: &[String], delete_files: bool, cancel: &mut CancelToken) -> ActionsResult<()>;
}

/// Launches an [`ExternalProgram`] invocation. Out of scope for this
/// crate: the concrete implementation shells out (or talks to a sidecar)
/// on the caller's behalf.
#[async_trait]
pub trait ExternalProgramRunner: Send + Sync {
    /// Invoke `program` once for the torrent identified by `hash`,
    /// substituting `path_mappings` into `args_template` ahead of launch.
    async fn invoke(
        &self,
        program: &ExternalProgram,
        hash: &str,
        path_mappings: &[PathMapping],
        cancel: &mut CancelToken,
    ) -> ActionsResult<()>;
}
