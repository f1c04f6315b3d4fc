//! HTTP-backed qBittorrent WebUI client: the concrete adapter for the
//! [`sentrel_actions::QbitClient`] and [`sentrel_scheduler::TorrentSource`]
//! capability traits both declare as injected collaborators.
//!
//! `reqwest` is pinned without the `cookies` feature workspace-wide, so the
//! WebUI session cookie (`SID`) is captured from the login response and
//! attached to every subsequent request by hand, the same shape
//! [`sentrel_crossseed::gazelle::GazelleHttpClient`] uses for its
//! `Authorization` header.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use url::Url;

use sentrel_actions::{ActionsError, ActionsResult, QbitClient};
use sentrel_limits::{cancel_pair, CancelToken, TokenBucket};
use sentrel_model::{HardlinkScope, TorrentView};
use sentrel_scheduler::{SchedulerError, SchedulerResult, TorrentSource};

/// WebUI credentials for one instance.
#[derive(Debug, Clone)]
pub struct QbitCredentials {
    /// WebUI base URL, e.g. `http://localhost:8080`.
    pub base_url: Url,
    /// WebUI username.
    pub username: String,
    /// WebUI password.
    pub password: String,
}

/// HTTP-backed qBittorrent WebUI client. Logs in lazily on first use and
/// retries the login once on a `403` before failing a call, matching the
/// WebUI's own session-expiry behaviour.
pub struct QbitHttpClient {
    client: reqwest::Client,
    credentials: QbitCredentials,
    limiter: Arc<TokenBucket>,
    timeout: Duration,
    session: RwLock<Option<String>>,
}

impl QbitHttpClient {
    /// Construct a client for one instance, rate-limited by `limiter` and
    /// bounded by `timeout` per call.
    #[must_use]
    pub fn new(credentials: QbitCredentials, limiter: Arc<TokenBucket>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            limiter,
            timeout,
            session: RwLock::new(None),
        }
    }

    async fn login(&self) -> Result<String, reqwest::Error> {
        let mut url = self.credentials.base_url.clone();
        url.set_path("api/v2/auth/login");
        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .form(&[("username", &self.credentials.username), ("password", &self.credentials.password)])
            .send()
            .await?
            .error_for_status()?;

        let cookie = response
            .headers()
            .get(reqwest::header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| raw.split(';').next())
            .unwrap_or_default()
            .to_string();
        Ok(cookie)
    }

    async fn session_cookie(&self) -> Result<String, reqwest::Error> {
        if let Some(cookie) = self.session.read().await.clone() {
            return Ok(cookie);
        }
        let cookie = self.login().await?;
        *self.session.write().await = Some(cookie.clone());
        Ok(cookie)
    }

    async fn post(&self, cancel: &mut CancelToken, path: &str, form: &[(&str, String)]) -> Result<reqwest::Response, QbitCallError> {
        self.limiter.wait(cancel).await?;
        let cookie = self.session_cookie().await?;
        let mut url = self.credentials.base_url.clone();
        url.set_path(path);
        let response = self.client.post(url.clone()).timeout(self.timeout).header(reqwest::header::COOKIE, &cookie).form(form).send().await?;

        if response.status() == reqwest::StatusCode::FORBIDDEN {
            *self.session.write().await = None;
            let cookie = self.session_cookie().await?;
            return Ok(self.client.post(url).timeout(self.timeout).header(reqwest::header::COOKIE, &cookie).form(form).send().await?.error_for_status()?);
        }
        Ok(response.error_for_status()?)
    }

    fn hashes_param(hashes: &[String]) -> String {
        hashes.join("|")
    }
}

/// Unifies the two failure modes a WebUI call can hit: the rate limiter's
/// wait was cancelled, or the HTTP transport itself failed.
#[derive(Debug, thiserror::Error)]
enum QbitCallError {
    #[error("rate limiter wait failed: {0}")]
    Limiter(#[from] sentrel_limits::LimitsError),
    #[error("qbittorrent http call failed: {0}")]
    Http(#[from] reqwest::Error),
}

fn map_http_err(source: QbitCallError) -> ActionsError {
    ActionsError::Client(source.to_string())
}

#[async_trait]
impl QbitClient for QbitHttpClient {
    async fn add_tags(&self, hashes: &[String], tags: &[String], cancel: &mut CancelToken) -> ActionsResult<()> {
        self.post(cancel, "api/v2/torrents/addTags", &[("hashes", Self::hashes_param(hashes)), ("tags", tags.join(","))])
            .await
            .map(drop)
            .map_err(map_http_err)
    }

    async fn remove_tags(&self, hashes: &[String], tags: &[String], cancel: &mut CancelToken) -> ActionsResult<()> {
        self.post(cancel, "api/v2/torrents/removeTags", &[("hashes", Self::hashes_param(hashes)), ("tags", tags.join(","))])
            .await
            .map(drop)
            .map_err(map_http_err)
    }

    async fn delete_tag(&self, tag: &str, cancel: &mut CancelToken) -> ActionsResult<()> {
        self.post(cancel, "api/v2/torrents/deleteTags", &[("tags", tag.to_string())]).await.map(drop).map_err(map_http_err)
    }

    async fn set_category(&self, hashes: &[String], category: &str, cancel: &mut CancelToken) -> ActionsResult<()> {
        self.post(cancel, "api/v2/torrents/setCategory", &[("hashes", Self::hashes_param(hashes)), ("category", category.to_string())])
            .await
            .map(drop)
            .map_err(map_http_err)
    }

    async fn set_location(&self, hashes: &[String], path: &str, cancel: &mut CancelToken) -> ActionsResult<()> {
        self.post(cancel, "api/v2/torrents/setLocation", &[("hashes", Self::hashes_param(hashes)), ("location", path.to_string())])
            .await
            .map(drop)
            .map_err(map_http_err)
    }

    async fn set_speed_limits(
        &self,
        hashes: &[String],
        upload_bytes_s: Option<i64>,
        download_bytes_s: Option<i64>,
        cancel: &mut CancelToken,
    ) -> ActionsResult<()> {
        let hashes = Self::hashes_param(hashes);
        if let Some(upload) = upload_bytes_s {
            self.post(cancel, "api/v2/torrents/setUploadLimit", &[("hashes", hashes.clone()), ("limit", upload.to_string())])
                .await
                .map_err(map_http_err)?;
        }
        if let Some(download) = download_bytes_s {
            self.post(cancel, "api/v2/torrents/setDownloadLimit", &[("hashes", hashes), ("limit", download.to_string())])
                .await
                .map_err(map_http_err)?;
        }
        Ok(())
    }

    async fn set_share_limits(
        &self,
        hashes: &[String],
        ratio_limit: Option<f64>,
        seeding_time_minutes: Option<i64>,
        cancel: &mut CancelToken,
    ) -> ActionsResult<()> {
        let ratio = ratio_limit.map_or_else(|| "-2".to_string(), |value| value.to_string());
        let seeding_time = seeding_time_minutes.map_or_else(|| "-2".to_string(), |value| value.to_string());
        self.post(
            cancel,
            "api/v2/torrents/setShareLimits",
            &[("hashes", Self::hashes_param(hashes)), ("ratioLimit", ratio), ("seedingTimeLimit", seeding_time)],
        )
        .await
        .map(drop)
        .map_err(map_http_err)
    }

    async fn pause(&self, hashes: &[String], cancel: &mut CancelToken) -> ActionsResult<()> {
        self.post(cancel, "api/v2/torrents/pause", &[("hashes", Self::hashes_param(hashes))]).await.map(drop).map_err(map_http_err)
    }

    async fn resume(&self, hashes: &[String], cancel: &mut CancelToken) -> ActionsResult<()> {
        self.post(cancel, "api/v2/torrents/resume", &[("hashes", Self::hashes_param(hashes))]).await.map(drop).map_err(map_http_err)
    }

    async fn recheck(&self, hashes: &[String], cancel: &mut CancelToken) -> ActionsResult<()> {
        self.post(cancel, "api/v2/torrents/recheck", &[("hashes", Self::hashes_param(hashes))]).await.map(drop).map_err(map_http_err)
    }

    async fn reannounce(&self, hashes: &[String], cancel: &mut CancelToken) -> ActionsResult<()> {
        self.post(cancel, "api/v2/torrents/reannounce", &[("hashes", Self::hashes_param(hashes))]).await.map(drop).map_err(map_http_err)
    }

    async fn delete(&self, hashes: &[String], delete_files: bool, cancel: &mut CancelToken) -> ActionsResult<()> {
        self.post(cancel, "api/v2/torrents/delete", &[("hashes", Self::hashes_param(hashes)), ("deleteFiles", delete_files.to_string())])
            .await
            .map(drop)
            .map_err(map_http_err)
    }
}

#[async_trait]
impl TorrentSource for QbitHttpClient {
    async fn list_torrents(&self, instance_id: i64) -> SchedulerResult<Vec<TorrentView>> {
        let to_snapshot_err = |reason: String| SchedulerError::Snapshot { instance_id, reason };
        let (_handle, mut cancel) = cancel_pair();

        let cookie = self.session_cookie().await.map_err(|err| to_snapshot_err(err.to_string()))?;
        let mut url = self.credentials.base_url.clone();
        url.set_path("api/v2/torrents/info");
        self.limiter.wait(&mut cancel).await.map_err(|err| to_snapshot_err(err.to_string()))?;

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .header(reqwest::header::COOKIE, &cookie)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| to_snapshot_err(err.to_string()))?;

        let raw: Vec<RawTorrent> = response.json().await.map_err(|err| to_snapshot_err(err.to_string()))?;
        Ok(raw.into_iter().map(RawTorrent::into_view).collect())
    }
}

/// The subset of `/api/v2/torrents/info` fields the evaluator's field
/// catalogue reads directly from the wire. Release-parser-derived fields
/// (`rls_*`), cross-seed grouping (`is_grouped`, `group_size`), and
/// unregistered-tracker detection are computed elsewhere and are not part
/// of this raw snapshot; they default to their empty/zero value here.
#[derive(Debug, Deserialize)]
struct RawTorrent {
    hash: String,
    name: String,
    category: String,
    tags: String,
    save_path: String,
    content_path: String,
    tracker: String,
    #[serde(default)]
    comment: String,
    state: String,
    size: i64,
    #[serde(default)]
    total_size: i64,
    downloaded: i64,
    uploaded: i64,
    amount_left: i64,
    added_on: i64,
    completion_on: i64,
    #[serde(default)]
    last_activity: i64,
    seeding_time: i64,
    time_active: i64,
    eta: i64,
    #[serde(default)]
    reannounce: i64,
    ratio: f64,
    progress: f64,
    #[serde(default)]
    availability: f64,
    dlspeed: i64,
    upspeed: i64,
    dl_limit: i64,
    up_limit: i64,
    num_seeds: i64,
    num_leechs: i64,
    num_complete: i64,
    num_incomplete: i64,
    #[serde(default)]
    trackers_count: i64,
}

impl RawTorrent {
    fn into_view(self) -> TorrentView {
        TorrentView {
            hash: self.hash,
            name: self.name,
            category: self.category,
            tags: self.tags,
            save_path: self.save_path,
            content_path: self.content_path,
            tracker: self.tracker,
            comment: self.comment,
            state: self.state,
            rls_title: String::new(),
            rls_group: String::new(),
            rls_resolution: String::new(),
            rls_source: String::new(),
            size: self.size,
            total_size: self.total_size,
            downloaded: self.downloaded,
            uploaded: self.uploaded,
            amount_left: self.amount_left,
            free_space: None,
            added_on: self.added_on,
            completion_on: self.completion_on,
            last_activity: self.last_activity,
            seeding_time: self.seeding_time,
            time_active: self.time_active,
            eta: self.eta,
            reannounce: self.reannounce,
            ratio: self.ratio,
            progress: self.progress,
            availability: self.availability,
            popularity: 0.0,
            dl_speed: self.dlspeed,
            up_speed: self.upspeed,
            dl_limit: self.dl_limit,
            up_limit: self.up_limit,
            num_seeds: self.num_seeds,
            num_leechs: self.num_leechs,
            num_complete: self.num_complete,
            num_incomplete: self.num_incomplete,
            trackers_count: self.trackers_count,
            group_size: 0,
            private: false,
            is_unregistered: false,
            has_missing_files: false,
            is_grouped: false,
            hardlink_scope: HardlinkScope::None,
            files: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_param_joins_with_pipes() {
        let hashes = vec!["a".to_string(), "b".to_string()];
        assert_eq!(QbitHttpClient::hashes_param(&hashes), "a|b");
    }
}
