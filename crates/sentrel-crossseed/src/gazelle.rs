//! Gazelle-style tracker API client: hash lookup, filename browse, file
//! list fetch, and the guarded torrent download.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use sentrel_limits::{CancelToken, TokenBucket};
use sentrel_model::TorrentFile;

use crate::bencode::{self, BencodeValue};
use crate::error::{CrossSeedError, CrossSeedResult};

const MISS_PHRASES: &[&str] = &["bad id parameter", "bad parameters", "bad hash parameter"];

/// A torrent returned by `action=torrent`, keyed by hash or by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GazelleTorrent {
    /// The remote torrent id.
    pub id: i64,
    /// The owning release group id.
    pub group_id: i64,
    /// Release group display name.
    pub group_name: String,
    /// Total size in bytes.
    pub size: i64,
    /// Parsed file list.
    pub files: Vec<TorrentFile>,
}

/// A candidate returned by `action=browse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GazelleCandidate {
    /// The remote torrent id.
    pub torrent_id: i64,
    /// The owning release group id, if the endpoint reported one.
    pub group_id: Option<i64>,
    /// Total size in bytes.
    pub size: i64,
    /// Human-readable title, for logging only.
    pub title: String,
}

/// The capability the matcher needs from a Gazelle-style tracker. Injected
/// so [`crate::matcher::find_match`] is testable without a live HTTP
/// dependency.
#[async_trait]
pub trait GazelleApi: Send + Sync {
    /// Look up a torrent by its (source-annotated) infohash.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-miss remote error, or
    /// cancellation.
    async fn torrent_by_hash(&self, hash: &str, cancel: &mut CancelToken) -> CrossSeedResult<Option<GazelleTorrent>>;

    /// Browse candidates matching a search filename.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-miss remote error, or
    /// cancellation.
    async fn browse_by_filename(
        &self,
        filename: &str,
        cancel: &mut CancelToken,
    ) -> CrossSeedResult<Vec<GazelleCandidate>>;

    /// Fetch a candidate's file list for verification.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-miss remote error, or
    /// cancellation.
    async fn file_list(&self, torrent_id: i64, cancel: &mut CancelToken) -> CrossSeedResult<Vec<TorrentFile>>;

    /// Download a torrent's bencoded payload, applying the download guard.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a failed download guard, or
    /// cancellation.
    async fn download(&self, torrent_id: i64, cancel: &mut CancelToken) -> CrossSeedResult<Vec<u8>>;
}

/// HTTP-backed [`GazelleApi`]. Every call awaits the host's shared
/// [`TokenBucket`] before issuing the request, and applies the endpoint's
/// call-scoped timeout.
pub struct GazelleHttpClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    limiter: Arc<TokenBucket>,
    timeout: Duration,
}

impl GazelleHttpClient {
    /// Construct a client bound to `base_url`, authenticating with
    /// `api_key` and rate-limited by `limiter`.
    #[must_use]
    pub fn new(base_url: Url, api_key: impl Into<String>, limiter: Arc<TokenBucket>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key: api_key.into(),
            limiter,
            timeout,
        }
    }

    async fn ajax(
        &self,
        action: &str,
        params: &[(&str, &str)],
        cancel: &mut CancelToken,
    ) -> CrossSeedResult<Option<serde_json::Value>> {
        self.limiter.wait(cancel).await?;

        let mut url = self.base_url.clone();
        url.set_path("ajax.php");
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("action", action);
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }

        let response = self
            .client
            .get(url)
            .header("Authorization", &self.api_key)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;

        let envelope: AjaxEnvelope = response.json().await?;
        if envelope.status != "success" {
            let message = envelope.error.unwrap_or_else(|| "unknown gazelle error".to_string());
            if is_miss(&message) {
                tracing::debug!(action, %message, "gazelle ajax call missed");
                return Ok(None);
            }
            tracing::warn!(action, %message, "gazelle ajax call failed");
            return Err(CrossSeedError::Remote(message));
        }
        Ok(envelope.response)
    }
}

#[async_trait]
impl GazelleApi for GazelleHttpClient {
    async fn torrent_by_hash(&self, hash: &str, cancel: &mut CancelToken) -> CrossSeedResult<Option<GazelleTorrent>> {
        let Some(response) = self.ajax("torrent", &[("hash", hash)], cancel).await? else {
            return Ok(None);
        };
        let parsed: HashSearchResponse = serde_json::from_value(response)
            .map_err(|_| CrossSeedError::Remote("malformed torrent response".to_string()))?;
        Ok(Some(GazelleTorrent {
            id: parsed.torrent.id,
            group_id: parsed.group.id,
            group_name: parsed.group.name,
            size: parsed.torrent.size,
            files: parse_file_list(&parsed.torrent.file_list),
        }))
    }

    async fn browse_by_filename(
        &self,
        filename: &str,
        cancel: &mut CancelToken,
    ) -> CrossSeedResult<Vec<GazelleCandidate>> {
        let Some(response) = self.ajax("browse", &[("filelist", filename)], cancel).await? else {
            return Ok(Vec::new());
        };
        let parsed: BrowseResponse = serde_json::from_value(response)
            .map_err(|_| CrossSeedError::Remote("malformed browse response".to_string()))?;
        Ok(parsed
            .results
            .into_iter()
            .map(|result| GazelleCandidate {
                torrent_id: result.torrent_id,
                group_id: result.group_id,
                size: result.size,
                title: format!("{} - {}", result.artist, result.group_name),
            })
            .collect())
    }

    async fn file_list(&self, torrent_id: i64, cancel: &mut CancelToken) -> CrossSeedResult<Vec<TorrentFile>> {
        let id = torrent_id.to_string();
        let Some(response) = self.ajax("torrent", &[("id", &id)], cancel).await? else {
            return Ok(Vec::new());
        };
        let parsed: HashSearchResponse = serde_json::from_value(response)
            .map_err(|_| CrossSeedError::Remote("malformed torrent response".to_string()))?;
        Ok(parse_file_list(&parsed.torrent.file_list))
    }

    async fn download(&self, torrent_id: i64, cancel: &mut CancelToken) -> CrossSeedResult<Vec<u8>> {
        self.limiter.wait(cancel).await?;

        let mut url = self.base_url.clone();
        url.set_path("ajax.php");
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("action", "download");
            query.append_pair("id", &torrent_id.to_string());
        }

        let bytes = self
            .client
            .get(url)
            .header("Authorization", &self.api_key)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        guard_download(&bytes)?;
        Ok(bytes.to_vec())
    }
}

/// Validate a downloaded payload: it must decode as a bencoded dict whose
/// `info` key is itself a dict. If it instead parses as the Gazelle ajax
/// error envelope, surface the human-readable error.
///
/// # Errors
///
/// Returns [`CrossSeedError::Remote`] if the body is an ajax error
/// envelope, or [`CrossSeedError::InvalidDownload`] if it is neither a
/// valid torrent nor a recognisable error envelope.
pub fn guard_download(bytes: &[u8]) -> CrossSeedResult<()> {
    match bencode::decode(bytes) {
        Ok(BencodeValue::Dict(entries)) if matches!(entries.get("info"), Some(BencodeValue::Dict(_))) => Ok(()),
        _ => {
            if let Ok(envelope) = serde_json::from_slice::<AjaxEnvelope>(bytes) {
                if envelope.status != "success" {
                    let message = envelope.error.unwrap_or_else(|| "unknown gazelle error".to_string());
                    tracing::warn!(%message, "gazelle download rejected by remote");
                    return Err(CrossSeedError::Remote(message));
                }
            }
            tracing::warn!("gazelle download guard rejected a malformed payload");
            Err(CrossSeedError::InvalidDownload("payload is not a valid bencoded torrent"))
        }
    }
}

/// Parse a Gazelle `fileList` string: entries separated by `"|||"`, with
/// `"{{{size}}}"` between a file's name and its size in bytes.
#[must_use]
pub fn parse_file_list(raw: &str) -> Vec<TorrentFile> {
    raw.split("|||")
        .filter_map(|entry| {
            let (name, size) = entry.split_once("{{{size}}}")?;
            let size: i64 = size.trim().parse().ok()?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(TorrentFile { relative_path: name.to_string(), size })
        })
        .collect()
}

fn is_miss(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    MISS_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

#[derive(Debug, Deserialize)]
struct AjaxEnvelope {
    status: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    response: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct HashSearchResponse {
    group: GroupInfo,
    torrent: TorrentInfo,
}

#[derive(Debug, Deserialize)]
struct GroupInfo {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TorrentInfo {
    id: i64,
    size: i64,
    #[serde(rename = "fileList", default)]
    file_list: String,
}

#[derive(Debug, Deserialize)]
struct BrowseResponse {
    #[serde(default)]
    results: Vec<BrowseResult>,
}

#[derive(Debug, Deserialize)]
struct BrowseResult {
    #[serde(rename = "torrentId")]
    torrent_id: i64,
    #[serde(rename = "groupId", default)]
    group_id: Option<i64>,
    size: i64,
    #[serde(default)]
    artist: String,
    #[serde(rename = "groupName", default)]
    group_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_file_list_splits_on_separators() {
        let raw = "Artist - 01 Track.flac{{{size}}}123456|||Artist - 02 Track.flac{{{size}}}654321";
        let files = parse_file_list(raw);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].relative_path, "Artist - 01 Track.flac");
        assert_eq!(files[0].size, 123_456);
        assert_eq!(files[1].size, 654_321);
    }

    #[test]
    fn guard_download_accepts_a_well_formed_torrent() {
        let mut info = std::collections::BTreeMap::new();
        info.insert("name".to_string(), BencodeValue::string("x"));
        let mut outer = std::collections::BTreeMap::new();
        outer.insert("info".to_string(), BencodeValue::Dict(info));
        let bytes = BencodeValue::Dict(outer).encode();
        assert!(guard_download(&bytes).is_ok());
    }

    #[test]
    fn guard_download_rejects_a_dict_without_an_info_table() {
        let mut outer = std::collections::BTreeMap::new();
        outer.insert("name".to_string(), BencodeValue::string("x"));
        let bytes = BencodeValue::Dict(outer).encode();
        assert!(matches!(guard_download(&bytes), Err(CrossSeedError::InvalidDownload(_))));
    }

    #[test]
    fn guard_download_surfaces_the_ajax_error_envelope() {
        let body = br#"{"status":"failure","error":"bad id parameter"}"#;
        let err = guard_download(body).unwrap_err();
        assert!(matches!(err, CrossSeedError::Remote(message) if message == "bad id parameter"));
    }

    #[test]
    fn is_miss_matches_known_phrases_case_insensitively() {
        assert!(is_miss("Bad Hash Parameter"));
        assert!(is_miss("bad parameters"));
        assert!(!is_miss("internal server error"));
    }
}
