//! The cross-seed matching pipeline: hash search, then filename search
//! with size and file-list verification.

use sentrel_limits::CancelToken;
use sentrel_model::TorrentFile;

use crate::bencode;
use crate::error::CrossSeedResult;
use crate::filename;
use crate::gazelle::GazelleApi;
use crate::infohash;

/// A local torrent as presented to the matcher.
pub struct LocalTorrentContext<'a> {
    /// Raw bencoded `.torrent` metadata, if available. Required for the
    /// hash-search step; filename search still runs without it.
    pub bencoded_metadata: Option<&'a [u8]>,
    /// Sum of every file's size.
    pub total_size: i64,
    /// The local file list, used for both filename search and file-list
    /// verification.
    pub files: &'a [TorrentFile],
}

/// A remote Gazelle-style tracker target.
pub struct RemoteTarget {
    /// Hostname, used only for labelling the returned match.
    pub host: String,
    /// The `info.source` flag this tracker embeds into its infohash
    /// variant (e.g. `"RED"`, `"OPS"`).
    pub source_flag: String,
}

/// How a [`CrossSeedMatch`] was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchReason {
    /// Found via the source-annotated infohash.
    Hash,
    /// Found via filename search and file-list verification.
    Filelist,
}

/// A confirmed cross-seed match, ready for download and injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossSeedMatch {
    /// The remote tracker's host.
    pub host: String,
    /// Why this candidate was accepted.
    pub reason: MatchReason,
    /// The remote torrent id.
    pub torrent_id: i64,
    /// The remote release group id, if known.
    pub group_id: Option<i64>,
    /// The remote torrent's total size.
    pub size: i64,
}

const SIZE_TOLERANCE_FRACTION: f64 = 0.10;

/// Whether `candidate_size` is close enough to `total_size` to warrant a
/// file-list verification pass (within 10%, but not an exact match).
#[must_use]
pub fn within_tolerance(total_size: i64, candidate_size: i64) -> bool {
    if total_size == 0 {
        return candidate_size == 0;
    }
    let diff = candidate_size.abs_diff(total_size) as f64;
    diff <= SIZE_TOLERANCE_FRACTION * (total_size as f64)
}

/// Run the full matching pipeline against one remote target: hash search
/// first, then filename search with size and file-list verification.
///
/// # Errors
///
/// Returns an error if the local metadata fails to decode, a remote call
/// fails, or the context is cancelled.
pub async fn find_match(
    api: &dyn GazelleApi,
    remote: &RemoteTarget,
    local: &LocalTorrentContext<'_>,
    cancel: &mut CancelToken,
) -> CrossSeedResult<Option<CrossSeedMatch>> {
    if let Some(hit) = hash_search(api, remote, local, cancel).await? {
        return Ok(Some(hit));
    }
    filename_search(api, remote, local, cancel).await
}

async fn hash_search(
    api: &dyn GazelleApi,
    remote: &RemoteTarget,
    local: &LocalTorrentContext<'_>,
    cancel: &mut CancelToken,
) -> CrossSeedResult<Option<CrossSeedMatch>> {
    let Some(metadata) = local.bencoded_metadata else {
        return Ok(None);
    };
    let decoded = bencode::decode(metadata)?;
    let Some(info) = decoded.as_dict().and_then(|entries| entries.get("info")) else {
        return Ok(None);
    };
    let (_unmodified, annotated) = infohash::dual_info_hash(info, &remote.source_flag);

    let Some(torrent) = api.torrent_by_hash(&annotated, cancel).await? else {
        return Ok(None);
    };
    Ok(Some(CrossSeedMatch {
        host: remote.host.clone(),
        reason: MatchReason::Hash,
        torrent_id: torrent.id,
        group_id: Some(torrent.group_id),
        size: torrent.size,
    }))
}

async fn filename_search(
    api: &dyn GazelleApi,
    remote: &RemoteTarget,
    local: &LocalTorrentContext<'_>,
    cancel: &mut CancelToken,
) -> CrossSeedResult<Option<CrossSeedMatch>> {
    for name in filename::search_filenames(local.files) {
        for candidate in api.browse_by_filename(&name, cancel).await? {
            if candidate.size == local.total_size {
                return Ok(Some(CrossSeedMatch {
                    host: remote.host.clone(),
                    reason: MatchReason::Filelist,
                    torrent_id: candidate.torrent_id,
                    group_id: candidate.group_id,
                    size: candidate.size,
                }));
            }
            if within_tolerance(local.total_size, candidate.size) {
                let remote_files = api.file_list(candidate.torrent_id, cancel).await?;
                if !files_conflict(local.files, &remote_files) {
                    return Ok(Some(CrossSeedMatch {
                        host: remote.host.clone(),
                        reason: MatchReason::Filelist,
                        torrent_id: candidate.torrent_id,
                        group_id: candidate.group_id,
                        size: candidate.size,
                    }));
                }
            }
        }
    }
    Ok(None)
}

/// Whether the local and remote file lists disagree, after normalising
/// path separators and stripping a consistent single-root folder from
/// each side.
#[must_use]
pub fn files_conflict(local: &[TorrentFile], remote: &[TorrentFile]) -> bool {
    let mut local_set = normalized_multiset(local);
    let mut remote_set = normalized_multiset(remote);
    local_set.sort();
    remote_set.sort();
    local_set != remote_set
}

fn normalized_multiset(files: &[TorrentFile]) -> Vec<(i64, String)> {
    let paths: Vec<String> = files.iter().map(|file| file.relative_path.replace('\\', "/")).collect();
    let stripped = strip_single_root(&paths);
    files.iter().zip(stripped).map(|(file, path)| (file.size, path)).collect()
}

fn strip_single_root(paths: &[String]) -> Vec<String> {
    if paths.len() < 2 || !paths.iter().all(|path| path.contains('/')) {
        return paths.to_vec();
    }
    let mut roots = paths.iter().filter_map(|path| path.split('/').next());
    let Some(first_root) = roots.next() else {
        return paths.to_vec();
    };
    if roots.all(|root| root == first_root) {
        paths.iter().map(|path| path.splitn(2, '/').nth(1).unwrap_or(path).to_string()).collect()
    } else {
        paths.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sentrel_limits::cancel_pair;

    use crate::error::CrossSeedResult;
    use crate::gazelle::{GazelleCandidate, GazelleTorrent};

    fn file(path: &str, size: i64) -> TorrentFile {
        TorrentFile { relative_path: path.to_string(), size }
    }

    #[test]
    fn within_tolerance_accepts_up_to_ten_percent() {
        assert!(within_tolerance(1_000_000, 1_050_000));
        assert!(!within_tolerance(1_000_000, 1_200_000));
    }

    #[test]
    fn files_conflict_ignores_a_shared_single_root_folder() {
        let local = vec![file("Album/01.flac", 100), file("Album/02.flac", 200)];
        let remote = vec![file("Other Root/01.flac", 100), file("Other Root/02.flac", 200)];
        assert!(!files_conflict(&local, &remote));
    }

    #[test]
    fn files_conflict_detects_a_differing_file() {
        let local = vec![file("Album/01.flac", 100), file("Album/02.flac", 200)];
        let remote = vec![file("Album/01.flac", 100), file("Album/02.flac", 128_000_000)];
        assert!(files_conflict(&local, &remote));
    }

    struct StubApi {
        hash_hit: Option<GazelleTorrent>,
        browse_candidates: Vec<GazelleCandidate>,
        remote_files: Vec<TorrentFile>,
    }

    #[async_trait]
    impl GazelleApi for StubApi {
        async fn torrent_by_hash(
            &self,
            _hash: &str,
            _cancel: &mut sentrel_limits::CancelToken,
        ) -> CrossSeedResult<Option<GazelleTorrent>> {
            Ok(self.hash_hit.clone())
        }

        async fn browse_by_filename(
            &self,
            _filename: &str,
            _cancel: &mut sentrel_limits::CancelToken,
        ) -> CrossSeedResult<Vec<GazelleCandidate>> {
            Ok(self.browse_candidates.clone())
        }

        async fn file_list(
            &self,
            _torrent_id: i64,
            _cancel: &mut sentrel_limits::CancelToken,
        ) -> CrossSeedResult<Vec<TorrentFile>> {
            Ok(self.remote_files.clone())
        }

        async fn download(&self, _torrent_id: i64, _cancel: &mut sentrel_limits::CancelToken) -> CrossSeedResult<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn hash_match_short_circuits_without_browsing() {
        let api = StubApi {
            hash_hit: Some(GazelleTorrent {
                id: 42,
                group_id: 7,
                group_name: "Artist - Album".to_string(),
                size: 123,
                files: Vec::new(),
            }),
            browse_candidates: vec![GazelleCandidate { torrent_id: 99, group_id: None, size: 123, title: String::new() }],
            remote_files: Vec::new(),
        };
        let mut info = std::collections::BTreeMap::new();
        info.insert("name".to_string(), crate::bencode::BencodeValue::string("x"));
        let mut outer = std::collections::BTreeMap::new();
        outer.insert("info".to_string(), crate::bencode::BencodeValue::Dict(info));
        let metadata = crate::bencode::BencodeValue::Dict(outer).encode();

        let local = LocalTorrentContext { bencoded_metadata: Some(&metadata), total_size: 123, files: &[] };
        let remote = RemoteTarget { host: "redacted.sh".to_string(), source_flag: "RED".to_string() };
        let (_handle, mut cancel) = cancel_pair();

        let result = find_match(&api, &remote, &local, &mut cancel).await.unwrap().unwrap();
        assert_eq!(result.reason, MatchReason::Hash);
        assert_eq!(result.torrent_id, 42);
        assert_eq!(result.host, "redacted.sh");
    }

    #[tokio::test]
    async fn filelist_conflict_rejects_the_candidate() {
        let local_files = [file("Artist - 01 Track.flac", 100), file("Artist - 02 Track.flac", 200)];
        let api = StubApi {
            hash_hit: None,
            browse_candidates: vec![GazelleCandidate { torrent_id: 5, group_id: None, size: 310, title: String::new() }],
            remote_files: vec![file("Artist - 01 Track.flac", 100), file("Artist - 02 Track.flac", 128_000_000 + 200)],
        };
        let local = LocalTorrentContext { bencoded_metadata: None, total_size: 300, files: &local_files };
        let remote = RemoteTarget { host: "redacted.sh".to_string(), source_flag: "RED".to_string() };
        let (_handle, mut cancel) = cancel_pair();

        let result = find_match(&api, &remote, &local, &mut cancel).await.unwrap();
        assert!(result.is_none());
    }
}
