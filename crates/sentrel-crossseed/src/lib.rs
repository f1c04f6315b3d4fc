#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Cross-seed matcher (C8): a bencode codec, a Gazelle-style tracker
//! client, the hash/filename matching pipeline, and the per-instance
//! cross-seed blocklist.

pub mod bencode;
pub mod blocklist;
pub mod error;
pub mod filename;
pub mod gazelle;
pub mod infohash;
pub mod matcher;

pub use bencode::{decode, encode, BencodeValue};
pub use blocklist::{BlockedLookup, CrossSeedBlocklistStore};
pub use error::{BencodeError, CrossSeedError, CrossSeedResult};
pub use filename::search_filenames;
pub use gazelle::{GazelleApi, GazelleCandidate, GazelleHttpClient, GazelleTorrent};
pub use infohash::{dual_info_hash, info_hash, with_source_flag};
pub use matcher::{find_match, files_conflict, within_tolerance, CrossSeedMatch, LocalTorrentContext, MatchReason, RemoteTarget};
