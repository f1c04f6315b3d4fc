//! BEP 3 v1 infohash computation, including the Gazelle source-flag
//! annotation used to derive a tracker-specific variant hash.

use sha1::{Digest, Sha1};

use crate::bencode::BencodeValue;

/// Compute the v1 infohash of an `info` dictionary: `sha1(encode(info))`,
/// rendered as lowercase hex.
#[must_use]
pub fn info_hash(info: &BencodeValue) -> String {
    hex::encode(Sha1::digest(info.encode()))
}

/// Return a copy of `info` with its `source` field set to `source_flag`,
/// the convention Gazelle-style trackers use to mint a tracker-specific
/// infohash variant for the same payload.
#[must_use]
pub fn with_source_flag(info: &BencodeValue, source_flag: &str) -> BencodeValue {
    let mut entries = info.as_dict().cloned().unwrap_or_default();
    entries.insert("source".to_string(), BencodeValue::string(source_flag));
    BencodeValue::Dict(entries)
}

/// Compute both infohash variants needed by the hash-search step: the
/// torrent's own (unmodified) infohash, and the variant produced once
/// `info.source` is set to the remote's source flag.
#[must_use]
pub fn dual_info_hash(info: &BencodeValue, source_flag: &str) -> (String, String) {
    let unmodified = info_hash(info);
    let annotated = info_hash(&with_source_flag(info, source_flag));
    (unmodified, annotated)
}
