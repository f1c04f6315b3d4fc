//! Search-filename selection for the filename-lookup step of the matcher:
//! pick a handful of candidate names from a local torrent's file list,
//! preferring music files and excluding generic single-word names.

use std::collections::HashSet;
use std::path::Path;

use sentrel_model::TorrentFile;

const MAX_SEARCH_FILENAMES: usize = 5;

const MUSIC_EXTENSIONS: &[&str] = &["flac", "mp3", "dsf", "ape", "wav", "m4a", "ogg", "wv", "aac"];

const GENERIC_NAMES: &[&str] = &[
    "cover", "folder", "artwork", "front", "back", "booklet", "scans", "thumbs", "albumart", "art",
];

/// Build up to [`MAX_SEARCH_FILENAMES`] search candidates from `files`:
/// music-extension files first, then by descending scrubbed-name length,
/// excluding names that scrub down to a single generic token.
#[must_use]
pub fn search_filenames(files: &[TorrentFile]) -> Vec<String> {
    let mut candidates: Vec<(bool, usize, String)> = Vec::new();

    for file in files {
        let Some(file_name) = Path::new(&file.relative_path).file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let stem = Path::new(file_name).file_stem().and_then(|name| name.to_str()).unwrap_or(file_name);
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let scrubbed = scrub(stem);
        if scrubbed.is_empty() || is_generic_token(&scrubbed) {
            continue;
        }

        let is_music = MUSIC_EXTENSIONS.contains(&extension.as_str());
        candidates.push((is_music, scrubbed.len(), scrubbed));
    }

    candidates.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|(_, _, name)| seen.insert(name.to_ascii_lowercase()))
        .map(|(_, _, name)| name)
        .take(MAX_SEARCH_FILENAMES)
        .collect()
}

/// Remove zero-width and other control characters, then collapse
/// whitespace runs to single spaces and trim the ends.
#[must_use]
pub fn scrub(input: &str) -> String {
    let cleaned: String = input.chars().filter(|&c| !is_garbled(c)).collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_garbled(c: char) -> bool {
    matches!(c, '\u{200B}'..='\u{200D}' | '\u{FEFF}') || (c.is_control() && c != ' ')
}

fn is_generic_token(name: &str) -> bool {
    let mut words = name.split_whitespace();
    match (words.next(), words.next()) {
        (Some(word), None) => GENERIC_NAMES.iter().any(|generic| generic.eq_ignore_ascii_case(word)),
        _ => false,
    }
}
