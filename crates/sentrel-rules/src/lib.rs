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

//! Condition normalization and the boolean rule evaluator.
//!
//! `sentrel-rules` is a passive library: [`normalize`] turns loosely-typed
//! wire documents into the canonical [`sentrel_model`] shapes, and
//! [`evaluator`] walks a condition tree against a torrent snapshot. Neither
//! module talks to the database or the qBittorrent client; callers supply
//! every external dependency (sibling indexes, free-space probes) through
//! the evaluator's context struct.

pub mod error;
pub mod evaluator;
pub mod normalize;
pub mod regex_cache;

pub use error::{RulesError, RulesResult};
pub use evaluator::{evaluate, EvaluationContext, EvaluationOutcome, EvaluationWarning, FreeSpaceProbe, SiblingIndex};
pub use normalize::{is_empty, normalize_tags_document, normalize_tracker_pattern, tags_action_tag_alias, TagsActionDocument};
pub use regex_cache::RegexCache;
