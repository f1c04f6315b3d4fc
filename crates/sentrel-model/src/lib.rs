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

//! Shared domain types for the sentrel workspace.
//!
//! This crate is pure data: endpoint registrations ([`instance`]), the rule
//! and condition-tree model ([`rule`], [`field`]), scheduler state
//! ([`run`]), the activity log ([`activity`]), and the torrent snapshot the
//! rule evaluator consumes ([`torrent`]). Normalization, regex compilation,
//! and evaluation semantics live in the rules-evaluation crate built on top
//! of these types; SQL persistence lives in the runtime crate.

pub mod activity;
pub mod error;
pub mod field;
pub mod instance;
pub mod rule;
pub mod run;
pub mod torrent;

pub use activity::{ActivityEntry, ActivityOutcome, DEFAULT_RETENTION_DAYS, effective_retention_days};
pub use error::{ErrorClass, ModelError, ModelResult};
pub use field::{Field, FieldKind, HardlinkScope};
pub use instance::{
    ArrInstance, ArrInstanceType, ExternalProgram, Instance, PathMapping, TorznabIndexer,
    TorznabIndexerCategory, TorznabIndexerError,
};
pub use rule::{
    ActionConditions, AmbiguousPolicy, AtomicScope, CategoryAction, DeleteAction, DeleteMode,
    ExternalProgramAction, FreeSpaceSource, GroupOperator, Grouping, GroupingGroup, MoveAction,
    Operator, RuleCondition, ShareLimitsAction, SimpleAction, SpeedLimitsAction, TagMode,
    TagsAction, TrackerRule,
};
pub use run::{RestartRecoveryOutcome, Run, RunKind, RunStatus, Transfer, TransferState};
pub use torrent::{CrossSeedBlocklistEntry, TorrentFile, TorrentView};
