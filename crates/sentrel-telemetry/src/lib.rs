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

//! Telemetry primitives shared across the sentrel workspace.
//!
//! Layout: `init.rs` (logging setup), `metrics.rs` (Prometheus registry),
//! `error.rs` (shared error type). HTTP-facing concerns (request spans,
//! log streaming, OpenAPI export) are intentionally absent: the core
//! automation/scheduling system specified here has no HTTP surface of
//! its own.

pub mod error;
pub mod init;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use init::{build_sha, init_logging, log_format_from_config, LogFormat, LoggingConfig, DEFAULT_LOG_LEVEL};
pub use metrics::{Metrics, MetricsSnapshot};
