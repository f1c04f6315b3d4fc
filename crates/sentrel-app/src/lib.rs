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

//! Top-level wiring: loads configuration, builds the process-wide
//! singletons (AEAD key, rate-limiter registry), and boots the job
//! supervisor. `main.rs` is kept to a single delegating call; everything
//! else lives here so it stays testable without a process boundary.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod program;
pub mod qbit;

pub use error::{AppError, AppResult};

/// Run the application to completion (until a shutdown signal arrives).
///
/// # Errors
///
/// Returns an error if startup or the supervisor's boot sequence fails.
pub async fn run() -> AppResult<()> {
    bootstrap::run_app().await
}
