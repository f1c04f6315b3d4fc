//! Top-level error type covering every failure mode startup can hit.

use thiserror::Error;

/// Result alias for application bootstrap and wiring.
pub type AppResult<T> = Result<T, AppError>;

/// Errors raised while loading configuration, connecting dependencies, or
/// running the supervisor.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable was missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),
    /// The AEAD key failed to decode or construct.
    #[error(transparent)]
    Secret(#[from] sentrel_secret::SecretError),
    /// Connecting to, or migrating, the database failed.
    #[error(transparent)]
    Data(#[from] sentrel_data::DataError),
    /// A runtime store call failed during migration or startup seeding.
    #[error(transparent)]
    Runtime(#[from] sentrel_runtime::RuntimeError),
    /// The scheduler failed to boot.
    #[error(transparent)]
    Scheduler(#[from] sentrel_scheduler::SchedulerError),
    /// Installing the tracing subscriber failed.
    #[error(transparent)]
    Telemetry(#[from] sentrel_telemetry::TelemetryError),
    /// A configured URL failed to parse.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}
