//! Environment-driven configuration, loaded once at startup and validated
//! before the supervisor starts.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::{AppError, AppResult};

/// Prefix shared by every environment variable this binary reads.
pub const ENV_PREFIX: &str = "SENTREL_";

/// Fully resolved startup configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// `sqlx::Any`-compatible connection string (`sqlite:...`, `postgres://...`).
    pub database_url: String,
    /// 32-byte AES-256-GCM key for [`sentrel_secret::SecretBox`].
    pub aead_key: [u8; sentrel_secret::KEY_LEN],
    /// Log level passed to [`sentrel_telemetry::LoggingConfig`].
    pub log_level: String,
    /// Default scheduler tick when a rule leaves `interval_s` unset.
    pub default_scheduler_interval: Duration,
    /// Default activity/run retention window in days.
    pub default_retention_days: i64,
    /// Base URL of the qBittorrent WebUI this process automates.
    pub qbit_base_url: String,
    /// WebUI username.
    pub qbit_username: String,
    /// WebUI password.
    pub qbit_password: String,
    /// Per-call timeout for ARR/Torznab-class endpoints.
    pub arr_timeout: Duration,
    /// Per-call timeout for Gazelle-class endpoints.
    pub gazelle_timeout: Duration,
}

impl Config {
    /// Load configuration from `SENTREL_*` environment variables, merged
    /// over documented defaults, validated before use.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] if a required variable is missing or a
    /// value fails to parse (the AEAD key's base64 decoding or length, a
    /// duration's integer parse).
    pub fn from_env() -> AppResult<Self> {
        let database_url = require_env("DATABASE_URL")?;
        let aead_key = load_aead_key()?;
        let log_level = env_or("LOG_LEVEL", "info");
        let default_scheduler_interval =
            Duration::from_secs(env_u64_or("SCHEDULER_INTERVAL_S", u64::try_from(sentrel_scheduler::DEFAULT_INTERVAL_S).unwrap_or(900))?);
        let default_retention_days = env_i64_or("RETENTION_DAYS", 7)?;
        let qbit_base_url = require_env("QBIT_URL")?;
        let qbit_username = require_env("QBIT_USERNAME")?;
        let qbit_password = require_env("QBIT_PASSWORD")?;
        let arr_timeout = Duration::from_secs(env_u64_or("ARR_TIMEOUT_S", 15)?);
        let gazelle_timeout = Duration::from_secs(env_u64_or("GAZELLE_TIMEOUT_S", 30)?);

        Ok(Self {
            database_url,
            aead_key,
            log_level,
            default_scheduler_interval,
            default_retention_days,
            qbit_base_url,
            qbit_username,
            qbit_password,
            arr_timeout,
            gazelle_timeout,
        })
    }
}

fn env_var_name(suffix: &str) -> String {
    format!("{ENV_PREFIX}{suffix}")
}

fn env_or(suffix: &str, default: &str) -> String {
    std::env::var(env_var_name(suffix)).unwrap_or_else(|_| default.to_string())
}

fn require_env(suffix: &str) -> AppResult<String> {
    std::env::var(env_var_name(suffix)).map_err(|_| AppError::Config(format!("missing required {}", env_var_name(suffix))))
}

fn env_u64_or(suffix: &str, default: u64) -> AppResult<u64> {
    match std::env::var(env_var_name(suffix)) {
        Ok(value) => value.parse().map_err(|_| AppError::Config(format!("{} must be a non-negative integer", env_var_name(suffix)))),
        Err(_) => Ok(default),
    }
}

fn env_i64_or(suffix: &str, default: i64) -> AppResult<i64> {
    match std::env::var(env_var_name(suffix)) {
        Ok(value) => value.parse().map_err(|_| AppError::Config(format!("{} must be an integer", env_var_name(suffix)))),
        Err(_) => Ok(default),
    }
}

fn load_aead_key() -> AppResult<[u8; sentrel_secret::KEY_LEN]> {
    let encoded = require_env("AEAD_KEY")?;
    parse_aead_key(&encoded)
}

fn parse_aead_key(encoded: &str) -> AppResult<[u8; sentrel_secret::KEY_LEN]> {
    let decoded = BASE64
        .decode(encoded.trim())
        .map_err(|source| AppError::Config(format!("{} is not valid base64: {source}", env_var_name("AEAD_KEY"))))?;
    let len = decoded.len();
    decoded
        .try_into()
        .map_err(|_| AppError::Config(format!("{} must decode to exactly {} bytes, got {len}", env_var_name("AEAD_KEY"), sentrel_secret::KEY_LEN)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_to_the_default_when_unset() {
        assert_eq!(env_or("DOES_NOT_EXIST_SENTINEL", "fallback"), "fallback");
    }

    #[test]
    fn parse_aead_key_rejects_the_wrong_length() {
        let err = parse_aead_key(&BASE64.encode([1u8; 16])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn parse_aead_key_rejects_malformed_base64() {
        let err = parse_aead_key("not base64 at all!!").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn parse_aead_key_accepts_a_well_formed_key() {
        let key = parse_aead_key(&BASE64.encode([7u8; sentrel_secret::KEY_LEN])).unwrap();
        assert_eq!(key.len(), sentrel_secret::KEY_LEN);
    }
}
