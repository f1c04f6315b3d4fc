//! Endpoint-shaped domain types: qBittorrent, ARR, Torznab, and external
//! program registrations.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// A registered qBittorrent endpoint.
///
/// `password_ct` and `basic_password_ct` hold AEAD ciphertext produced by
/// `sentrel-secret`; this crate never sees plaintext credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Opaque identifier assigned on insert.
    pub id: i64,
    /// Display name; unique across all instances.
    pub name: String,
    /// Normalized absolute `http(s)` URL, trailing slash preserved as given.
    pub url: String,
    /// WebUI username.
    pub username: String,
    /// Ciphertext of the WebUI password.
    pub password_ct: String,
    /// Optional reverse-proxy basic-auth username.
    pub basic_username: Option<String>,
    /// Ciphertext of the reverse-proxy basic-auth password.
    pub basic_password_ct: Option<String>,
    /// Whether TLS certificate verification is skipped for this endpoint.
    pub tls_skip_verify: bool,
}

impl Instance {
    /// Validate the invariants listed in the data model: non-empty unique
    /// name (uniqueness is enforced at the store layer), a syntactically
    /// valid absolute `http(s)` URL, and atomic basic-auth credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] describing the first violated invariant.
    pub fn validate(&self) -> ModelResult<()> {
        if self.name.trim().is_empty() {
            return Err(ModelError::EmptyName);
        }
        validate_absolute_http_url(&self.url)?;
        validate_atomic_basic_auth(
            self.basic_username.as_deref(),
            self.basic_password_ct.as_deref(),
        )
    }
}

/// Which upstream ecosystem an [`ArrInstance`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrInstanceType {
    /// Sonarr (TV).
    Sonarr,
    /// Radarr (movies).
    Radarr,
}

impl ArrInstanceType {
    /// Parse the wire representation (`"sonarr"` / `"radarr"`, case sensitive
    /// per the invalid-backend-string precedent in §7).
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownArrInstanceType`] for any other value.
    pub fn parse(value: &str) -> ModelResult<Self> {
        match value {
            "sonarr" => Ok(Self::Sonarr),
            "radarr" => Ok(Self::Radarr),
            other => Err(ModelError::UnknownArrInstanceType {
                value: other.to_string(),
            }),
        }
    }

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sonarr => "sonarr",
            Self::Radarr => "radarr",
        }
    }
}

/// A registered Sonarr or Radarr endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrInstance {
    /// Opaque identifier assigned on insert.
    pub id: i64,
    /// Which ecosystem this endpoint belongs to.
    #[serde(rename = "type")]
    pub instance_type: ArrInstanceType,
    /// Display name; unique across all ARR instances.
    pub name: String,
    /// Base URL of the ARR API.
    pub base_url: String,
    /// Ciphertext of the API key.
    pub api_key_ct: String,
    /// Optional reverse-proxy basic-auth username.
    pub basic_username: Option<String>,
    /// Ciphertext of the reverse-proxy basic-auth password.
    pub basic_password_ct: Option<String>,
    /// Whether this instance participates in lookups.
    pub enabled: bool,
    /// Selection priority when multiple instances could answer a lookup.
    pub priority: i32,
    /// Per-call timeout in seconds.
    pub timeout_s: i64,
    /// When connectivity was last tested, if ever.
    pub last_test_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Outcome of the last connectivity test.
    pub last_test_status: String,
    /// Error detail from the last failed connectivity test, if any.
    pub last_test_error: Option<String>,
}

impl ArrInstance {
    /// Validate name, URL, and atomic basic-auth invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] describing the first violated invariant.
    pub fn validate(&self) -> ModelResult<()> {
        if self.name.trim().is_empty() {
            return Err(ModelError::EmptyName);
        }
        validate_absolute_http_url(&self.base_url)?;
        validate_atomic_basic_auth(
            self.basic_username.as_deref(),
            self.basic_password_ct.as_deref(),
        )
    }
}

/// A single category advertised by a [`TorznabIndexer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorznabIndexerCategory {
    /// Torznab numeric category id.
    pub id: i32,
    /// Human-readable category name.
    pub name: String,
}

/// One recorded failure from a [`TorznabIndexer`] query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorznabIndexerError {
    /// Opaque identifier assigned on insert.
    pub id: i64,
    /// Owning indexer.
    pub indexer_id: i64,
    /// Short error classification.
    pub error_type: String,
    /// Human-readable error detail.
    pub error_message: String,
    /// When the error occurred.
    pub occurred_at: chrono::DateTime<chrono::Utc>,
}

/// A registered Torznab-compatible search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorznabIndexer {
    /// Opaque identifier assigned on insert.
    pub id: i64,
    /// Display name; unique across all indexers.
    pub name: String,
    /// Base URL of the Torznab endpoint.
    pub base_url: String,
    /// Ciphertext of the API key.
    pub api_key_ct: String,
    /// Capabilities advertised by the indexer (raw capability tokens).
    pub capabilities: Vec<String>,
    /// Categories advertised by the indexer.
    pub categories: Vec<TorznabIndexerCategory>,
    /// Whether this indexer participates in searches.
    pub enabled: bool,
    /// Per-call timeout in seconds.
    pub timeout_s: i64,
}

impl TorznabIndexer {
    /// Validate name and URL invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] describing the first violated invariant.
    pub fn validate(&self) -> ModelResult<()> {
        if self.name.trim().is_empty() {
            return Err(ModelError::EmptyName);
        }
        validate_absolute_http_url(&self.base_url)
    }
}

/// A registered external program invocation target, resolved by rules'
/// `externalProgram` action blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalProgram {
    /// Opaque identifier assigned on insert.
    pub id: i64,
    /// Display name; unique across all programs.
    pub name: String,
    /// Executable path.
    pub path: String,
    /// Argument template; placeholders are substituted by the action
    /// pipeline at invocation time.
    pub args_template: String,
    /// Path substitutions applied to template placeholders before exec
    /// (container-to-host mappings, say).
    pub path_mappings: Vec<PathMapping>,
    /// Whether the program should be launched attached to a terminal.
    pub use_terminal: bool,
}

/// One `from -> to` path substitution rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMapping {
    /// Path prefix as seen by the scheduler process.
    pub from: String,
    /// Path prefix to substitute for use by the external program.
    pub to: String,
}

fn validate_absolute_http_url(value: &str) -> ModelResult<()> {
    let parsed = url::Url::parse(value).map_err(|_| ModelError::InvalidUrl {
        value: value.to_string(),
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ModelError::InvalidUrl {
            value: value.to_string(),
        });
    }
    if parsed.host_str().is_none() {
        return Err(ModelError::InvalidUrl {
            value: value.to_string(),
        });
    }
    Ok(())
}

fn validate_atomic_basic_auth(username: Option<&str>, password_ct: Option<&str>) -> ModelResult<()> {
    let has_username = username.is_some_and(|value| !value.is_empty());
    let has_password = password_ct.is_some_and(|value| !value.is_empty());
    if has_username && !has_password {
        return Err(ModelError::BasicAuthPasswordRequired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_instance() -> Instance {
        Instance {
            id: 1,
            name: "main".to_string(),
            url: "https://qbt.example.com:8080/".to_string(),
            username: "admin".to_string(),
            password_ct: "ct".to_string(),
            basic_username: None,
            basic_password_ct: None,
            tls_skip_verify: false,
        }
    }

    #[test]
    fn instance_validate_accepts_well_formed_instance() {
        assert!(sample_instance().validate().is_ok());
    }

    #[test]
    fn instance_validate_rejects_empty_name() {
        let mut instance = sample_instance();
        instance.name = "  ".to_string();
        assert_eq!(instance.validate().unwrap_err(), ModelError::EmptyName);
    }

    #[test]
    fn instance_validate_rejects_non_http_scheme() {
        let mut instance = sample_instance();
        instance.url = "ftp://qbt.example.com".to_string();
        assert!(matches!(
            instance.validate().unwrap_err(),
            ModelError::InvalidUrl { .. }
        ));
    }

    #[test]
    fn instance_validate_rejects_relative_url() {
        let mut instance = sample_instance();
        instance.url = "/just/a/path".to_string();
        assert!(matches!(
            instance.validate().unwrap_err(),
            ModelError::InvalidUrl { .. }
        ));
    }

    #[test]
    fn instance_validate_requires_password_with_username() {
        let mut instance = sample_instance();
        instance.basic_username = Some("proxyuser".to_string());
        instance.basic_password_ct = None;
        assert_eq!(
            instance.validate().unwrap_err(),
            ModelError::BasicAuthPasswordRequired
        );
    }

    #[test]
    fn arr_instance_type_parse_rejects_unknown_and_uppercase() {
        assert_eq!(ArrInstanceType::parse("sonarr"), Ok(ArrInstanceType::Sonarr));
        assert_eq!(ArrInstanceType::parse("radarr"), Ok(ArrInstanceType::Radarr));
        assert!(ArrInstanceType::parse("Sonarr").is_err());
        assert!(ArrInstanceType::parse("plex").is_err());
    }
}
