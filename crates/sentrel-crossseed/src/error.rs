//! Error handling for the bencode codec, the Gazelle client, and the
//! cross-seed blocklist store.

use sentrel_model::ErrorClass;

/// Result alias for this crate's fallible operations.
pub type CrossSeedResult<T> = Result<T, CrossSeedError>;

/// Errors raised while decoding or encoding a bencoded value.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum BencodeError {
    /// The input ended before a value could be fully parsed.
    #[error("unexpected end of input")]
    UnexpectedEof,
    /// An integer token was malformed (leading zero, bare `-0`, non-digit).
    #[error("invalid integer token")]
    InvalidInteger,
    /// A byte-string length prefix was malformed or pointed past the input.
    #[error("invalid byte-string length")]
    InvalidLength,
    /// A dictionary key was not a valid UTF-8 byte string.
    #[error("dictionary key is not valid UTF-8")]
    InvalidKeyEncoding,
    /// Trailing bytes remained after a complete top-level value was parsed.
    #[error("trailing data after top-level value")]
    TrailingData,
    /// An unrecognised type tag was encountered where a value was expected.
    #[error("unrecognised bencode type tag")]
    UnknownTag,
}

impl BencodeError {
    /// Every variant is malformed-input-shaped.
    #[must_use]
    pub const fn kind(&self) -> ErrorClass {
        ErrorClass::InvalidInput
    }

    /// Never retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// Errors raised by the Gazelle client and cross-seed matcher.
#[derive(Debug, thiserror::Error)]
pub enum CrossSeedError {
    /// The local torrent's metadata failed to decode or encode.
    #[error(transparent)]
    Bencode(#[from] BencodeError),
    /// The HTTP transport failed (connection, TLS, timeout).
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The Gazelle endpoint responded with a non-miss error status.
    #[error("gazelle endpoint returned an error: {0}")]
    Remote(String),
    /// A downloaded payload failed the download guard's structural checks.
    #[error("downloaded payload failed validation: {0}")]
    InvalidDownload(&'static str),
    /// The calling context was cancelled while awaiting a limiter, HTTP
    /// call, or database call.
    #[error("operation cancelled")]
    Cancelled,
    /// The blocklist store failed.
    #[error(transparent)]
    Data(#[from] sentrel_data::DataError),
}

impl From<sentrel_limits::LimitsError> for CrossSeedError {
    fn from(_source: sentrel_limits::LimitsError) -> Self {
        Self::Cancelled
    }
}

impl CrossSeedError {
    /// Classifies this error by behaviour. `Cancelled` is `Transient` but
    /// special-cased to never retry (see `is_retryable`); an HTTP transport
    /// failure is `Transient`; a non-miss Gazelle error status is treated
    /// the same way since the endpoint itself may recover.
    #[must_use]
    pub fn kind(&self) -> ErrorClass {
        match self {
            Self::Bencode(inner) => inner.kind(),
            Self::Http(_) | Self::Remote(_) | Self::Cancelled => ErrorClass::Transient,
            Self::InvalidDownload(_) => ErrorClass::InvalidInput,
            Self::Data(inner) => match inner.kind() {
                sentrel_data::ErrorClass::InvalidInput => ErrorClass::InvalidInput,
                sentrel_data::ErrorClass::NotFound => ErrorClass::NotFound,
                sentrel_data::ErrorClass::Conflict => ErrorClass::Conflict,
                sentrel_data::ErrorClass::Transient => ErrorClass::Transient,
            },
        }
    }

    /// Delegates to the class's default retryability, except `Cancelled`
    /// which is never retried: an intentional stop, not a hiccup.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        if matches!(self, Self::Cancelled) {
            return false;
        }
        self.kind().is_retryable()
    }
}
