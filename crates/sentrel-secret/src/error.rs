//! Error types for the secret box.

use thiserror::Error;

/// The four behavioural error classes, duplicated locally since this crate
/// has no dependency on `sentrel-model`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed or semantically invalid input.
    InvalidInput,
    /// The referenced entity does not exist.
    NotFound,
    /// A unique or check constraint was violated.
    Conflict,
    /// A transport-level failure that may succeed on retry.
    Transient,
}

impl ErrorClass {
    /// Whether this class is worth retrying with backoff.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Transient)
    }
}

/// Primary error type for secret box operations.
#[derive(Debug, Error)]
pub enum SecretError {
    /// The supplied key was not exactly 32 bytes.
    #[error("encryption key must be 32 bytes, got {len}")]
    InvalidKeyLength {
        /// Length of the key that was supplied.
        len: usize,
    },
    /// The ciphertext blob was not valid base64.
    #[error("ciphertext is not valid base64")]
    MalformedBase64 {
        /// Underlying base64 decode error.
        #[source]
        source: base64::DecodeError,
    },
    /// The decoded blob was shorter than a nonce plus authentication tag.
    #[error("ciphertext is too short to contain a nonce and tag")]
    Truncated {
        /// Number of bytes actually present after base64 decoding.
        len: usize,
    },
    /// Authenticated decryption failed (wrong key, tampered ciphertext, or
    /// wrong nonce).
    #[error("authentication failed while decrypting secret")]
    AuthenticationFailed,
}

impl SecretError {
    /// Whether this error represents malformed caller input rather than a
    /// transient failure. Every `SecretError` variant is input-shaped: there
    /// is no I/O or network boundary inside the secret box itself.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        true
    }

    /// Every variant here is `InvalidInput`-class: there is no I/O or
    /// network boundary inside the secret box itself.
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

/// Result alias for secret box operations.
pub type SecretResult<T> = Result<T, SecretError>;
