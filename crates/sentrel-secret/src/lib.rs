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

//! AEAD secret box for encrypting instance credentials at rest.
//!
//! Every remote endpoint (qBittorrent, Sonarr/Radarr, Torznab, Gazelle) has a
//! password or API key that is stored encrypted under a single process-wide
//! key. The wire format is `base64(nonce || ciphertext || tag)`; a constant
//! redaction sentinel lets callers round-trip "secret unchanged" over JSON
//! without ever re-encrypting the literal string `"********"`.

pub mod error;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::RngCore;

pub use error::{ErrorClass, SecretError, SecretResult};

/// Length in bytes of the AES-256-GCM key.
pub const KEY_LEN: usize = 32;

/// Length in bytes of the random nonce prepended to every ciphertext.
pub const NONCE_LEN: usize = 12;

/// Length in bytes of the GCM authentication tag appended by `aes-gcm`.
pub const TAG_LEN: usize = 16;

/// Constant sentinel used on the wire to represent "secret unchanged".
///
/// Callers must check `is_redaction_sentinel` before calling [`SecretBox::encrypt`]
/// on inbound JSON; the secret box itself does not special-case this value.
pub const REDACTION_SENTINEL: &str = "********";

/// Returns `true` if `value` is the redaction sentinel.
#[must_use]
pub fn is_redaction_sentinel(value: &str) -> bool {
    value == REDACTION_SENTINEL
}

/// Symmetric AEAD box used to encrypt and decrypt credential material.
pub struct SecretBox {
    cipher: Aes256Gcm,
}

impl SecretBox {
    /// Construct a secret box from a 32-byte key.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::InvalidKeyLength`] when `key` is not exactly
    /// [`KEY_LEN`] bytes.
    pub fn new(key: &[u8]) -> SecretResult<Self> {
        if key.len() != KEY_LEN {
            return Err(SecretError::InvalidKeyLength { len: key.len() });
        }
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
        Ok(Self { cipher })
    }

    /// Encrypt `plaintext`, returning `base64(nonce || ciphertext || tag)`.
    ///
    /// A fresh random nonce is generated for every call.
    #[must_use]
    pub fn encrypt(&self, plaintext: &str) -> String {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        // Only fails for payloads exceeding AES-GCM's plaintext limit
        // (~64 GiB), never reachable for credential-sized strings.
        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .expect("aes-256-gcm encryption of a bounded credential cannot fail");

        let mut framed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        framed.extend_from_slice(&nonce_bytes);
        framed.extend_from_slice(&ciphertext);
        BASE64.encode(framed)
    }

    /// Decrypt a blob previously produced by [`SecretBox::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::MalformedBase64`] if `blob` is not valid
    /// base64, [`SecretError::Truncated`] if the decoded bytes are shorter
    /// than a nonce plus tag, and [`SecretError::AuthenticationFailed`] if
    /// decryption fails (wrong key or tampered ciphertext).
    pub fn decrypt(&self, blob: &str) -> SecretResult<String> {
        let framed = BASE64
            .decode(blob)
            .map_err(|source| SecretError::MalformedBase64 { source })?;

        if framed.len() < NONCE_LEN + TAG_LEN {
            return Err(SecretError::Truncated { len: framed.len() });
        }

        let (nonce_bytes, ciphertext) = framed.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| SecretError::AuthenticationFailed)?;

        String::from_utf8(plaintext).map_err(|_| SecretError::AuthenticationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> [u8; KEY_LEN] {
        [byte; KEY_LEN]
    }

    #[test]
    fn rejects_wrong_key_length() {
        let err = SecretBox::new(&[0u8; 16]).unwrap_err();
        assert!(matches!(err, SecretError::InvalidKeyLength { len: 16 }));
    }

    #[test]
    fn round_trip_for_arbitrary_strings() {
        let boxed = SecretBox::new(&key(7)).unwrap();
        for candidate in ["", "hunter2", "a very long api key ".repeat(20).as_str()] {
            let ciphertext = boxed.encrypt(candidate);
            assert_eq!(boxed.decrypt(&ciphertext).unwrap(), candidate);
        }
    }

    #[test]
    fn nonce_differs_between_calls() {
        let boxed = SecretBox::new(&key(1)).unwrap();
        let a = boxed.encrypt("same-plaintext");
        let b = boxed.encrypt("same-plaintext");
        assert_ne!(a, b);
    }

    #[test]
    fn decrypt_rejects_malformed_base64() {
        let boxed = SecretBox::new(&key(2)).unwrap();
        let err = boxed.decrypt("not base64!!!").unwrap_err();
        assert!(matches!(err, SecretError::MalformedBase64 { .. }));
    }

    #[test]
    fn decrypt_rejects_truncated_payload() {
        let boxed = SecretBox::new(&key(3)).unwrap();
        let short = base64::engine::general_purpose::STANDARD.encode([0u8; 4]);
        let err = boxed.decrypt(&short).unwrap_err();
        assert!(matches!(err, SecretError::Truncated { len: 4 }));
    }

    #[test]
    fn decrypt_rejects_wrong_key() {
        let sender = SecretBox::new(&key(4)).unwrap();
        let receiver = SecretBox::new(&key(5)).unwrap();
        let ciphertext = sender.encrypt("top secret");
        let err = receiver.decrypt(&ciphertext).unwrap_err();
        assert!(matches!(err, SecretError::AuthenticationFailed));
    }

    #[test]
    fn decrypt_rejects_tampered_ciphertext() {
        let boxed = SecretBox::new(&key(6)).unwrap();
        let ciphertext = boxed.encrypt("payload");
        let mut framed = BASE64.decode(&ciphertext).unwrap();
        let last = framed.len() - 1;
        framed[last] ^= 0xFF;
        let tampered = BASE64.encode(framed);
        let err = boxed.decrypt(&tampered).unwrap_err();
        assert!(matches!(err, SecretError::AuthenticationFailed));
    }

    #[test]
    fn redaction_sentinel_is_recognised() {
        assert!(is_redaction_sentinel(REDACTION_SENTINEL));
        assert!(!is_redaction_sentinel("********x"));
    }
}
