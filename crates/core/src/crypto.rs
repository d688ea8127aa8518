//! Authenticated encryption for third-party OAuth tokens at rest.
//!
//! Values are sealed with AES-256-GCM under a process-wide key and stored as
//! lowercase hex of `nonce (12 bytes) || ciphertext || tag`. A fresh random
//! nonce is drawn for every encryption.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};

/// Length in bytes of an AES-256 key.
pub const KEY_LEN: usize = 32;

/// Length in bytes of a GCM nonce.
const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("Encryption key must be 32 bytes of hex (64 chars)")]
    InvalidKey,

    #[error("Ciphertext is not valid hex or is too short")]
    Malformed,

    /// Wrong key or tampered ciphertext.
    #[error("Ciphertext failed authentication")]
    Authentication,

    #[error("Decrypted value is not valid UTF-8")]
    Encoding,
}

/// Symmetric token cipher keyed by a process-wide secret.
#[derive(Clone)]
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCipher").finish_non_exhaustive()
    }
}

impl TokenCipher {
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)),
        }
    }

    /// Build from a 64-character hex key (the `TOKEN_ENCRYPTION_KEY` format).
    pub fn from_hex_key(hex_key: &str) -> Result<Self, CipherError> {
        let bytes = crate::hex::decode(hex_key).ok_or(CipherError::InvalidKey)?;
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|_| CipherError::InvalidKey)?;
        Ok(Self::new(key))
    }

    /// Load the key from `TOKEN_ENCRYPTION_KEY`. Returns `None` when unset.
    pub fn from_env() -> Option<Result<Self, CipherError>> {
        let key = std::env::var("TOKEN_ENCRYPTION_KEY").ok()?;
        Some(Self::from_hex_key(&key))
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            // Only fails on plaintexts larger than GCM's 64 GiB limit.
            .map_err(|_| CipherError::Malformed)?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&sealed);
        Ok(crate::hex::encode(out))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, CipherError> {
        let bytes = crate::hex::decode(encoded).ok_or(CipherError::Malformed)?;
        if bytes.len() <= NONCE_LEN {
            return Err(CipherError::Malformed);
        }
        let (nonce, sealed) = bytes.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CipherError::Authentication)?;
        String::from_utf8(plain).map_err(|_| CipherError::Encoding)
    }
}
