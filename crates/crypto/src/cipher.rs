//! AES-256-GCM amount sealing
//!
//! Stored blob layout: URL-safe base64 of `nonce (12) || ciphertext || tag (16)`.
//! A fresh random nonce is drawn for every encryption.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Authenticated encryption for amounts at rest.
///
/// Construction fails closed: without a valid 256-bit key there is no
/// cipher, and nothing that needs one can start.
pub struct AmountCipher {
    cipher: Aes256Gcm,
}

impl AmountCipher {
    /// Build from a base64-encoded 32-byte key (the `encryption-key`
    /// configuration value).
    pub fn from_base64_key(key_b64: &str) -> CryptoResult<Self> {
        let trimmed = key_b64.trim();
        if trimmed.is_empty() {
            return Err(CryptoError::MissingKey);
        }

        let key_bytes = URL_SAFE
            .decode(trimmed)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        if key_bytes.len() != 32 {
            return Err(CryptoError::InvalidKey(format!(
                "expected 32 bytes, got {}",
                key_bytes.len()
            )));
        }

        Ok(Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key_bytes)),
        })
    }

    /// Build directly from raw key bytes. Used where the key does not come
    /// from configuration (fixtures, local tooling).
    pub fn from_key_bytes(key: [u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)),
        }
    }

    /// Encrypt a plaintext string into a storable blob.
    pub fn encrypt(&self, plaintext: &str) -> CryptoResult<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::EncryptFailed)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(URL_SAFE.encode(blob))
    }

    /// Decrypt a blob produced by [`encrypt`](Self::encrypt).
    ///
    /// Any failure (malformed base64, truncated blob, tampered tag, wrong
    /// key) returns the same `DecryptFailed`.
    pub fn decrypt(&self, blob: &str) -> CryptoResult<String> {
        let raw = URL_SAFE
            .decode(blob.trim())
            .map_err(|_| CryptoError::DecryptFailed)?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::DecryptFailed);
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CryptoError::DecryptFailed)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptFailed)
    }
}
