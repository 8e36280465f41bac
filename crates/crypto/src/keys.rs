//! API-key material
//!
//! A raw key looks like `live_h1X...` and is shown to the partner exactly
//! once. The store keeps two derived values:
//! - a deterministic SHA-256 digest, unique-indexed, used for lookup;
//! - a salted Argon2id hash, verified in constant time after the lookup.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::error::{CryptoError, CryptoResult};

/// Random characters after the environment prefix
const KEY_SECRET_LEN: usize = 40;

/// Freshly issued key material.
///
/// `raw_key` leaves the process once, in the issuance response; only the
/// two derived fields are persisted.
#[derive(Debug, Clone)]
pub struct IssuedKey {
    pub raw_key: String,
    pub lookup_digest: String,
    pub secret_hash: String,
}

/// Deterministic lookup digest of a raw key (hex-encoded SHA-256).
///
/// Keys are high-entropy random strings, so an unsalted digest is safe to
/// index; the salted Argon2 hash still guards against a leaked digest table.
pub fn lookup_digest(raw_key: &str) -> String {
    let digest = Sha256::digest(raw_key.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Hash a secret with Argon2id and a per-value salt.
pub fn hash_secret(raw: &str) -> CryptoResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(raw.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| CryptoError::HashFailed(e.to_string()))
}

/// Constant-time verification of a secret against its stored hash.
pub fn verify_secret(raw: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(raw.as_bytes(), &parsed)
        .is_ok()
}

/// Issue a new API key for an environment prefix (`live`, `test`).
pub fn generate_api_key(prefix: &str) -> CryptoResult<IssuedKey> {
    let secret: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_SECRET_LEN)
        .map(char::from)
        .collect();
    let raw_key = format!("{prefix}_{secret}");

    Ok(IssuedKey {
        lookup_digest: lookup_digest(&raw_key),
        secret_hash: hash_secret(&raw_key)?,
        raw_key,
    })
}
