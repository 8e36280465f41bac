//! Playgate crypto primitives
//!
//! Two concerns live here:
//! - [`AmountCipher`]: AES-256-GCM sealing of transaction amounts at rest,
//!   so a database dump does not expose per-transaction values.
//! - API-key material ([`keys`]): deterministic SHA-256 lookup digests plus
//!   salted Argon2 secret hashes, and issuance of raw keys.

pub mod cipher;
pub mod error;
pub mod keys;

pub use cipher::AmountCipher;
pub use error::CryptoError;
pub use keys::{generate_api_key, lookup_digest, verify_secret, IssuedKey};
