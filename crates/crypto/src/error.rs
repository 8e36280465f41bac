//! Crypto layer errors

use thiserror::Error;

/// Errors raised by the crypto primitives.
///
/// Decryption failures deliberately collapse into one variant: callers must
/// not learn whether the key, the nonce, or the authentication tag was at
/// fault.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption key is not configured")]
    MissingKey,

    #[error("Encryption key must be 32 bytes of base64: {0}")]
    InvalidKey(String),

    #[error("Encryption failed")]
    EncryptFailed,

    #[error("Decryption failed")]
    DecryptFailed,

    #[error("Secret hashing failed: {0}")]
    HashFailed(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
