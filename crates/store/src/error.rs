//! Store layer errors, wrapping sqlx and conversion failures

use playgate_core::ErrorCode;
use thiserror::Error;

/// Data access errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Record not found: {entity} {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Record already exists: {entity} {key}")]
    Duplicate { entity: &'static str, key: String },

    #[error("Stored record is corrupt: {0}")]
    Corrupt(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] playgate_crypto::CryptoError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn duplicate(entity: &'static str, key: impl Into<String>) -> Self {
        Self::Duplicate {
            entity,
            key: key.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Taxonomy code for the HTTP layer.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Duplicate { .. } => ErrorCode::IdempotencyConflict,
            Self::Database(_) | Self::Migration(_) => ErrorCode::DependencyUnavailable,
            Self::Corrupt(_) | Self::Crypto(_) | Self::Serialization(_) => ErrorCode::Internal,
        }
    }
}
