//! Event bus errors

use playgate_store::StoreError;
use thiserror::Error;

/// Bus and subscriber failures
#[derive(Error, Debug)]
pub enum BusError {
    #[error("Handler failed: {0}")]
    Handler(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type BusResult<T> = Result<T, BusError>;

impl BusError {
    pub fn handler(msg: impl Into<String>) -> Self {
        Self::Handler(msg.into())
    }
}
