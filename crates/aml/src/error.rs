//! AML analyzer errors

use playgate_core::{AlertStatus, ErrorCode};
use playgate_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AmlError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("Alert cannot move from {from} to {to}")]
    InvalidTransition { from: AlertStatus, to: AlertStatus },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type AmlResult<T> = Result<T, AmlError>;

impl AmlError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            // A disallowed workflow transition is a state conflict
            Self::InvalidTransition { .. } => ErrorCode::IdempotencyConflict,
            Self::Store(e) => e.code(),
        }
    }
}
