//! Wallet engine errors

use playgate_core::{AmountError, Currency, ErrorCode};
use playgate_store::StoreError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Failures a wallet operation can surface to a partner
#[derive(Error, Debug)]
pub enum WalletError {
    #[error(transparent)]
    InvalidAmount(#[from] AmountError),

    #[error("Currency mismatch: {detail}")]
    CurrencyMismatch { detail: String },

    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds {
        balance: Decimal,
        requested: Decimal,
    },

    #[error("Wallet is locked")]
    WalletLocked,

    #[error("Wallet is not active")]
    WalletInactive,

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("Reference {reference_id} was already used with a different payload")]
    IdempotencyConflict { reference_id: String },

    #[error("Transaction {reference_id} has already been rolled back")]
    AlreadyRolledBack { reference_id: String },

    #[error(transparent)]
    Store(StoreError),
}

pub type WalletResult<T> = Result<T, WalletError>;

impl WalletError {
    pub fn currency_mismatch(expected: &Currency, got: &Currency) -> Self {
        Self::CurrencyMismatch {
            detail: format!("wallet holds {expected}, request used {got}"),
        }
    }

    /// Taxonomy code for the HTTP layer.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidAmount(_) => ErrorCode::InvalidAmount,
            Self::CurrencyMismatch { .. } => ErrorCode::CurrencyMismatch,
            Self::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
            Self::WalletLocked | Self::WalletInactive => ErrorCode::WalletLocked,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::IdempotencyConflict { .. } => ErrorCode::IdempotencyConflict,
            Self::AlreadyRolledBack { .. } => ErrorCode::AlreadyRolledBack,
            Self::Store(e) => e.code(),
        }
    }
}

impl From<StoreError> for WalletError {
    fn from(e: StoreError) -> Self {
        match e {
            // A unique-index race on (partner, reference) is an idempotent
            // retry arriving concurrently; surface it as the conflict the
            // partner can reason about.
            StoreError::Duplicate { key, .. } => Self::IdempotencyConflict { reference_id: key },
            other => Self::Store(other),
        }
    }
}
