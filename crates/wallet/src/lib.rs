//! Playgate wallet engine
//!
//! The balance state machine: deposit, withdraw, bet, win, rollback. Every
//! operation mutates a balance exactly once per (partner, reference-id),
//! under concurrent traffic, inside a single store transaction holding the
//! wallet row lock. Successful commits publish
//! `wallet.transaction.created`; publication failures never fail the
//! operation.

pub mod engine;
pub mod error;
pub mod requests;

pub use engine::WalletEngine;
pub use error::{WalletError, WalletResult};
pub use requests::{BalanceView, OperationOutcome, OperationRequest, RollbackRequest};
