//! Playgate core domain model
//!
//! Shared types for the wallet engine, auth pipeline and AML analyzer:
//! currencies and amounts, partners and API keys, wallets and transactions,
//! risk profiles and alerts, domain events, and the platform error taxonomy.

pub mod aml;
pub mod amount;
pub mod currency;
pub mod error;
pub mod event;
pub mod partner;
pub mod wallet;

pub use aml::{Alert, AlertStatus, AlertType, RiskLevel, RiskProfile, Severity, SuspicionReport};
pub use amount::{Amount, AmountError};
pub use currency::{Currency, CurrencyError};
pub use error::ErrorCode;
pub use event::{
    AlertCreated, DomainEvent, TransactionCreated, TOPIC_ALERT_CREATED, TOPIC_TRANSACTION_CREATED,
};
pub use partner::{ApiKey, Partner, PartnerStatus};
pub use wallet::{Transaction, TransactionStatus, TransactionType, Wallet};
