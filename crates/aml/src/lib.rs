//! Playgate AML analyzer
//!
//! Consumes `wallet.transaction.created` events, evaluates behavioral risk
//! factors against the player's recent history, updates the per-(player,
//! partner) risk profile, raises alerts and regulatory report records, and
//! publishes `aml.alert.created`. Wallet writes are never rolled back
//! because analysis failed: the bus retries and dead-letters instead.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod factors;
pub mod subscriber;

pub use analyzer::{AmlAnalyzer, AnalysisOutcome};
pub use config::AmlConfig;
pub use error::{AmlError, AmlResult};
pub use factors::{evaluate, Analysis, FactorOutcome};
pub use subscriber::AmlSubscriber;
