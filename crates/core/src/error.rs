//! Platform error taxonomy
//!
//! Every failure a partner can observe maps to exactly one of these codes.
//! Engines raise typed errors that carry a code; only the HTTP layer turns
//! codes into status lines and response envelopes.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Wire-level error codes.
///
/// The string form is the `error.code` field of the JSON error envelope.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    /// No or invalid API key
    Unauthenticated,
    /// Caller IP outside the partner allowlist
    IpNotAllowed,
    /// Key lacks the required permission
    PermissionDenied,
    /// Per-partner/endpoint cap exceeded
    RateLimited,
    /// Wallet, partner or transaction absent
    NotFound,
    /// Non-positive or wrong-scale amount
    InvalidAmount,
    /// Operation currency differs from the wallet currency
    CurrencyMismatch,
    /// Withdraw/bet exceeds the balance
    InsufficientFunds,
    /// Same reference-id, different payload
    IdempotencyConflict,
    /// Original transaction already canceled
    AlreadyRolledBack,
    /// Wallet flag disallows mutation
    WalletLocked,
    /// Request deadline hit
    DeadlineExceeded,
    /// Store, cache or provider down
    DependencyUnavailable,
    /// Unexpected failure
    Internal,
}
