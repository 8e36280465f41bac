//! Wallet and transaction records
//!
//! One wallet per (player, partner, currency); the wallet balance is
//! authoritative and the transaction log is the append-only audit trail.
//! Amounts on the wire and in memory are plain decimals; the store seals
//! them with AES-GCM before they reach disk.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

use crate::currency::Currency;

/// Transaction kinds recorded in the ledger
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Bet,
    Win,
    Refund,
    Rollback,
    Adjustment,
    Commission,
    Bonus,
}

/// Transaction lifecycle.
///
/// `pending → completed | failed`; `completed → canceled` when rolled back.
/// Terminal states are immutable apart from that one cancellation edge.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Canceled,
}

impl TransactionStatus {
    /// Whether external systems may still see this record change (beyond
    /// the completed → canceled rollback edge).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

/// A player wallet: the ledger for one (player, partner, currency) triple.
///
/// # Invariants
/// - `balance >= 0` at every observable point
/// - `currency` is immutable after creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub id: Uuid,
    /// Partner-scoped player identifier
    pub player_id: String,
    pub partner_id: Uuid,
    pub currency: Currency,
    pub balance: Decimal,
    pub is_active: bool,
    /// A locked wallet rejects every mutating operation
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Fresh, empty wallet for a first-seen (player, partner, currency).
    pub fn open(player_id: impl Into<String>, partner_id: Uuid, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            player_id: player_id.into(),
            partner_id,
            currency,
            balance: Decimal::ZERO,
            is_active: true,
            is_locked: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One ledger entry.
///
/// `(partner_id, reference_id)` is unique: the idempotency key. The pair
/// `original_balance`/`updated_balance` snapshots the wallet around this
/// entry, which is what makes the audit trail replayable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    /// Partner-supplied idempotency reference
    pub reference_id: String,
    pub wallet_id: Uuid,
    pub player_id: String,
    pub partner_id: Uuid,
    pub tx_type: TransactionType,
    pub amount: Decimal,
    pub currency: Currency,
    pub status: TransactionStatus,
    pub original_balance: Decimal,
    pub updated_balance: Decimal,
    /// For rollback/refund entries: the transaction being inverted
    pub original_transaction_id: Option<Uuid>,
    pub game_id: Option<String>,
    pub round_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Whether a replayed request matches this stored record exactly.
    ///
    /// Divergence on any of these fields turns a retry into an
    /// idempotency conflict.
    pub fn matches_request(
        &self,
        player_id: &str,
        tx_type: TransactionType,
        amount: Decimal,
        currency: &Currency,
    ) -> bool {
        self.player_id == player_id
            && self.tx_type == tx_type
            && self.amount == amount
            && self.currency == *currency
    }

    /// Whether this entry may serve as a rollback target.
    pub fn is_rollbackable(&self) -> bool {
        self.status == TransactionStatus::Completed
            && matches!(
                self.tx_type,
                TransactionType::Bet | TransactionType::Win | TransactionType::Withdrawal
            )
    }
}
