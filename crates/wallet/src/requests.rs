//! Operation requests and results

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use playgate_core::{Currency, TransactionStatus, TransactionType};

/// Common shape of every mutating wallet call
#[derive(Debug, Clone)]
pub struct OperationRequest {
    pub player_id: String,
    /// Partner-supplied idempotency reference
    pub reference_id: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub game_id: Option<String>,
    pub round_id: Option<String>,
    /// For win: reference of the bet being settled
    pub related_reference_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Rollback of a prior completed transaction
#[derive(Debug, Clone)]
pub struct RollbackRequest {
    pub player_id: String,
    pub reference_id: String,
    pub original_reference_id: String,
    pub reason: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// What a mutating operation returns (fresh or idempotent replay)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub transaction_id: Uuid,
    pub reference_id: String,
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
    pub amount: Decimal,
    pub currency: Currency,
    /// Wallet balance after this transaction, as captured when it committed
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Balance read result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceView {
    pub player_id: String,
    pub partner_id: Uuid,
    pub balance: Decimal,
    pub currency: Currency,
}
