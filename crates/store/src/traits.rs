//! Store and transaction traits

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use playgate_core::{
    Alert, AlertStatus, ApiKey, Currency, Partner, RiskProfile, Severity, SuspicionReport,
    Transaction, TransactionStatus, TransactionType, Wallet,
};

use crate::error::StoreResult;

/// An event the bus could not deliver, parked for later replay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    pub id: Uuid,
    pub topic: String,
    pub payload: serde_json::Value,
    pub error: String,
    pub created_at: DateTime<Utc>,
}

/// Filters for player transaction listings
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub tx_type: Option<TransactionType>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub offset: i64,
    /// 0 means no limit
    pub limit: i64,
}

/// Filters for alert listings
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub partner_id: Option<Uuid>,
    pub player_id: Option<String>,
    pub status: Option<AlertStatus>,
    pub severity: Option<Severity>,
    pub offset: i64,
    pub limit: i64,
}

/// Read access plus the ability to open transactional scopes.
///
/// All methods are safe to call concurrently; none of them mutates wallet
/// state (the `touch_api_key` and dead-letter calls are their own single
/// statements).
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a transactional scope. Dropping the returned value without
    /// calling [`StoreTx::commit`] rolls everything back.
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;

    // --- partners and API keys ---

    async fn get_partner(&self, id: Uuid) -> StoreResult<Option<Partner>>;

    async fn find_api_key_by_digest(&self, digest: &str) -> StoreResult<Option<ApiKey>>;

    /// Record key usage; rate-limited by the caller, not here.
    async fn touch_api_key(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;

    // --- wallets and transactions (plain reads) ---

    async fn get_wallet(
        &self,
        player_id: &str,
        partner_id: Uuid,
        currency: &Currency,
    ) -> StoreResult<Option<Wallet>>;

    /// Every wallet a player holds with this partner, one per currency.
    async fn list_player_wallets(
        &self,
        player_id: &str,
        partner_id: Uuid,
    ) -> StoreResult<Vec<Wallet>>;

    async fn find_transaction_by_reference(
        &self,
        partner_id: Uuid,
        reference_id: &str,
    ) -> StoreResult<Option<Transaction>>;

    /// Most recent first.
    async fn list_player_transactions(
        &self,
        player_id: &str,
        partner_id: Uuid,
        filter: &TransactionFilter,
    ) -> StoreResult<Vec<Transaction>>;

    // --- AML reads ---

    async fn get_risk_profile(
        &self,
        player_id: &str,
        partner_id: Uuid,
    ) -> StoreResult<Option<RiskProfile>>;

    async fn get_alert(&self, id: Uuid) -> StoreResult<Option<Alert>>;

    /// Most recent first.
    async fn list_alerts(&self, filter: &AlertFilter) -> StoreResult<Vec<Alert>>;

    // --- dead letters ---

    async fn insert_dead_letter(&self, letter: &DeadLetter) -> StoreResult<()>;

    /// Remove and return up to `limit` parked events, oldest first.
    async fn take_dead_letters(&self, limit: i64) -> StoreResult<Vec<DeadLetter>>;
}

/// Mutations inside one database transaction.
///
/// `wallet_for_update` acquires the row lock that serializes concurrent
/// writers to the same wallet; everything else in the scope happens under
/// that lock until `commit`.
#[async_trait]
pub trait StoreTx: Send {
    // --- wallet engine ---

    /// Blocking locked read of a wallet row.
    async fn wallet_for_update(
        &mut self,
        player_id: &str,
        partner_id: Uuid,
        currency: &Currency,
    ) -> StoreResult<Option<Wallet>>;

    /// Create the wallet row if the (player, partner, currency) triple is
    /// unseen. A concurrently created duplicate is not an error; callers
    /// re-read under the lock afterwards.
    async fn insert_wallet(&mut self, wallet: &Wallet) -> StoreResult<()>;

    async fn update_wallet_balance(
        &mut self,
        wallet_id: Uuid,
        balance: Decimal,
    ) -> StoreResult<()>;

    /// Idempotency re-check inside the transaction.
    async fn find_transaction_by_reference(
        &mut self,
        partner_id: Uuid,
        reference_id: &str,
    ) -> StoreResult<Option<Transaction>>;

    async fn insert_transaction(&mut self, tx: &Transaction) -> StoreResult<()>;

    async fn set_transaction_status(
        &mut self,
        id: Uuid,
        status: TransactionStatus,
    ) -> StoreResult<()>;

    // --- AML analyzer ---

    async fn get_or_create_risk_profile(
        &mut self,
        player_id: &str,
        partner_id: Uuid,
    ) -> StoreResult<RiskProfile>;

    async fn update_risk_profile(&mut self, profile: &RiskProfile) -> StoreResult<()>;

    async fn insert_alert(&mut self, alert: &Alert) -> StoreResult<()>;

    async fn update_alert(&mut self, alert: &Alert) -> StoreResult<()>;

    async fn insert_report(&mut self, report: &SuspicionReport) -> StoreResult<()>;

    /// Commit the scope. Consumes the transaction; without this call the
    /// scope rolls back on drop.
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
