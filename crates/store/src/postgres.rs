//! Postgres backend
//!
//! Runtime-checked sqlx queries over a `PgPool`. Transaction amounts are
//! sealed with AES-GCM before they hit a row and unsealed on the way out;
//! every other column is stored in the clear.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use playgate_core::{
    Alert, AlertStatus, AlertType, ApiKey, Currency, Partner, PartnerStatus, RiskProfile,
    Severity, SuspicionReport, Transaction, TransactionStatus, TransactionType, Wallet,
};
use playgate_crypto::AmountCipher;

use crate::error::{StoreError, StoreResult};
use crate::traits::{AlertFilter, DeadLetter, Store, StoreTx, TransactionFilter};

/// Postgres-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    cipher: Arc<AmountCipher>,
}

impl PgStore {
    pub fn new(pool: PgPool, cipher: Arc<AmountCipher>) -> Self {
        Self { pool, cipher }
    }

    /// Connect and run pending migrations.
    pub async fn connect(database_url: &str, cipher: Arc<AmountCipher>) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(16)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self::new(pool, cipher))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// --- row types for sqlx mapping ---

#[derive(sqlx::FromRow)]
struct PartnerRow {
    id: Uuid,
    code: String,
    name: String,
    status: String,
    allowed_ips: serde_json::Value,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ApiKeyRow {
    id: Uuid,
    partner_id: Uuid,
    lookup_digest: String,
    secret_hash: String,
    permissions: serde_json::Value,
    is_active: bool,
    expires_at: Option<DateTime<Utc>>,
    last_used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct WalletRow {
    id: Uuid,
    player_id: String,
    partner_id: Uuid,
    currency: String,
    balance: Decimal,
    is_active: bool,
    is_locked: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    reference_id: String,
    wallet_id: Uuid,
    player_id: String,
    partner_id: Uuid,
    tx_type: String,
    amount_encrypted: String,
    currency: String,
    status: String,
    original_balance: Decimal,
    updated_balance: Decimal,
    original_transaction_id: Option<Uuid>,
    game_id: Option<String>,
    round_id: Option<String>,
    metadata: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct RiskProfileRow {
    player_id: String,
    partner_id: Uuid,
    risk_score: f64,
    deposit_count_7d: i64,
    deposit_amount_7d: Decimal,
    deposit_count_30d: i64,
    deposit_amount_30d: Decimal,
    withdrawal_count_7d: i64,
    withdrawal_amount_7d: Decimal,
    withdrawal_count_30d: i64,
    withdrawal_amount_30d: Decimal,
    risk_factors: serde_json::Value,
    last_calculated_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct AlertRow {
    id: Uuid,
    player_id: String,
    partner_id: Uuid,
    transaction_id: Option<Uuid>,
    alert_type: String,
    severity: String,
    status: String,
    risk_score: f64,
    risk_factors: serde_json::Value,
    description: String,
    report_required: bool,
    reviewed_by: Option<String>,
    review_notes: Option<String>,
    reported_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct DeadLetterRow {
    id: Uuid,
    topic: String,
    payload: serde_json::Value,
    error: String,
    created_at: DateTime<Utc>,
}

// --- row conversions ---

fn parse_code<T: FromStr>(field: &str, value: &str) -> StoreResult<T> {
    value
        .parse::<T>()
        .map_err(|_| StoreError::Corrupt(format!("bad {field} code: {value}")))
}

impl TryFrom<PartnerRow> for Partner {
    type Error = StoreError;

    fn try_from(row: PartnerRow) -> StoreResult<Self> {
        Ok(Partner {
            id: row.id,
            code: row.code,
            name: row.name,
            status: parse_code::<PartnerStatus>("partner status", &row.status)?,
            allowed_ips: serde_json::from_value(row.allowed_ips)?,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<ApiKeyRow> for ApiKey {
    type Error = StoreError;

    fn try_from(row: ApiKeyRow) -> StoreResult<Self> {
        Ok(ApiKey {
            id: row.id,
            partner_id: row.partner_id,
            lookup_digest: row.lookup_digest,
            secret_hash: row.secret_hash,
            permissions: serde_json::from_value(row.permissions)?,
            is_active: row.is_active,
            expires_at: row.expires_at,
            last_used_at: row.last_used_at,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<WalletRow> for Wallet {
    type Error = StoreError;

    fn try_from(row: WalletRow) -> StoreResult<Self> {
        Ok(Wallet {
            id: row.id,
            player_id: row.player_id,
            partner_id: row.partner_id,
            currency: parse_code::<Currency>("currency", &row.currency)?,
            balance: row.balance,
            is_active: row.is_active,
            is_locked: row.is_locked,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn transaction_from_row(row: TransactionRow, cipher: &AmountCipher) -> StoreResult<Transaction> {
    let plain = cipher.decrypt(&row.amount_encrypted)?;
    let amount = Decimal::from_str(&plain)
        .map_err(|_| StoreError::Corrupt(format!("bad sealed amount on tx {}", row.id)))?;

    Ok(Transaction {
        id: row.id,
        reference_id: row.reference_id,
        wallet_id: row.wallet_id,
        player_id: row.player_id,
        partner_id: row.partner_id,
        tx_type: parse_code::<TransactionType>("transaction type", &row.tx_type)?,
        amount,
        currency: parse_code::<Currency>("currency", &row.currency)?,
        status: parse_code::<TransactionStatus>("transaction status", &row.status)?,
        original_balance: row.original_balance,
        updated_balance: row.updated_balance,
        original_transaction_id: row.original_transaction_id,
        game_id: row.game_id,
        round_id: row.round_id,
        metadata: row.metadata,
        created_at: row.created_at,
    })
}

impl TryFrom<RiskProfileRow> for RiskProfile {
    type Error = StoreError;

    fn try_from(row: RiskProfileRow) -> StoreResult<Self> {
        Ok(RiskProfile {
            player_id: row.player_id,
            partner_id: row.partner_id,
            risk_score: row.risk_score,
            deposit_count_7d: row.deposit_count_7d,
            deposit_amount_7d: row.deposit_amount_7d,
            deposit_count_30d: row.deposit_count_30d,
            deposit_amount_30d: row.deposit_amount_30d,
            withdrawal_count_7d: row.withdrawal_count_7d,
            withdrawal_amount_7d: row.withdrawal_amount_7d,
            withdrawal_count_30d: row.withdrawal_count_30d,
            withdrawal_amount_30d: row.withdrawal_amount_30d,
            risk_factors: row.risk_factors,
            last_calculated_at: row.last_calculated_at,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<AlertRow> for Alert {
    type Error = StoreError;

    fn try_from(row: AlertRow) -> StoreResult<Self> {
        Ok(Alert {
            id: row.id,
            player_id: row.player_id,
            partner_id: row.partner_id,
            transaction_id: row.transaction_id,
            alert_type: parse_code::<AlertType>("alert type", &row.alert_type)?,
            severity: parse_code::<Severity>("severity", &row.severity)?,
            status: parse_code::<AlertStatus>("alert status", &row.status)?,
            risk_score: row.risk_score,
            risk_factors: row.risk_factors,
            description: row.description,
            report_required: row.report_required,
            reviewed_by: row.reviewed_by,
            review_notes: row.review_notes,
            reported_at: row.reported_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<DeadLetterRow> for DeadLetter {
    fn from(row: DeadLetterRow) -> Self {
        DeadLetter {
            id: row.id,
            topic: row.topic,
            payload: row.payload,
            error: row.error,
            created_at: row.created_at,
        }
    }
}

fn map_unique_violation(err: sqlx::Error, entity: &'static str, key: String) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Duplicate { entity, key }
        }
        _ => StoreError::Database(err),
    }
}

const SELECT_TRANSACTION: &str = "SELECT id, reference_id, wallet_id, player_id, partner_id, \
     tx_type, amount_encrypted, currency, status, original_balance, updated_balance, \
     original_transaction_id, game_id, round_id, metadata, created_at FROM transactions";

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStoreTx {
            tx,
            cipher: Arc::clone(&self.cipher),
        }))
    }

    async fn get_partner(&self, id: Uuid) -> StoreResult<Option<Partner>> {
        let row = sqlx::query_as::<_, PartnerRow>("SELECT * FROM partners WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Partner::try_from).transpose()
    }

    async fn find_api_key_by_digest(&self, digest: &str) -> StoreResult<Option<ApiKey>> {
        let row =
            sqlx::query_as::<_, ApiKeyRow>("SELECT * FROM api_keys WHERE lookup_digest = $1")
                .bind(digest)
                .fetch_optional(&self.pool)
                .await?;
        row.map(ApiKey::try_from).transpose()
    }

    async fn touch_api_key(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("UPDATE api_keys SET last_used_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_wallet(
        &self,
        player_id: &str,
        partner_id: Uuid,
        currency: &Currency,
    ) -> StoreResult<Option<Wallet>> {
        let row = sqlx::query_as::<_, WalletRow>(
            "SELECT * FROM wallets WHERE player_id = $1 AND partner_id = $2 AND currency = $3",
        )
        .bind(player_id)
        .bind(partner_id)
        .bind(currency.code())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Wallet::try_from).transpose()
    }

    async fn list_player_wallets(
        &self,
        player_id: &str,
        partner_id: Uuid,
    ) -> StoreResult<Vec<Wallet>> {
        let rows = sqlx::query_as::<_, WalletRow>(
            "SELECT * FROM wallets WHERE player_id = $1 AND partner_id = $2 ORDER BY created_at",
        )
        .bind(player_id)
        .bind(partner_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Wallet::try_from).collect()
    }

    async fn find_transaction_by_reference(
        &self,
        partner_id: Uuid,
        reference_id: &str,
    ) -> StoreResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "{SELECT_TRANSACTION} WHERE partner_id = $1 AND reference_id = $2"
        ))
        .bind(partner_id)
        .bind(reference_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| transaction_from_row(r, &self.cipher)).transpose()
    }

    async fn list_player_transactions(
        &self,
        player_id: &str,
        partner_id: Uuid,
        filter: &TransactionFilter,
    ) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "{SELECT_TRANSACTION} \
             WHERE player_id = $1 AND partner_id = $2 \
               AND ($3::text IS NULL OR tx_type = $3) \
               AND ($4::timestamptz IS NULL OR created_at >= $4) \
               AND ($5::timestamptz IS NULL OR created_at <= $5) \
             ORDER BY created_at DESC \
             OFFSET $6 LIMIT NULLIF($7, 0)"
        ))
        .bind(player_id)
        .bind(partner_id)
        .bind(filter.tx_type.map(|t| t.to_string()))
        .bind(filter.since)
        .bind(filter.until)
        .bind(filter.offset)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| transaction_from_row(r, &self.cipher))
            .collect()
    }

    async fn get_risk_profile(
        &self,
        player_id: &str,
        partner_id: Uuid,
    ) -> StoreResult<Option<RiskProfile>> {
        let row = sqlx::query_as::<_, RiskProfileRow>(
            "SELECT * FROM aml_risk_profiles WHERE player_id = $1 AND partner_id = $2",
        )
        .bind(player_id)
        .bind(partner_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(RiskProfile::try_from).transpose()
    }

    async fn get_alert(&self, id: Uuid) -> StoreResult<Option<Alert>> {
        let row = sqlx::query_as::<_, AlertRow>("SELECT * FROM aml_alerts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Alert::try_from).transpose()
    }

    async fn list_alerts(&self, filter: &AlertFilter) -> StoreResult<Vec<Alert>> {
        let rows = sqlx::query_as::<_, AlertRow>(
            "SELECT * FROM aml_alerts \
             WHERE ($1::uuid IS NULL OR partner_id = $1) \
               AND ($2::text IS NULL OR player_id = $2) \
               AND ($3::text IS NULL OR status = $3) \
               AND ($4::text IS NULL OR severity = $4) \
             ORDER BY created_at DESC \
             OFFSET $5 LIMIT NULLIF($6, 0)",
        )
        .bind(filter.partner_id)
        .bind(filter.player_id.as_deref())
        .bind(filter.status.map(|s| s.to_string()))
        .bind(filter.severity.map(|s| s.to_string()))
        .bind(filter.offset)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Alert::try_from).collect()
    }

    async fn insert_dead_letter(&self, letter: &DeadLetter) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO event_dead_letters (id, topic, payload, error, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(letter.id)
        .bind(&letter.topic)
        .bind(&letter.payload)
        .bind(&letter.error)
        .bind(letter.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn take_dead_letters(&self, limit: i64) -> StoreResult<Vec<DeadLetter>> {
        let rows = sqlx::query_as::<_, DeadLetterRow>(
            "DELETE FROM event_dead_letters \
             WHERE id IN (SELECT id FROM event_dead_letters ORDER BY created_at ASC LIMIT $1) \
             RETURNING id, topic, payload, error, created_at",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(DeadLetter::from).collect())
    }
}

/// One open Postgres transaction
pub struct PgStoreTx {
    tx: sqlx::Transaction<'static, Postgres>,
    cipher: Arc<AmountCipher>,
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn wallet_for_update(
        &mut self,
        player_id: &str,
        partner_id: Uuid,
        currency: &Currency,
    ) -> StoreResult<Option<Wallet>> {
        let row = sqlx::query_as::<_, WalletRow>(
            "SELECT * FROM wallets \
             WHERE player_id = $1 AND partner_id = $2 AND currency = $3 FOR UPDATE",
        )
        .bind(player_id)
        .bind(partner_id)
        .bind(currency.code())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(Wallet::try_from).transpose()
    }

    async fn insert_wallet(&mut self, wallet: &Wallet) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO wallets \
             (id, player_id, partner_id, currency, balance, is_active, is_locked, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (player_id, partner_id, currency) DO NOTHING",
        )
        .bind(wallet.id)
        .bind(&wallet.player_id)
        .bind(wallet.partner_id)
        .bind(wallet.currency.code())
        .bind(wallet.balance)
        .bind(wallet.is_active)
        .bind(wallet.is_locked)
        .bind(wallet.created_at)
        .bind(wallet.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_wallet_balance(
        &mut self,
        wallet_id: Uuid,
        balance: Decimal,
    ) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE wallets SET balance = $2, updated_at = now() WHERE id = $1")
                .bind(wallet_id)
                .bind(balance)
                .execute(&mut *self.tx)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("wallet", wallet_id.to_string()));
        }
        Ok(())
    }

    async fn find_transaction_by_reference(
        &mut self,
        partner_id: Uuid,
        reference_id: &str,
    ) -> StoreResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "{SELECT_TRANSACTION} WHERE partner_id = $1 AND reference_id = $2"
        ))
        .bind(partner_id)
        .bind(reference_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(|r| transaction_from_row(r, &self.cipher)).transpose()
    }

    async fn insert_transaction(&mut self, tx: &Transaction) -> StoreResult<()> {
        let sealed = self.cipher.encrypt(&tx.amount.to_string())?;
        sqlx::query(
            "INSERT INTO transactions \
             (id, reference_id, wallet_id, player_id, partner_id, tx_type, amount_encrypted, \
              currency, status, original_balance, updated_balance, original_transaction_id, \
              game_id, round_id, metadata, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(tx.id)
        .bind(&tx.reference_id)
        .bind(tx.wallet_id)
        .bind(&tx.player_id)
        .bind(tx.partner_id)
        .bind(tx.tx_type.to_string())
        .bind(sealed)
        .bind(tx.currency.code())
        .bind(tx.status.to_string())
        .bind(tx.original_balance)
        .bind(tx.updated_balance)
        .bind(tx.original_transaction_id)
        .bind(&tx.game_id)
        .bind(&tx.round_id)
        .bind(&tx.metadata)
        .bind(tx.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique_violation(e, "transaction", tx.reference_id.clone()))?;
        Ok(())
    }

    async fn set_transaction_status(
        &mut self,
        id: Uuid,
        status: TransactionStatus,
    ) -> StoreResult<()> {
        let result = sqlx::query("UPDATE transactions SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.to_string())
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("transaction", id.to_string()));
        }
        Ok(())
    }

    async fn get_or_create_risk_profile(
        &mut self,
        player_id: &str,
        partner_id: Uuid,
    ) -> StoreResult<RiskProfile> {
        let row = sqlx::query_as::<_, RiskProfileRow>(
            "SELECT * FROM aml_risk_profiles \
             WHERE player_id = $1 AND partner_id = $2 FOR UPDATE",
        )
        .bind(player_id)
        .bind(partner_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some(row) = row {
            return RiskProfile::try_from(row);
        }

        let profile = RiskProfile::empty(player_id, partner_id);
        sqlx::query(
            "INSERT INTO aml_risk_profiles (player_id, partner_id, risk_factors, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&profile.player_id)
        .bind(profile.partner_id)
        .bind(&profile.risk_factors)
        .bind(profile.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(profile)
    }

    async fn update_risk_profile(&mut self, profile: &RiskProfile) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE aml_risk_profiles SET \
                 risk_score = $3, \
                 deposit_count_7d = $4, deposit_amount_7d = $5, \
                 deposit_count_30d = $6, deposit_amount_30d = $7, \
                 withdrawal_count_7d = $8, withdrawal_amount_7d = $9, \
                 withdrawal_count_30d = $10, withdrawal_amount_30d = $11, \
                 risk_factors = $12, last_calculated_at = $13 \
             WHERE player_id = $1 AND partner_id = $2",
        )
        .bind(&profile.player_id)
        .bind(profile.partner_id)
        .bind(profile.risk_score)
        .bind(profile.deposit_count_7d)
        .bind(profile.deposit_amount_7d)
        .bind(profile.deposit_count_30d)
        .bind(profile.deposit_amount_30d)
        .bind(profile.withdrawal_count_7d)
        .bind(profile.withdrawal_amount_7d)
        .bind(profile.withdrawal_count_30d)
        .bind(profile.withdrawal_amount_30d)
        .bind(&profile.risk_factors)
        .bind(profile.last_calculated_at)
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("risk profile", profile.player_id.clone()));
        }
        Ok(())
    }

    async fn insert_alert(&mut self, alert: &Alert) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO aml_alerts \
             (id, player_id, partner_id, transaction_id, alert_type, severity, status, \
              risk_score, risk_factors, description, report_required, reviewed_by, \
              review_notes, reported_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(alert.id)
        .bind(&alert.player_id)
        .bind(alert.partner_id)
        .bind(alert.transaction_id)
        .bind(alert.alert_type.to_string())
        .bind(alert.severity.to_string())
        .bind(alert.status.to_string())
        .bind(alert.risk_score)
        .bind(&alert.risk_factors)
        .bind(&alert.description)
        .bind(alert.report_required)
        .bind(&alert.reviewed_by)
        .bind(&alert.review_notes)
        .bind(alert.reported_at)
        .bind(alert.created_at)
        .bind(alert.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_alert(&mut self, alert: &Alert) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE aml_alerts SET \
                 status = $2, reviewed_by = $3, review_notes = $4, \
                 reported_at = $5, updated_at = $6 \
             WHERE id = $1",
        )
        .bind(alert.id)
        .bind(alert.status.to_string())
        .bind(&alert.reviewed_by)
        .bind(&alert.review_notes)
        .bind(alert.reported_at)
        .bind(alert.updated_at)
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("alert", alert.id.to_string()));
        }
        Ok(())
    }

    async fn insert_report(&mut self, report: &SuspicionReport) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO aml_reports \
             (id, report_id, alert_id, player_id, partner_id, transaction_id, risk_score, \
              report_data, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(report.id)
        .bind(&report.report_id)
        .bind(report.alert_id)
        .bind(&report.player_id)
        .bind(report.partner_id)
        .bind(report.transaction_id)
        .bind(report.risk_score)
        .bind(&report.report_data)
        .bind(report.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
