//! In-memory backend
//!
//! Mirrors the Postgres backend's semantics for tests and local runs:
//! transaction amounts are sealed at rest, transactional scopes roll back
//! when dropped uncommitted, and a single async mutex stands in for row
//! locks (coarser, but the same serialization guarantee).

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use playgate_core::{
    Alert, ApiKey, Currency, Partner, RiskProfile, SuspicionReport, Transaction,
    TransactionStatus, Wallet,
};
use playgate_crypto::AmountCipher;

use crate::error::{StoreError, StoreResult};
use crate::traits::{AlertFilter, DeadLetter, Store, StoreTx, TransactionFilter};

/// Transaction record as held at rest: amount sealed, everything else plain.
#[derive(Clone)]
struct SealedTransaction {
    tx: Transaction,
    amount_encrypted: String,
}

#[derive(Default, Clone)]
struct MemState {
    partners: HashMap<Uuid, Partner>,
    api_keys: Vec<ApiKey>,
    wallets: Vec<Wallet>,
    transactions: Vec<SealedTransaction>,
    profiles: Vec<RiskProfile>,
    alerts: Vec<Alert>,
    reports: Vec<SuspicionReport>,
    dead_letters: Vec<DeadLetter>,
}

/// Process-local store with Postgres-equivalent semantics
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemState>>,
    cipher: Arc<AmountCipher>,
}

impl MemoryStore {
    pub fn new(cipher: Arc<AmountCipher>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemState::default())),
            cipher,
        }
    }

    /// Store with a fixed built-in key, for tests and local tooling.
    pub fn with_default_cipher() -> Self {
        Self::new(Arc::new(AmountCipher::from_key_bytes([7u8; 32])))
    }

    // --- seeding helpers (admin CRUD stays outside the core surface) ---

    pub async fn seed_partner(&self, partner: Partner) {
        self.state.lock().await.partners.insert(partner.id, partner);
    }

    pub async fn seed_api_key(&self, key: ApiKey) {
        self.state.lock().await.api_keys.push(key);
    }

    /// Flip the lock flag on an existing wallet.
    pub async fn set_wallet_locked(
        &self,
        player_id: &str,
        partner_id: Uuid,
        currency: &Currency,
        locked: bool,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let wallet = state
            .wallets
            .iter_mut()
            .find(|w| {
                w.player_id == player_id && w.partner_id == partner_id && w.currency == *currency
            })
            .ok_or_else(|| StoreError::not_found("wallet", player_id.to_string()))?;
        wallet.is_locked = locked;
        Ok(())
    }

    fn seal(&self, tx: &Transaction) -> StoreResult<SealedTransaction> {
        Ok(SealedTransaction {
            tx: Transaction {
                // The in-memory copy zeroes the plain amount so nothing at
                // rest holds the real value.
                amount: Decimal::ZERO,
                ..tx.clone()
            },
            amount_encrypted: self.cipher.encrypt(&tx.amount.to_string())?,
        })
    }

    fn unseal(&self, sealed: &SealedTransaction) -> StoreResult<Transaction> {
        let plain = self.cipher.decrypt(&sealed.amount_encrypted)?;
        let amount = Decimal::from_str(&plain)
            .map_err(|_| StoreError::Corrupt(format!("bad sealed amount on tx {}", sealed.tx.id)))?;
        Ok(Transaction {
            amount,
            ..sealed.tx.clone()
        })
    }
}

fn filter_transactions<'a>(
    transactions: impl Iterator<Item = &'a SealedTransaction>,
    player_id: &str,
    partner_id: Uuid,
    filter: &TransactionFilter,
) -> Vec<SealedTransaction> {
    let mut matched: Vec<SealedTransaction> = transactions
        .filter(|s| s.tx.player_id == player_id && s.tx.partner_id == partner_id)
        .filter(|s| filter.tx_type.map_or(true, |t| s.tx.tx_type == t))
        .filter(|s| filter.since.map_or(true, |t| s.tx.created_at >= t))
        .filter(|s| filter.until.map_or(true, |t| s.tx.created_at <= t))
        .cloned()
        .collect();
    matched.sort_by(|a, b| b.tx.created_at.cmp(&a.tx.created_at));

    let offset = filter.offset.max(0) as usize;
    let mut matched: Vec<_> = matched.into_iter().skip(offset).collect();
    if filter.limit > 0 {
        matched.truncate(filter.limit as usize);
    }
    matched
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let scratch = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            scratch,
            store: self.clone(),
        }))
    }

    async fn get_partner(&self, id: Uuid) -> StoreResult<Option<Partner>> {
        Ok(self.state.lock().await.partners.get(&id).cloned())
    }

    async fn find_api_key_by_digest(&self, digest: &str) -> StoreResult<Option<ApiKey>> {
        Ok(self
            .state
            .lock()
            .await
            .api_keys
            .iter()
            .find(|k| k.lookup_digest == digest)
            .cloned())
    }

    async fn touch_api_key(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if let Some(key) = state.api_keys.iter_mut().find(|k| k.id == id) {
            key.last_used_at = Some(at);
        }
        Ok(())
    }

    async fn get_wallet(
        &self,
        player_id: &str,
        partner_id: Uuid,
        currency: &Currency,
    ) -> StoreResult<Option<Wallet>> {
        Ok(self
            .state
            .lock()
            .await
            .wallets
            .iter()
            .find(|w| {
                w.player_id == player_id && w.partner_id == partner_id && w.currency == *currency
            })
            .cloned())
    }

    async fn list_player_wallets(
        &self,
        player_id: &str,
        partner_id: Uuid,
    ) -> StoreResult<Vec<Wallet>> {
        let mut wallets: Vec<Wallet> = self
            .state
            .lock()
            .await
            .wallets
            .iter()
            .filter(|w| w.player_id == player_id && w.partner_id == partner_id)
            .cloned()
            .collect();
        wallets.sort_by_key(|w| w.created_at);
        Ok(wallets)
    }

    async fn find_transaction_by_reference(
        &self,
        partner_id: Uuid,
        reference_id: &str,
    ) -> StoreResult<Option<Transaction>> {
        let state = self.state.lock().await;
        state
            .transactions
            .iter()
            .find(|s| s.tx.partner_id == partner_id && s.tx.reference_id == reference_id)
            .map(|s| self.unseal(s))
            .transpose()
    }

    async fn list_player_transactions(
        &self,
        player_id: &str,
        partner_id: Uuid,
        filter: &TransactionFilter,
    ) -> StoreResult<Vec<Transaction>> {
        let state = self.state.lock().await;
        filter_transactions(state.transactions.iter(), player_id, partner_id, filter)
            .iter()
            .map(|s| self.unseal(s))
            .collect()
    }

    async fn get_risk_profile(
        &self,
        player_id: &str,
        partner_id: Uuid,
    ) -> StoreResult<Option<RiskProfile>> {
        Ok(self
            .state
            .lock()
            .await
            .profiles
            .iter()
            .find(|p| p.player_id == player_id && p.partner_id == partner_id)
            .cloned())
    }

    async fn get_alert(&self, id: Uuid) -> StoreResult<Option<Alert>> {
        Ok(self
            .state
            .lock()
            .await
            .alerts
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn list_alerts(&self, filter: &AlertFilter) -> StoreResult<Vec<Alert>> {
        let state = self.state.lock().await;
        let mut matched: Vec<Alert> = state
            .alerts
            .iter()
            .filter(|a| filter.partner_id.map_or(true, |p| a.partner_id == p))
            .filter(|a| {
                filter
                    .player_id
                    .as_deref()
                    .map_or(true, |p| a.player_id == p)
            })
            .filter(|a| filter.status.map_or(true, |s| a.status == s))
            .filter(|a| filter.severity.map_or(true, |s| a.severity == s))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = filter.offset.max(0) as usize;
        let mut matched: Vec<_> = matched.into_iter().skip(offset).collect();
        if filter.limit > 0 {
            matched.truncate(filter.limit as usize);
        }
        Ok(matched)
    }

    async fn insert_dead_letter(&self, letter: &DeadLetter) -> StoreResult<()> {
        self.state.lock().await.dead_letters.push(letter.clone());
        Ok(())
    }

    async fn take_dead_letters(&self, limit: i64) -> StoreResult<Vec<DeadLetter>> {
        let mut state = self.state.lock().await;
        state.dead_letters.sort_by_key(|l| l.created_at);
        let take = (limit.max(0) as usize).min(state.dead_letters.len());
        Ok(state.dead_letters.drain(..take).collect())
    }
}

/// One open in-memory transaction.
///
/// Holds the global state lock for its lifetime (serializing writers) and
/// mutates a scratch copy; `commit` publishes the scratch atomically.
struct MemoryTx {
    guard: OwnedMutexGuard<MemState>,
    scratch: MemState,
    store: MemoryStore,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn wallet_for_update(
        &mut self,
        player_id: &str,
        partner_id: Uuid,
        currency: &Currency,
    ) -> StoreResult<Option<Wallet>> {
        Ok(self
            .scratch
            .wallets
            .iter()
            .find(|w| {
                w.player_id == player_id && w.partner_id == partner_id && w.currency == *currency
            })
            .cloned())
    }

    async fn insert_wallet(&mut self, wallet: &Wallet) -> StoreResult<()> {
        let exists = self.scratch.wallets.iter().any(|w| {
            w.player_id == wallet.player_id
                && w.partner_id == wallet.partner_id
                && w.currency == wallet.currency
        });
        if !exists {
            self.scratch.wallets.push(wallet.clone());
        }
        Ok(())
    }

    async fn update_wallet_balance(
        &mut self,
        wallet_id: Uuid,
        balance: Decimal,
    ) -> StoreResult<()> {
        let wallet = self
            .scratch
            .wallets
            .iter_mut()
            .find(|w| w.id == wallet_id)
            .ok_or_else(|| StoreError::not_found("wallet", wallet_id.to_string()))?;
        wallet.balance = balance;
        wallet.updated_at = Utc::now();
        Ok(())
    }

    async fn find_transaction_by_reference(
        &mut self,
        partner_id: Uuid,
        reference_id: &str,
    ) -> StoreResult<Option<Transaction>> {
        self.scratch
            .transactions
            .iter()
            .find(|s| s.tx.partner_id == partner_id && s.tx.reference_id == reference_id)
            .map(|s| self.store.unseal(s))
            .transpose()
    }

    async fn insert_transaction(&mut self, tx: &Transaction) -> StoreResult<()> {
        let exists = self.scratch.transactions.iter().any(|s| {
            s.tx.partner_id == tx.partner_id && s.tx.reference_id == tx.reference_id
        });
        if exists {
            return Err(StoreError::duplicate("transaction", tx.reference_id.clone()));
        }
        let sealed = self.store.seal(tx)?;
        self.scratch.transactions.push(sealed);
        Ok(())
    }

    async fn set_transaction_status(
        &mut self,
        id: Uuid,
        status: TransactionStatus,
    ) -> StoreResult<()> {
        let sealed = self
            .scratch
            .transactions
            .iter_mut()
            .find(|s| s.tx.id == id)
            .ok_or_else(|| StoreError::not_found("transaction", id.to_string()))?;
        sealed.tx.status = status;
        Ok(())
    }

    async fn get_or_create_risk_profile(
        &mut self,
        player_id: &str,
        partner_id: Uuid,
    ) -> StoreResult<RiskProfile> {
        if let Some(profile) = self
            .scratch
            .profiles
            .iter()
            .find(|p| p.player_id == player_id && p.partner_id == partner_id)
        {
            return Ok(profile.clone());
        }
        let profile = RiskProfile::empty(player_id, partner_id);
        self.scratch.profiles.push(profile.clone());
        Ok(profile)
    }

    async fn update_risk_profile(&mut self, profile: &RiskProfile) -> StoreResult<()> {
        let slot = self
            .scratch
            .profiles
            .iter_mut()
            .find(|p| p.player_id == profile.player_id && p.partner_id == profile.partner_id)
            .ok_or_else(|| StoreError::not_found("risk profile", profile.player_id.clone()))?;
        *slot = profile.clone();
        Ok(())
    }

    async fn insert_alert(&mut self, alert: &Alert) -> StoreResult<()> {
        self.scratch.alerts.push(alert.clone());
        Ok(())
    }

    async fn update_alert(&mut self, alert: &Alert) -> StoreResult<()> {
        let slot = self
            .scratch
            .alerts
            .iter_mut()
            .find(|a| a.id == alert.id)
            .ok_or_else(|| StoreError::not_found("alert", alert.id.to_string()))?;
        *slot = alert.clone();
        Ok(())
    }

    async fn insert_report(&mut self, report: &SuspicionReport) -> StoreResult<()> {
        self.scratch.reports.push(report.clone());
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> StoreResult<()> {
        *self.guard = self.scratch;
        Ok(())
    }
}
