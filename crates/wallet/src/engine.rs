//! The balance state machine
//!
//! Every mutating operation follows the same protocol:
//!
//! 1. validate the amount against the currency scale
//! 2. idempotency pre-check by (partner, reference) outside the transaction
//! 3. open a store transaction and re-check idempotency inside it
//! 4. acquire the wallet row lock (concurrent writers serialize here)
//! 5. apply the operation rule to compute the new balance
//! 6. write the transaction record (amount sealed by the store) and the
//!    new balance
//! 7. commit, invalidate the balance cache, publish the event
//!
//! An error anywhere before commit drops the transaction, which rolls the
//! scope back; the idempotency key is not burned.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use playgate_bus::Publisher;
use playgate_cache::Cache;
use playgate_core::{
    Amount, Currency, DomainEvent, Transaction, TransactionCreated, TransactionStatus,
    TransactionType, Wallet,
};
use playgate_store::{Store, TransactionFilter};

use crate::error::{WalletError, WalletResult};
use crate::requests::{BalanceView, OperationOutcome, OperationRequest, RollbackRequest};

const BALANCE_CACHE_TTL: Duration = Duration::from_secs(60);

/// The wallet engine. One instance serves every partner.
pub struct WalletEngine {
    store: Arc<dyn Store>,
    publisher: Publisher,
    cache: Arc<dyn Cache>,
}

/// How one transaction type applies to a balance
struct OpSpec {
    tx_type: TransactionType,
    /// true adds to the balance, false subtracts (with funds check)
    credit: bool,
    /// Credit operations open a wallet on first sight of the
    /// (player, partner, currency) tuple; debit operations never do.
    create_wallet: bool,
}

impl WalletEngine {
    pub fn new(store: Arc<dyn Store>, publisher: Publisher, cache: Arc<dyn Cache>) -> Self {
        Self {
            store,
            publisher,
            cache,
        }
    }

    // --- public operations ---

    pub async fn deposit(
        &self,
        partner_id: Uuid,
        req: &OperationRequest,
    ) -> WalletResult<OperationOutcome> {
        self.execute(
            partner_id,
            req,
            OpSpec {
                tx_type: TransactionType::Deposit,
                credit: true,
                create_wallet: true,
            },
        )
        .await
    }

    pub async fn withdraw(
        &self,
        partner_id: Uuid,
        req: &OperationRequest,
    ) -> WalletResult<OperationOutcome> {
        self.execute(
            partner_id,
            req,
            OpSpec {
                tx_type: TransactionType::Withdrawal,
                credit: false,
                create_wallet: false,
            },
        )
        .await
    }

    /// Bet: a debit carrying game context (`game_id` required, enforced at
    /// the request boundary; `round_id` travels in the record).
    pub async fn bet(
        &self,
        partner_id: Uuid,
        req: &OperationRequest,
    ) -> WalletResult<OperationOutcome> {
        self.execute(
            partner_id,
            req,
            OpSpec {
                tx_type: TransactionType::Bet,
                credit: false,
                create_wallet: false,
            },
        )
        .await
    }

    /// Win: a credit that may reference the settled bet via
    /// `related_reference_id`.
    pub async fn win(
        &self,
        partner_id: Uuid,
        req: &OperationRequest,
    ) -> WalletResult<OperationOutcome> {
        self.execute(
            partner_id,
            req,
            OpSpec {
                tx_type: TransactionType::Win,
                credit: true,
                create_wallet: true,
            },
        )
        .await
    }

    /// Invert a completed bet, win or withdrawal and cancel the original.
    pub async fn rollback(
        &self,
        partner_id: Uuid,
        req: &RollbackRequest,
    ) -> WalletResult<OperationOutcome> {
        // Idempotency pre-check for the rollback's own reference.
        if let Some(stored) = self
            .store
            .find_transaction_by_reference(partner_id, &req.reference_id)
            .await?
        {
            return self.replay_rollback(partner_id, stored, req).await;
        }

        let mut tx = self.store.begin().await?;

        if let Some(stored) = tx
            .find_transaction_by_reference(partner_id, &req.reference_id)
            .await?
        {
            drop(tx);
            return self.replay_rollback(partner_id, stored, req).await;
        }

        let original = tx
            .find_transaction_by_reference(partner_id, &req.original_reference_id)
            .await?
            .ok_or(WalletError::NotFound {
                entity: "original transaction",
            })?;

        if original.status == TransactionStatus::Canceled {
            return Err(WalletError::AlreadyRolledBack {
                reference_id: req.original_reference_id.clone(),
            });
        }
        if !original.is_rollbackable() || original.player_id != req.player_id {
            // Only completed bet/win/withdrawal entries of this player's
            // wallet are valid targets.
            return Err(WalletError::NotFound {
                entity: "rollbackable transaction",
            });
        }

        let wallet = tx
            .wallet_for_update(&req.player_id, partner_id, &original.currency)
            .await?
            .filter(|w| w.id == original.wallet_id)
            .ok_or(WalletError::NotFound { entity: "wallet" })?;

        let original_balance = wallet.balance;
        let updated_balance = match original.tx_type {
            // Inverting a debit returns funds
            TransactionType::Bet | TransactionType::Withdrawal => {
                original_balance + original.amount
            }
            // Inverting a credit takes them back
            TransactionType::Win => {
                if original_balance < original.amount {
                    return Err(WalletError::InsufficientFunds {
                        balance: original_balance,
                        requested: original.amount,
                    });
                }
                original_balance - original.amount
            }
            _ => unreachable!("is_rollbackable() restricts the type"),
        };

        tx.set_transaction_status(original.id, TransactionStatus::Canceled)
            .await?;

        let mut metadata = req.metadata.clone().unwrap_or_else(|| json!({}));
        if let Some(obj) = metadata.as_object_mut() {
            obj.insert(
                "original_reference_id".into(),
                json!(req.original_reference_id),
            );
            obj.insert("original_type".into(), json!(original.tx_type.to_string()));
            if let Some(reason) = &req.reason {
                obj.insert("reason".into(), json!(reason));
            }
        }

        let record = Transaction {
            id: Uuid::new_v4(),
            reference_id: req.reference_id.clone(),
            wallet_id: wallet.id,
            player_id: req.player_id.clone(),
            partner_id,
            tx_type: TransactionType::Rollback,
            amount: original.amount,
            currency: original.currency.clone(),
            status: TransactionStatus::Completed,
            original_balance,
            updated_balance,
            original_transaction_id: Some(original.id),
            game_id: original.game_id.clone(),
            round_id: original.round_id.clone(),
            metadata: Some(metadata),
            created_at: Utc::now(),
        };

        tx.insert_transaction(&record).await?;
        tx.update_wallet_balance(wallet.id, updated_balance).await?;
        tx.commit().await?;

        self.after_commit(&record).await;
        Ok(outcome_of(&record))
    }

    /// Current balance. With no currency given the player must hold
    /// exactly one wallet.
    pub async fn balance(
        &self,
        partner_id: Uuid,
        player_id: &str,
        currency: Option<&Currency>,
    ) -> WalletResult<BalanceView> {
        if let Some(currency) = currency {
            let cache_key = balance_cache_key(partner_id, player_id, currency);
            if let Ok(Some(cached)) = self.cache.get(&cache_key).await {
                if let Ok(view) = serde_json::from_str::<BalanceView>(&cached) {
                    return Ok(view);
                }
            }

            let wallet = self
                .store
                .get_wallet(player_id, partner_id, currency)
                .await?
                .ok_or(WalletError::NotFound { entity: "wallet" })?;
            let view = view_of(&wallet)?;

            if let Ok(serialized) = serde_json::to_string(&view) {
                if let Err(e) = self
                    .cache
                    .set(&cache_key, &serialized, BALANCE_CACHE_TTL)
                    .await
                {
                    warn!(error = %e, "balance cache write failed");
                }
            }
            return Ok(view);
        }

        let wallets = self.store.list_player_wallets(player_id, partner_id).await?;
        match wallets.as_slice() {
            [] => Err(WalletError::NotFound { entity: "wallet" }),
            [wallet] => view_of(wallet),
            _ => Err(WalletError::CurrencyMismatch {
                detail: "player holds multiple currencies, specify one".to_string(),
            }),
        }
    }

    /// Player transaction history, most recent first.
    pub async fn transactions(
        &self,
        partner_id: Uuid,
        player_id: &str,
        filter: &TransactionFilter,
    ) -> WalletResult<Vec<Transaction>> {
        Ok(self
            .store
            .list_player_transactions(player_id, partner_id, filter)
            .await?)
    }

    // --- internals ---

    async fn execute(
        &self,
        partner_id: Uuid,
        req: &OperationRequest,
        spec: OpSpec,
    ) -> WalletResult<OperationOutcome> {
        let amount = Amount::new(req.amount, &req.currency)?;

        if let Some(stored) = self
            .store
            .find_transaction_by_reference(partner_id, &req.reference_id)
            .await?
        {
            return replay(&stored, req, spec.tx_type, &amount);
        }

        let mut tx = self.store.begin().await?;

        // Re-check under the transaction: a concurrent retry may have
        // committed between the pre-check and here.
        if let Some(stored) = tx
            .find_transaction_by_reference(partner_id, &req.reference_id)
            .await?
        {
            drop(tx);
            return replay(&stored, req, spec.tx_type, &amount);
        }

        let wallet = match tx
            .wallet_for_update(&req.player_id, partner_id, &req.currency)
            .await?
        {
            Some(wallet) => wallet,
            None if spec.create_wallet => {
                // First sight of this (player, partner, currency). The
                // insert is a no-op if a concurrent request won the race;
                // re-reading under the lock settles on one row either way.
                tx.insert_wallet(&Wallet::open(
                    req.player_id.clone(),
                    partner_id,
                    req.currency.clone(),
                ))
                .await?;
                tx.wallet_for_update(&req.player_id, partner_id, &req.currency)
                    .await?
                    .ok_or(WalletError::NotFound { entity: "wallet" })?
            }
            None => {
                drop(tx);
                return Err(self
                    .missing_wallet_error(&req.player_id, partner_id, &req.currency)
                    .await);
            }
        };

        if !wallet.is_active {
            return Err(WalletError::WalletInactive);
        }
        if wallet.is_locked {
            return Err(WalletError::WalletLocked);
        }

        let original_balance = wallet.balance;
        let updated_balance = if spec.credit {
            original_balance + amount.value()
        } else {
            if original_balance < amount.value() {
                return Err(WalletError::InsufficientFunds {
                    balance: original_balance,
                    requested: amount.value(),
                });
            }
            original_balance - amount.value()
        };

        // Win may settle a specific bet; a dangling reference is an error.
        let original_transaction_id = match &req.related_reference_id {
            Some(related_ref) => {
                let related = tx
                    .find_transaction_by_reference(partner_id, related_ref)
                    .await?
                    .ok_or(WalletError::NotFound {
                        entity: "related transaction",
                    })?;
                Some(related.id)
            }
            None => None,
        };

        let record = Transaction {
            id: Uuid::new_v4(),
            reference_id: req.reference_id.clone(),
            wallet_id: wallet.id,
            player_id: req.player_id.clone(),
            partner_id,
            tx_type: spec.tx_type,
            amount: amount.value(),
            currency: req.currency.clone(),
            status: TransactionStatus::Completed,
            original_balance,
            updated_balance,
            original_transaction_id,
            game_id: req.game_id.clone(),
            round_id: req.round_id.clone(),
            metadata: req.metadata.clone(),
            created_at: Utc::now(),
        };

        tx.insert_transaction(&record).await?;
        tx.update_wallet_balance(wallet.id, updated_balance).await?;
        tx.commit().await?;

        self.after_commit(&record).await;
        Ok(outcome_of(&record))
    }

    /// Distinguish "no wallet at all" from "wrong currency" for a debit
    /// against a missing (player, partner, currency) row.
    async fn missing_wallet_error(
        &self,
        player_id: &str,
        partner_id: Uuid,
        currency: &Currency,
    ) -> WalletError {
        match self.store.list_player_wallets(player_id, partner_id).await {
            Ok(wallets) if wallets.is_empty() => WalletError::NotFound { entity: "wallet" },
            Ok(wallets) => WalletError::currency_mismatch(&wallets[0].currency, currency),
            Err(e) => e.into(),
        }
    }

    /// Replay path for the rollback operation's own idempotency.
    async fn replay_rollback(
        &self,
        partner_id: Uuid,
        stored: Transaction,
        req: &RollbackRequest,
    ) -> WalletResult<OperationOutcome> {
        let original = self
            .store
            .find_transaction_by_reference(partner_id, &req.original_reference_id)
            .await?;

        let matches = stored.tx_type == TransactionType::Rollback
            && stored.player_id == req.player_id
            && original
                .as_ref()
                .map_or(false, |o| stored.original_transaction_id == Some(o.id));

        if matches {
            Ok(outcome_of(&stored))
        } else {
            Err(WalletError::IdempotencyConflict {
                reference_id: req.reference_id.clone(),
            })
        }
    }

    /// Post-commit side effects: cache invalidation and event publication.
    /// Neither can fail the operation.
    async fn after_commit(&self, record: &Transaction) {
        let _ = self
            .cache
            .delete(&balance_cache_key(
                record.partner_id,
                &record.player_id,
                &record.currency,
            ))
            .await;

        info!(
            partner = %record.partner_id,
            player = %record.player_id,
            tx_type = %record.tx_type,
            reference = %record.reference_id,
            "wallet transaction committed"
        );

        self.publisher
            .publish(DomainEvent::TransactionCreated(TransactionCreated {
                transaction_id: record.id,
                reference_id: record.reference_id.clone(),
                wallet_id: record.wallet_id,
                player_id: record.player_id.clone(),
                partner_id: record.partner_id,
                tx_type: record.tx_type,
                currency: record.currency.clone(),
                amount: record.amount,
                updated_balance: record.updated_balance,
                game_id: record.game_id.clone(),
                round_id: record.round_id.clone(),
                created_at: record.created_at,
            }))
            .await;
    }
}

/// Idempotent replay: identical payload returns the stored result, any
/// divergence is a conflict.
fn replay(
    stored: &Transaction,
    req: &OperationRequest,
    tx_type: TransactionType,
    amount: &Amount,
) -> WalletResult<OperationOutcome> {
    if stored.matches_request(&req.player_id, tx_type, amount.value(), &req.currency) {
        Ok(outcome_of(stored))
    } else {
        Err(WalletError::IdempotencyConflict {
            reference_id: req.reference_id.clone(),
        })
    }
}

fn outcome_of(record: &Transaction) -> OperationOutcome {
    OperationOutcome {
        transaction_id: record.id,
        reference_id: record.reference_id.clone(),
        tx_type: record.tx_type,
        status: record.status,
        amount: record.amount,
        currency: record.currency.clone(),
        balance: record.updated_balance,
        created_at: record.created_at,
    }
}

fn view_of(wallet: &Wallet) -> WalletResult<BalanceView> {
    if !wallet.is_active {
        return Err(WalletError::WalletInactive);
    }
    Ok(BalanceView {
        player_id: wallet.player_id.clone(),
        partner_id: wallet.partner_id,
        balance: wallet.balance,
        currency: wallet.currency.clone(),
    })
}

fn balance_cache_key(partner_id: Uuid, player_id: &str, currency: &Currency) -> String {
    format!("balance:{partner_id}:{player_id}:{currency}")
}
