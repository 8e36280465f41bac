//! Wallet engine integration tests against the in-memory store.
//!
//! Covers the end-to-end flows (deposit/bet/win/withdraw, retries,
//! concurrent bets, rollback) and the ledger invariants: conservation of
//! funds, monotone audit trail, no overdraft.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use playgate_bus::{BusConfig, EventBus};
use playgate_cache::MemoryCache;
use playgate_core::{Currency, DomainEvent, Transaction, TransactionStatus, TransactionType};
use playgate_store::{MemoryStore, Store, TransactionFilter};
use playgate_wallet::{OperationRequest, RollbackRequest, WalletEngine, WalletError};

struct Harness {
    engine: Arc<WalletEngine>,
    store: Arc<MemoryStore>,
    partner_id: Uuid,
    _bus: EventBus,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::with_default_cipher());
    let bus = EventBus::new(BusConfig::default(), store.clone() as Arc<dyn Store>);
    let engine = Arc::new(WalletEngine::new(
        store.clone() as Arc<dyn Store>,
        bus.publisher(),
        Arc::new(MemoryCache::new()),
    ));
    Harness {
        engine,
        store,
        partner_id: Uuid::new_v4(),
        _bus: bus,
    }
}

fn usd_request(player: &str, reference: &str, amount: Decimal) -> OperationRequest {
    OperationRequest {
        player_id: player.to_string(),
        reference_id: reference.to_string(),
        amount,
        currency: Currency::Usd,
        game_id: None,
        round_id: None,
        related_reference_id: None,
        metadata: None,
    }
}

fn bet_request(player: &str, reference: &str, amount: Decimal, game: &str) -> OperationRequest {
    OperationRequest {
        game_id: Some(game.to_string()),
        ..usd_request(player, reference, amount)
    }
}

/// Signed balance effect of one applied (completed or later canceled) entry.
fn signed_effect(tx: &Transaction) -> Decimal {
    match tx.tx_type {
        TransactionType::Deposit | TransactionType::Win | TransactionType::Bonus => tx.amount,
        TransactionType::Withdrawal | TransactionType::Bet | TransactionType::Commission => {
            -tx.amount
        }
        TransactionType::Rollback | TransactionType::Refund => {
            let original_type = tx
                .metadata
                .as_ref()
                .and_then(|m| m.get("original_type"))
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            match original_type.as_str() {
                "bet" | "withdrawal" => tx.amount,
                "win" => -tx.amount,
                _ => Decimal::ZERO,
            }
        }
        TransactionType::Adjustment => Decimal::ZERO,
    }
}

async fn assert_conserved(h: &Harness, player: &str, currency: &Currency) {
    let txs = h
        .engine
        .transactions(h.partner_id, player, &TransactionFilter::default())
        .await
        .unwrap();
    let applied: Decimal = txs
        .iter()
        .filter(|t| t.currency == *currency)
        .filter(|t| {
            matches!(
                t.status,
                TransactionStatus::Completed | TransactionStatus::Canceled
            )
        })
        .map(signed_effect)
        .sum();

    let balance = h
        .engine
        .balance(h.partner_id, player, Some(currency))
        .await
        .unwrap()
        .balance;
    assert_eq!(applied, balance, "conservation of funds violated");
}

async fn assert_monotone_audit(h: &Harness, player: &str, currency: &Currency) {
    let mut txs = h
        .engine
        .transactions(h.partner_id, player, &TransactionFilter::default())
        .await
        .unwrap();
    txs.retain(|t| t.currency == *currency);
    txs.sort_by_key(|t| t.created_at);

    let mut expected = Decimal::ZERO;
    for tx in &txs {
        assert_eq!(
            tx.original_balance, expected,
            "audit gap before {}",
            tx.reference_id
        );
        expected = tx.updated_balance;
    }
}

#[tokio::test]
async fn test_deposit_bet_win_withdraw_flow() {
    let h = harness();

    let d = h
        .engine
        .deposit(h.partner_id, &usd_request("lucy", "d1", dec!(100.00)))
        .await
        .unwrap();
    assert_eq!(d.balance, dec!(100.00));
    assert_eq!(d.tx_type, TransactionType::Deposit);
    assert_eq!(d.status, TransactionStatus::Completed);

    let b = h
        .engine
        .bet(h.partner_id, &bet_request("lucy", "b1", dec!(30.00), "g1"))
        .await
        .unwrap();
    assert_eq!(b.balance, dec!(70.00));

    let w = h
        .engine
        .win(
            h.partner_id,
            &OperationRequest {
                related_reference_id: Some("b1".to_string()),
                ..bet_request("lucy", "w1", dec!(50.00), "g1")
            },
        )
        .await
        .unwrap();
    assert_eq!(w.balance, dec!(120.00));

    let o = h
        .engine
        .withdraw(h.partner_id, &usd_request("lucy", "o1", dec!(120.00)))
        .await
        .unwrap();
    assert_eq!(o.balance, dec!(0.00));

    let txs = h
        .engine
        .transactions(h.partner_id, "lucy", &TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(txs.len(), 4);

    // The win references the settled bet
    let win_tx = txs.iter().find(|t| t.reference_id == "w1").unwrap();
    let bet_tx = txs.iter().find(|t| t.reference_id == "b1").unwrap();
    assert_eq!(win_tx.original_transaction_id, Some(bet_tx.id));

    assert_conserved(&h, "lucy", &Currency::Usd).await;
    assert_monotone_audit(&h, "lucy", &Currency::Usd).await;
}

#[tokio::test]
async fn test_idempotent_retry_returns_stored_result() {
    let h = harness();

    let first = h
        .engine
        .deposit(h.partner_id, &usd_request("rita", "r-dup", dec!(50.00)))
        .await
        .unwrap();
    assert_eq!(first.balance, dec!(50.00));

    let replay = h
        .engine
        .deposit(h.partner_id, &usd_request("rita", "r-dup", dec!(50.00)))
        .await
        .unwrap();
    assert_eq!(replay.transaction_id, first.transaction_id);
    assert_eq!(replay.balance, dec!(50.00));

    // Still exactly one transaction row
    let txs = h
        .engine
        .transactions(h.partner_id, "rita", &TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(txs.len(), 1);
}

#[tokio::test]
async fn test_idempotency_conflict_on_diverging_payload() {
    let h = harness();

    h.engine
        .deposit(h.partner_id, &usd_request("rita", "r-dup", dec!(50.00)))
        .await
        .unwrap();

    let err = h
        .engine
        .deposit(h.partner_id, &usd_request("rita", "r-dup", dec!(60.00)))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::IdempotencyConflict { .. }));

    // Divergent type with the same reference also conflicts
    let err = h
        .engine
        .withdraw(h.partner_id, &usd_request("rita", "r-dup", dec!(50.00)))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::IdempotencyConflict { .. }));

    // Balance untouched
    let view = h
        .engine
        .balance(h.partner_id, "rita", Some(&Currency::Usd))
        .await
        .unwrap();
    assert_eq!(view.balance, dec!(50.00));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bets_never_overdraw() {
    let h = harness();
    h.engine
        .deposit(h.partner_id, &usd_request("carl", "seed", dec!(100.00)))
        .await
        .unwrap();

    let e1 = h.engine.clone();
    let e2 = h.engine.clone();
    let p = h.partner_id;
    let t1 =
        tokio::spawn(async move { e1.bet(p, &bet_request("carl", "cb-1", dec!(40.00), "g")).await });
    let t2 =
        tokio::spawn(async move { e2.bet(p, &bet_request("carl", "cb-2", dec!(70.00), "g")).await });

    let r1 = t1.await.unwrap();
    let r2 = t2.await.unwrap();

    // Exactly one commits, the other hits insufficient funds
    let successes = [r1.is_ok(), r2.is_ok()].iter().filter(|b| **b).count();
    assert_eq!(successes, 1);
    let failure = if r1.is_err() { r1 } else { r2 };
    assert!(matches!(
        failure.unwrap_err(),
        WalletError::InsufficientFunds { .. }
    ));

    let balance = h
        .engine
        .balance(h.partner_id, "carl", Some(&Currency::Usd))
        .await
        .unwrap()
        .balance;
    assert!(balance == dec!(60.00) || balance == dec!(30.00));
    assert!(balance >= Decimal::ZERO);

    // The log holds exactly one completed bet, never both
    let txs = h
        .engine
        .transactions(h.partner_id, "carl", &TransactionFilter::default())
        .await
        .unwrap();
    let completed_bets = txs
        .iter()
        .filter(|t| t.tx_type == TransactionType::Bet)
        .filter(|t| t.status == TransactionStatus::Completed)
        .count();
    assert_eq!(completed_bets, 1);

    assert_conserved(&h, "carl", &Currency::Usd).await;
    assert_monotone_audit(&h, "carl", &Currency::Usd).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_no_overdraft_under_concurrent_withdrawals() {
    let h = harness();
    h.engine
        .deposit(h.partner_id, &usd_request("nora", "seed", dec!(50.00)))
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for i in 0..10 {
        let engine = h.engine.clone();
        let partner = h.partner_id;
        tasks.push(tokio::spawn(async move {
            engine
                .withdraw(partner, &usd_request("nora", &format!("wd-{i}"), dec!(20.00)))
                .await
        }));
    }

    let mut successes = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            successes += 1;
        }
    }
    // 50.00 covers exactly two 20.00 withdrawals
    assert_eq!(successes, 2);

    let balance = h
        .engine
        .balance(h.partner_id, "nora", Some(&Currency::Usd))
        .await
        .unwrap()
        .balance;
    assert_eq!(balance, dec!(10.00));

    assert_conserved(&h, "nora", &Currency::Usd).await;
    assert_monotone_audit(&h, "nora", &Currency::Usd).await;
}

#[tokio::test]
async fn test_rollback_and_double_rollback() {
    let h = harness();
    h.engine
        .deposit(h.partner_id, &usd_request("omar", "seed", dec!(100.00)))
        .await
        .unwrap();
    h.engine
        .bet(h.partner_id, &bet_request("omar", "b-roll", dec!(25.00), "g1"))
        .await
        .unwrap();

    let rollback = RollbackRequest {
        player_id: "omar".to_string(),
        reference_id: "rb-1".to_string(),
        original_reference_id: "b-roll".to_string(),
        reason: Some("round voided".to_string()),
        metadata: None,
    };
    let outcome = h.engine.rollback(h.partner_id, &rollback).await.unwrap();
    assert_eq!(outcome.balance, dec!(100.00));
    assert_eq!(outcome.tx_type, TransactionType::Rollback);

    // Original marked canceled
    let txs = h
        .engine
        .transactions(h.partner_id, "omar", &TransactionFilter::default())
        .await
        .unwrap();
    let original = txs.iter().find(|t| t.reference_id == "b-roll").unwrap();
    assert_eq!(original.status, TransactionStatus::Canceled);

    // Replaying the same rollback is idempotent
    let replay = h.engine.rollback(h.partner_id, &rollback).await.unwrap();
    assert_eq!(replay.transaction_id, outcome.transaction_id);

    // A second rollback of the same original under a new reference fails
    let err = h
        .engine
        .rollback(
            h.partner_id,
            &RollbackRequest {
                reference_id: "rb-2".to_string(),
                ..rollback.clone()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::AlreadyRolledBack { .. }));

    assert_conserved(&h, "omar", &Currency::Usd).await;
    assert_monotone_audit(&h, "omar", &Currency::Usd).await;
}

#[tokio::test]
async fn test_rollback_symmetry_for_win() {
    let h = harness();
    h.engine
        .deposit(h.partner_id, &usd_request("pia", "seed", dec!(40.00)))
        .await
        .unwrap();
    let before = h
        .engine
        .balance(h.partner_id, "pia", Some(&Currency::Usd))
        .await
        .unwrap()
        .balance;

    h.engine
        .win(h.partner_id, &bet_request("pia", "w-sym", dec!(15.00), "g2"))
        .await
        .unwrap();
    let after = h
        .engine
        .rollback(
            h.partner_id,
            &RollbackRequest {
                player_id: "pia".to_string(),
                reference_id: "rb-sym".to_string(),
                original_reference_id: "w-sym".to_string(),
                reason: None,
                metadata: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(after.balance, before);
}

#[tokio::test]
async fn test_rollback_rejects_deposit_and_unknown_targets() {
    let h = harness();
    h.engine
        .deposit(h.partner_id, &usd_request("quinn", "d-1", dec!(10.00)))
        .await
        .unwrap();

    // Deposits are not rollbackable
    let err = h
        .engine
        .rollback(
            h.partner_id,
            &RollbackRequest {
                player_id: "quinn".to_string(),
                reference_id: "rb-x".to_string(),
                original_reference_id: "d-1".to_string(),
                reason: None,
                metadata: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::NotFound { .. }));

    // Unknown original
    let err = h
        .engine
        .rollback(
            h.partner_id,
            &RollbackRequest {
                player_id: "quinn".to_string(),
                reference_id: "rb-y".to_string(),
                original_reference_id: "nope".to_string(),
                reason: None,
                metadata: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::NotFound { .. }));
}

#[tokio::test]
async fn test_currency_isolation() {
    let h = harness();
    h.engine
        .deposit(h.partner_id, &usd_request("sven", "d-usd", dec!(100.00)))
        .await
        .unwrap();

    // Betting in EUR against a USD-only player is a currency mismatch
    let err = h
        .engine
        .bet(
            h.partner_id,
            &OperationRequest {
                currency: Currency::Eur,
                ..bet_request("sven", "b-eur", dec!(10.00), "g")
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::CurrencyMismatch { .. }));

    // A deposit in a second currency lazily opens a second wallet
    h.engine
        .deposit(
            h.partner_id,
            &OperationRequest {
                currency: Currency::Eur,
                ..usd_request("sven", "d-eur", dec!(20.00))
            },
        )
        .await
        .unwrap();

    let eur = h
        .engine
        .balance(h.partner_id, "sven", Some(&Currency::Eur))
        .await
        .unwrap();
    assert_eq!(eur.balance, dec!(20.00));
    let usd = h
        .engine
        .balance(h.partner_id, "sven", Some(&Currency::Usd))
        .await
        .unwrap();
    assert_eq!(usd.balance, dec!(100.00));

    // Without a currency the read is ambiguous now
    let err = h.engine.balance(h.partner_id, "sven", None).await.unwrap_err();
    assert!(matches!(err, WalletError::CurrencyMismatch { .. }));
}

#[tokio::test]
async fn test_amount_validation() {
    let h = harness();

    let err = h
        .engine
        .deposit(h.partner_id, &usd_request("tess", "d-0", dec!(0)))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InvalidAmount(_)));

    let err = h
        .engine
        .deposit(h.partner_id, &usd_request("tess", "d-neg", dec!(-5)))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InvalidAmount(_)));

    let err = h
        .engine
        .deposit(h.partner_id, &usd_request("tess", "d-frac", dec!(1.005)))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InvalidAmount(_)));

    // JPY rejects fractional yen
    let err = h
        .engine
        .deposit(
            h.partner_id,
            &OperationRequest {
                currency: Currency::Jpy,
                ..usd_request("tess", "d-jpy", dec!(100.5))
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InvalidAmount(_)));
}

#[tokio::test]
async fn test_locked_wallet_rejects_mutations() {
    let h = harness();
    h.engine
        .deposit(h.partner_id, &usd_request("uma", "seed", dec!(30.00)))
        .await
        .unwrap();
    h.store
        .set_wallet_locked("uma", h.partner_id, &Currency::Usd, true)
        .await
        .unwrap();

    let err = h
        .engine
        .deposit(h.partner_id, &usd_request("uma", "d-2", dec!(10.00)))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::WalletLocked));

    let err = h
        .engine
        .withdraw(h.partner_id, &usd_request("uma", "w-2", dec!(10.00)))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::WalletLocked));
}

#[tokio::test]
async fn test_debit_without_wallet_is_not_found() {
    let h = harness();
    let err = h
        .engine
        .withdraw(h.partner_id, &usd_request("victor", "w-1", dec!(10.00)))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::NotFound { .. }));
}

#[tokio::test]
async fn test_win_with_dangling_bet_reference_fails() {
    let h = harness();
    let err = h
        .engine
        .win(
            h.partner_id,
            &OperationRequest {
                related_reference_id: Some("no-such-bet".to_string()),
                ..bet_request("wes", "w-1", dec!(10.00), "g")
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::NotFound { .. }));
}

#[tokio::test]
async fn test_commit_publishes_transaction_event() {
    use async_trait::async_trait;
    use playgate_bus::{BusResult, Subscriber};
    use playgate_core::TOPIC_TRANSACTION_CREATED;
    use std::sync::Mutex;

    struct Recorder {
        events: Mutex<Vec<DomainEvent>>,
    }

    #[async_trait]
    impl Subscriber for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }
        fn topics(&self) -> &[&'static str] {
            &[TOPIC_TRANSACTION_CREATED]
        }
        async fn handle(&self, event: &DomainEvent) -> BusResult<()> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    let store = Arc::new(MemoryStore::with_default_cipher());
    let bus = EventBus::new(BusConfig::default(), store.clone() as Arc<dyn Store>);
    let recorder = Arc::new(Recorder {
        events: Mutex::new(Vec::new()),
    });
    bus.subscribe(recorder.clone());
    bus.start();

    let engine = WalletEngine::new(
        store as Arc<dyn Store>,
        bus.publisher(),
        Arc::new(MemoryCache::new()),
    );
    let partner_id = Uuid::new_v4();
    engine
        .deposit(partner_id, &usd_request("zoe", "d-ev", dec!(42.00)))
        .await
        .unwrap();

    for _ in 0..100 {
        if !recorder.events.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let events = recorder.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    match &events[0] {
        DomainEvent::TransactionCreated(e) => {
            assert_eq!(e.player_id, "zoe");
            assert_eq!(e.amount, dec!(42.00));
            assert_eq!(e.updated_balance, dec!(42.00));
            assert_eq!(e.tx_type, TransactionType::Deposit);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    bus.shutdown();
}
