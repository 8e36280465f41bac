//! Domain events carried by the in-process bus
//!
//! Topics are string constants. Payloads carry the plain (decrypted) amount:
//! encryption is an at-rest concern, and subscribers like the AML analyzer
//! need the real value.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aml::{AlertType, Severity};
use crate::currency::Currency;
use crate::wallet::TransactionType;

/// Published after every committed wallet transaction
pub const TOPIC_TRANSACTION_CREATED: &str = "wallet.transaction.created";

/// Published when the AML analyzer raises an alert
pub const TOPIC_ALERT_CREATED: &str = "aml.alert.created";

/// Payload for `wallet.transaction.created`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionCreated {
    pub transaction_id: Uuid,
    pub reference_id: String,
    pub wallet_id: Uuid,
    pub player_id: String,
    pub partner_id: Uuid,
    pub tx_type: TransactionType,
    pub currency: Currency,
    pub amount: Decimal,
    pub updated_balance: Decimal,
    pub game_id: Option<String>,
    pub round_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload for `aml.alert.created`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertCreated {
    pub alert_id: Uuid,
    pub player_id: String,
    pub partner_id: Uuid,
    pub transaction_id: Option<Uuid>,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub risk_score: f64,
    pub report_required: bool,
    pub created_at: DateTime<Utc>,
}

/// Envelope routed through the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "topic", content = "payload")]
pub enum DomainEvent {
    #[serde(rename = "wallet.transaction.created")]
    TransactionCreated(TransactionCreated),
    #[serde(rename = "aml.alert.created")]
    AlertCreated(AlertCreated),
}

impl DomainEvent {
    /// The topic constant subscribers register against
    pub fn topic(&self) -> &'static str {
        match self {
            DomainEvent::TransactionCreated(_) => TOPIC_TRANSACTION_CREATED,
            DomainEvent::AlertCreated(_) => TOPIC_ALERT_CREATED,
        }
    }

    /// Ordering key: events with the same key are delivered in order.
    ///
    /// Per-player ordering is what the AML analyzer depends on.
    pub fn partition_key(&self) -> &str {
        match self {
            DomainEvent::TransactionCreated(e) => &e.player_id,
            DomainEvent::AlertCreated(e) => &e.player_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tx_event(player: &str) -> DomainEvent {
        DomainEvent::TransactionCreated(TransactionCreated {
            transaction_id: Uuid::new_v4(),
            reference_id: "r-1".into(),
            wallet_id: Uuid::new_v4(),
            player_id: player.into(),
            partner_id: Uuid::new_v4(),
            tx_type: TransactionType::Deposit,
            currency: Currency::Usd,
            amount: dec!(100.00),
            updated_balance: dec!(100.00),
            game_id: None,
            round_id: None,
            created_at: Utc::now(),
        })
    }

    #[test]
    fn test_topics() {
        assert_eq!(tx_event("p").topic(), "wallet.transaction.created");
    }

    #[test]
    fn test_partition_key_is_player() {
        assert_eq!(tx_event("player-9").partition_key(), "player-9");
    }

    #[test]
    fn test_event_serialization_carries_topic() {
        let json = serde_json::to_value(tx_event("p")).unwrap();
        assert_eq!(json["topic"], "wallet.transaction.created");
        assert_eq!(json["payload"]["amount"], "100.00");
    }
}
