//! Bus subscriber wiring the analyzer to wallet events

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use playgate_bus::{BusError, BusResult, Publisher, Subscriber};
use playgate_core::{AlertCreated, DomainEvent, TOPIC_TRANSACTION_CREATED};

use crate::analyzer::AmlAnalyzer;

/// Consumes `wallet.transaction.created`, runs the analyzer, and publishes
/// `aml.alert.created` for every raised alert.
///
/// Analysis errors bubble to the bus, which retries with backoff and
/// dead-letters on exhaustion; wallet state is never touched.
pub struct AmlSubscriber {
    analyzer: Arc<AmlAnalyzer>,
    publisher: Publisher,
}

impl AmlSubscriber {
    pub fn new(analyzer: Arc<AmlAnalyzer>, publisher: Publisher) -> Self {
        Self {
            analyzer,
            publisher,
        }
    }
}

#[async_trait]
impl Subscriber for AmlSubscriber {
    fn name(&self) -> &str {
        "aml-analyzer"
    }

    fn topics(&self) -> &[&'static str] {
        &[TOPIC_TRANSACTION_CREATED]
    }

    async fn handle(&self, event: &DomainEvent) -> BusResult<()> {
        let DomainEvent::TransactionCreated(tx_event) = event else {
            return Ok(());
        };

        let outcome = self
            .analyzer
            .analyze(tx_event)
            .await
            .map_err(|e| BusError::handler(e.to_string()))?;

        if let Some(alert) = outcome.alert {
            self.publisher
                .publish(DomainEvent::AlertCreated(AlertCreated {
                    alert_id: alert.id,
                    player_id: alert.player_id.clone(),
                    partner_id: alert.partner_id,
                    transaction_id: alert.transaction_id,
                    alert_type: alert.alert_type,
                    severity: alert.severity,
                    risk_score: alert.risk_score,
                    report_required: alert.report_required,
                    created_at: alert.created_at,
                }))
                .await;
        } else if outcome.analysis.score > 0.0 {
            warn!(
                player = %tx_event.player_id,
                score = outcome.analysis.score,
                "transaction scored below alert threshold"
            );
        }

        Ok(())
    }
}
