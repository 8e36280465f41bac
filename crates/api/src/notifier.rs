//! Compliance notification subscriber
//!
//! Consumes `aml.alert.created` and surfaces high-priority alerts to the
//! operational log, where the paging pipeline picks them up.

use async_trait::async_trait;

use playgate_bus::{BusResult, Subscriber};
use playgate_core::{DomainEvent, Severity, TOPIC_ALERT_CREATED};
use tracing::{info, warn};

pub struct AlertNotifier;

#[async_trait]
impl Subscriber for AlertNotifier {
    fn name(&self) -> &str {
        "alert-notifier"
    }

    fn topics(&self) -> &[&'static str] {
        &[TOPIC_ALERT_CREATED]
    }

    async fn handle(&self, event: &DomainEvent) -> BusResult<()> {
        let DomainEvent::AlertCreated(alert) = event else {
            return Ok(());
        };

        if alert.severity >= Severity::High {
            warn!(
                alert_id = %alert.alert_id,
                player = %alert.player_id,
                severity = %alert.severity,
                score = alert.risk_score,
                report_required = alert.report_required,
                "high priority AML alert"
            );
        } else {
            info!(
                alert_id = %alert.alert_id,
                player = %alert.player_id,
                severity = %alert.severity,
                "AML alert created"
            );
        }
        Ok(())
    }
}
