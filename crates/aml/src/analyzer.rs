//! The analyzer: event consumption, profile maintenance, alert workflow
//!
//! `analyze` reads the player's recent history outside any transactional
//! scope (the read needs no lock), then applies the profile update, alert
//! and report writes atomically in one scope.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use playgate_core::{
    Alert, AlertStatus, RiskProfile, Severity, SuspicionReport, Transaction, TransactionCreated,
    TransactionStatus, TransactionType,
};
use playgate_store::{AlertFilter, Store, TransactionFilter};

use crate::config::AmlConfig;
use crate::error::{AmlError, AmlResult};
use crate::factors::{evaluate, Analysis};

/// Score damping weights: sustained behavior accumulates, single spikes
/// decay.
const OLD_SCORE_WEIGHT: f64 = 0.7;
const NEW_SCORE_WEIGHT: f64 = 0.3;

/// How far back the analyzer reads
const HISTORY_DAYS: i64 = 30;

/// Result of analyzing one wallet event
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub analysis: Analysis,
    pub profile_score: f64,
    pub alert: Option<Alert>,
    pub report: Option<SuspicionReport>,
}

/// The AML analyzer
pub struct AmlAnalyzer {
    store: Arc<dyn Store>,
    config: AmlConfig,
}

impl AmlAnalyzer {
    pub fn new(store: Arc<dyn Store>, config: AmlConfig) -> Self {
        Self { store, config }
    }

    /// Analyze one committed wallet transaction.
    pub async fn analyze(&self, event: &TransactionCreated) -> AmlResult<AnalysisOutcome> {
        let since = event.created_at - Duration::days(HISTORY_DAYS);
        let history = self
            .store
            .list_player_transactions(
                &event.player_id,
                event.partner_id,
                &TransactionFilter {
                    since: Some(since),
                    ..Default::default()
                },
            )
            .await?;

        let analysis = evaluate(event, &history, &self.config);

        let mut tx = self.store.begin().await?;
        let mut profile = tx
            .get_or_create_risk_profile(&event.player_id, event.partner_id)
            .await?;

        let alert = match analysis.severity {
            Some(severity) => {
                let alert = build_alert(event, &analysis, severity);
                tx.insert_alert(&alert).await?;
                Some(alert)
            }
            None => None,
        };

        let report = if analysis.report_required {
            let report = build_report(event, &analysis, alert.as_ref());
            tx.insert_report(&report).await?;
            Some(report)
        } else {
            None
        };

        apply_to_profile(&mut profile, event, &history, &analysis);
        tx.update_risk_profile(&profile).await?;
        tx.commit().await?;

        if let Some(alert) = &alert {
            info!(
                player = %event.player_id,
                score = analysis.score,
                severity = %alert.severity,
                alert_type = %alert.alert_type,
                "AML alert raised"
            );
        }

        Ok(AnalysisOutcome {
            analysis,
            profile_score: profile.risk_score,
            alert,
            report,
        })
    }

    /// Current risk profile for a player.
    pub async fn profile(&self, player_id: &str, partner_id: Uuid) -> AmlResult<RiskProfile> {
        self.store
            .get_risk_profile(player_id, partner_id)
            .await?
            .ok_or(AmlError::NotFound {
                entity: "risk profile",
            })
    }

    /// Alert listing for the investigation surface.
    pub async fn alerts(&self, filter: &AlertFilter) -> AmlResult<Vec<Alert>> {
        Ok(self.store.list_alerts(filter).await?)
    }

    pub async fn alert(&self, id: Uuid) -> AmlResult<Alert> {
        self.store
            .get_alert(id)
            .await?
            .ok_or(AmlError::NotFound { entity: "alert" })
    }

    /// Walk an alert through the investigation state machine. Moving to
    /// `reported` stamps `reported_at` and files a report record.
    pub async fn update_alert_status(
        &self,
        alert_id: Uuid,
        next: AlertStatus,
        reviewed_by: Option<String>,
        notes: Option<String>,
    ) -> AmlResult<Alert> {
        let mut alert = self
            .store
            .get_alert(alert_id)
            .await?
            .ok_or(AmlError::NotFound { entity: "alert" })?;

        if !alert.status.can_transition_to(next) {
            return Err(AmlError::InvalidTransition {
                from: alert.status,
                to: next,
            });
        }

        let now = Utc::now();
        alert.status = next;
        alert.updated_at = now;
        if reviewed_by.is_some() {
            alert.reviewed_by = reviewed_by;
        }
        if notes.is_some() {
            alert.review_notes = notes;
        }

        let mut tx = self.store.begin().await?;
        if next == AlertStatus::Reported && alert.reported_at.is_none() {
            alert.reported_at = Some(now);
            let report = report_from_alert(&alert);
            tx.insert_report(&report).await?;
        }
        tx.update_alert(&alert).await?;
        tx.commit().await?;

        Ok(alert)
    }
}

fn build_alert(event: &TransactionCreated, analysis: &Analysis, severity: Severity) -> Alert {
    let now = Utc::now();
    Alert {
        id: Uuid::new_v4(),
        player_id: event.player_id.clone(),
        partner_id: event.partner_id,
        transaction_id: Some(event.transaction_id),
        alert_type: analysis.alert_type,
        severity,
        status: AlertStatus::Open,
        risk_score: analysis.score,
        risk_factors: factors_blob(analysis),
        description: describe(event, analysis),
        report_required: analysis.report_required,
        reviewed_by: None,
        review_notes: None,
        reported_at: None,
        created_at: now,
        updated_at: now,
    }
}

fn build_report(
    event: &TransactionCreated,
    analysis: &Analysis,
    alert: Option<&Alert>,
) -> SuspicionReport {
    let id = Uuid::new_v4();
    SuspicionReport {
        id,
        report_id: SuspicionReport::format_report_id(id),
        alert_id: alert.map(|a| a.id),
        player_id: event.player_id.clone(),
        partner_id: event.partner_id,
        transaction_id: Some(event.transaction_id),
        risk_score: analysis.score,
        report_data: json!({
            "report_type": "SAR",
            "transaction": {
                "id": event.transaction_id,
                "type": event.tx_type.to_string(),
                "amount": event.amount.to_string(),
                "currency": event.currency.code(),
                "created_at": event.created_at,
            },
            "risk_factors": factors_blob(analysis),
            "description": describe(event, analysis),
        }),
        created_at: Utc::now(),
    }
}

fn report_from_alert(alert: &Alert) -> SuspicionReport {
    let id = Uuid::new_v4();
    SuspicionReport {
        id,
        report_id: SuspicionReport::format_report_id(id),
        alert_id: Some(alert.id),
        player_id: alert.player_id.clone(),
        partner_id: alert.partner_id,
        transaction_id: alert.transaction_id,
        risk_score: alert.risk_score,
        report_data: json!({
            "report_type": "SAR",
            "alert_type": alert.alert_type.to_string(),
            "risk_factors": alert.risk_factors,
            "description": alert.description,
        }),
        created_at: Utc::now(),
    }
}

/// Factor snapshot persisted with alerts and reports
fn factors_blob(analysis: &Analysis) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for factor in &analysis.factors {
        map.insert(
            factor.kind.to_string(),
            json!({
                "score": factor.score,
                "details": factor.details,
            }),
        );
    }
    serde_json::Value::Object(map)
}

fn describe(event: &TransactionCreated, analysis: &Analysis) -> String {
    let fired: Vec<&str> = analysis.factors.iter().map(|f| f.kind).collect();
    format!(
        "{} of {} {} scored {:.0}/100 (factors: {})",
        event.tx_type,
        event.amount,
        event.currency,
        analysis.score,
        fired.join(", ")
    )
}

/// Profile update: damped score, counters recomputed from source, factor
/// history accumulated.
fn apply_to_profile(
    profile: &mut RiskProfile,
    event: &TransactionCreated,
    history: &[Transaction],
    analysis: &Analysis,
) {
    profile.risk_score =
        (OLD_SCORE_WEIGHT * profile.risk_score + NEW_SCORE_WEIGHT * analysis.score).clamp(0.0, 100.0);

    let week_ago = event.created_at - Duration::days(7);
    let completed = |t: &&Transaction| t.status == TransactionStatus::Completed;

    let deposits: Vec<&Transaction> = history
        .iter()
        .filter(completed)
        .filter(|t| t.tx_type == TransactionType::Deposit)
        .collect();
    let withdrawals: Vec<&Transaction> = history
        .iter()
        .filter(completed)
        .filter(|t| t.tx_type == TransactionType::Withdrawal)
        .collect();

    profile.deposit_count_30d = deposits.len() as i64;
    profile.deposit_amount_30d = deposits.iter().map(|t| t.amount).sum();
    profile.deposit_count_7d = deposits
        .iter()
        .filter(|t| t.created_at > week_ago)
        .count() as i64;
    profile.deposit_amount_7d = deposits
        .iter()
        .filter(|t| t.created_at > week_ago)
        .map(|t| t.amount)
        .sum::<Decimal>();

    profile.withdrawal_count_30d = withdrawals.len() as i64;
    profile.withdrawal_amount_30d = withdrawals.iter().map(|t| t.amount).sum();
    profile.withdrawal_count_7d = withdrawals
        .iter()
        .filter(|t| t.created_at > week_ago)
        .count() as i64;
    profile.withdrawal_amount_7d = withdrawals
        .iter()
        .filter(|t| t.created_at > week_ago)
        .map(|t| t.amount)
        .sum::<Decimal>();

    // Accumulate factor sightings: first/last detection and a counter
    let now = event.created_at;
    if let Some(blob) = profile.risk_factors.as_object_mut() {
        for factor in &analysis.factors {
            match blob.get_mut(factor.kind) {
                Some(entry) => {
                    let count = entry.get("count").and_then(|c| c.as_i64()).unwrap_or(0);
                    entry["count"] = json!(count + 1);
                    entry["last_detected"] = json!(now);
                    entry["details"] = factor.details.clone();
                }
                None => {
                    blob.insert(
                        factor.kind.to_string(),
                        json!({
                            "first_detected": now,
                            "last_detected": now,
                            "count": 1,
                            "details": factor.details,
                        }),
                    );
                }
            }
        }
    } else {
        warn!(player = %profile.player_id, "risk factor blob was not an object, resetting");
        profile.risk_factors = json!({});
    }

    profile.last_calculated_at = Some(now);
}
