//! AML records: risk profiles, alerts and regulatory reports
//!
//! One risk profile per (player, partner), updated in place by the analyzer.
//! Alerts snapshot the score and factor breakdown at detection time and walk
//! the investigation state machine until closed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Bucketized view of a risk score
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Bucketize a score in [0, 100].
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            RiskLevel::Critical
        } else if score >= 60.0 {
            RiskLevel::High
        } else if score >= 40.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Alert severity, derived from the score at alert time
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// What kind of detection raised the alert
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Threshold,
    Pattern,
    Blacklist,
    Manual,
}

/// Investigation workflow states for an alert
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Open,
    Investigating,
    PendingReport,
    Reported,
    ClosedFalsePositive,
    ClosedConfirmed,
}

impl AlertStatus {
    /// Whether the investigation state machine permits `self → next`.
    ///
    /// Forward-only: an alert never reopens, and closed states accept no
    /// further transitions.
    pub fn can_transition_to(&self, next: AlertStatus) -> bool {
        use AlertStatus::*;
        matches!(
            (self, next),
            (Open, Investigating)
                | (Open, ClosedFalsePositive)
                | (Investigating, PendingReport)
                | (Investigating, ClosedFalsePositive)
                | (Investigating, ClosedConfirmed)
                | (PendingReport, Reported)
                | (PendingReport, ClosedFalsePositive)
                | (Reported, ClosedConfirmed)
        )
    }

    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            AlertStatus::ClosedFalsePositive | AlertStatus::ClosedConfirmed
        )
    }
}

/// Per-(player, partner) behavioral risk profile.
///
/// The score is a moving weighted average; the rolling counters are
/// recomputed from the transaction log on every update rather than
/// incremented, so they cannot drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskProfile {
    pub player_id: String,
    pub partner_id: Uuid,
    /// Weighted-average risk score in [0, 100]
    pub risk_score: f64,
    pub deposit_count_7d: i64,
    pub deposit_amount_7d: Decimal,
    pub deposit_count_30d: i64,
    pub deposit_amount_30d: Decimal,
    pub withdrawal_count_7d: i64,
    pub withdrawal_amount_7d: Decimal,
    pub withdrawal_count_30d: i64,
    pub withdrawal_amount_30d: Decimal,
    /// Accumulated factor history (first/last detection, counts)
    pub risk_factors: serde_json::Value,
    pub last_calculated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RiskProfile {
    /// Blank profile created on the first analyzed transaction.
    pub fn empty(player_id: impl Into<String>, partner_id: Uuid) -> Self {
        Self {
            player_id: player_id.into(),
            partner_id,
            risk_score: 0.0,
            deposit_count_7d: 0,
            deposit_amount_7d: Decimal::ZERO,
            deposit_count_30d: 0,
            deposit_amount_30d: Decimal::ZERO,
            withdrawal_count_7d: 0,
            withdrawal_amount_7d: Decimal::ZERO,
            withdrawal_count_30d: 0,
            withdrawal_amount_30d: Decimal::ZERO,
            risk_factors: serde_json::Value::Object(Default::default()),
            last_calculated_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_score(self.risk_score)
    }
}

/// An AML alert raised against a specific transaction or pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub player_id: String,
    pub partner_id: Uuid,
    pub transaction_id: Option<Uuid>,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub status: AlertStatus,
    /// Analysis score snapshotted at detection time
    pub risk_score: f64,
    /// Exact factor breakdown for later review
    pub risk_factors: serde_json::Value,
    pub description: String,
    pub report_required: bool,
    pub reviewed_by: Option<String>,
    pub review_notes: Option<String>,
    pub reported_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A regulatory report record (SAR) generated from an alert or analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspicionReport {
    pub id: Uuid,
    /// Operator-facing identifier, `REP-XXXXXXXX`
    pub report_id: String,
    pub alert_id: Option<Uuid>,
    pub player_id: String,
    pub partner_id: Uuid,
    pub transaction_id: Option<Uuid>,
    pub risk_score: f64,
    pub report_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl SuspicionReport {
    /// Generate the operator-facing report identifier from a fresh UUID.
    pub fn format_report_id(id: Uuid) -> String {
        format!("REP-{}", &id.simple().to_string()[..8].to_uppercase())
    }
}
