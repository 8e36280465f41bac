//! AML investigation surface
//!
//! Alert listings and the status workflow are partner-scoped: a partner
//! only ever sees its own players.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use playgate_auth::PartnerContext;
use playgate_core::{Alert, AlertStatus, RiskLevel, Severity};
use playgate_store::AlertFilter;

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::SharedContext;

const DEFAULT_PAGE_SIZE: i64 = 100;

#[derive(Deserialize)]
pub struct AlertsQuery {
    #[serde(default)]
    pub player_id: Option<String>,
    #[serde(default)]
    pub status: Option<AlertStatus>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct AlertStatusBody {
    pub status: AlertStatus,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct ProfileData {
    pub player_id: String,
    pub partner_id: Uuid,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub deposit_count_7d: i64,
    pub deposit_amount_7d: String,
    pub deposit_count_30d: i64,
    pub deposit_amount_30d: String,
    pub withdrawal_count_7d: i64,
    pub withdrawal_amount_7d: String,
    pub withdrawal_count_30d: i64,
    pub withdrawal_amount_30d: String,
    pub risk_factors: serde_json::Value,
    pub last_calculated_at: Option<DateTime<Utc>>,
}

pub async fn list_alerts(
    State(ctx): State<SharedContext>,
    Extension(partner): Extension<PartnerContext>,
    Query(query): Query<AlertsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = AlertFilter {
        partner_id: Some(partner.partner_id),
        player_id: query.player_id,
        status: query.status,
        severity: query.severity,
        offset: query.offset.unwrap_or(0).max(0),
        limit: query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 1000),
    };
    let alerts: Vec<Alert> = ctx.analyzer.alerts(&filter).await?;
    Ok(ApiResponse::ok(alerts))
}

pub async fn update_alert_status(
    State(ctx): State<SharedContext>,
    Path(alert_id): Path<Uuid>,
    Extension(partner): Extension<PartnerContext>,
    Json(body): Json<AlertStatusBody>,
) -> Result<impl IntoResponse, ApiError> {
    // Ownership check before any mutation
    let alert = ctx.analyzer.alert(alert_id).await?;
    if alert.partner_id != partner.partner_id {
        return Err(ApiError::new(
            playgate_core::ErrorCode::NotFound,
            "alert not found",
        ));
    }

    let updated = ctx
        .analyzer
        .update_alert_status(alert_id, body.status, body.reviewed_by, body.notes)
        .await?;
    Ok(ApiResponse::ok_with_message(updated, "alert updated"))
}

pub async fn player_profile(
    State(ctx): State<SharedContext>,
    Path(player): Path<String>,
    Extension(partner): Extension<PartnerContext>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = ctx.analyzer.profile(&player, partner.partner_id).await?;
    Ok(ApiResponse::ok(ProfileData {
        player_id: profile.player_id.clone(),
        partner_id: profile.partner_id,
        risk_score: profile.risk_score,
        risk_level: profile.risk_level(),
        deposit_count_7d: profile.deposit_count_7d,
        deposit_amount_7d: profile.deposit_amount_7d.to_string(),
        deposit_count_30d: profile.deposit_count_30d,
        deposit_amount_30d: profile.deposit_amount_30d.to_string(),
        withdrawal_count_7d: profile.withdrawal_count_7d,
        withdrawal_amount_7d: profile.withdrawal_amount_7d.to_string(),
        withdrawal_count_30d: profile.withdrawal_count_30d,
        withdrawal_amount_30d: profile.withdrawal_amount_30d.to_string(),
        risk_factors: profile.risk_factors,
        last_calculated_at: profile.last_calculated_at,
    }))
}
