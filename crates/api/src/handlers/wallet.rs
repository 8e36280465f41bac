//! Wallet endpoints
//!
//! Monetary values cross the wire as decimal strings; precision survives
//! serialization in both directions.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use playgate_auth::PartnerContext;
use playgate_core::{Currency, ErrorCode, TransactionStatus, TransactionType};
use playgate_store::TransactionFilter;
use playgate_wallet::{OperationOutcome, OperationRequest, RollbackRequest};

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::SharedContext;

const DEFAULT_PAGE_SIZE: i64 = 100;

// --- request bodies ---

#[derive(Deserialize)]
pub struct MoneyBody {
    pub reference_id: String,
    pub amount: String,
    pub currency: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Deserialize)]
pub struct BetBody {
    pub reference_id: String,
    pub amount: String,
    pub currency: String,
    pub game_id: String,
    #[serde(default)]
    pub round_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Deserialize)]
pub struct WinBody {
    pub reference_id: String,
    pub amount: String,
    pub currency: String,
    pub game_id: String,
    #[serde(default)]
    pub related_bet_reference_id: Option<String>,
    #[serde(default)]
    pub round_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Deserialize)]
pub struct RollbackBody {
    pub reference_id: String,
    pub original_reference_id: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Deserialize)]
pub struct BalanceQuery {
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Deserialize)]
pub struct TransactionsQuery {
    #[serde(default, rename = "type")]
    pub tx_type: Option<TransactionType>,
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

// --- response payloads ---

#[derive(Serialize)]
pub struct TransactionData {
    pub transaction_id: Uuid,
    pub reference_id: String,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
    pub amount: String,
    pub currency: String,
    pub balance: String,
    pub timestamp: DateTime<Utc>,
}

impl From<OperationOutcome> for TransactionData {
    fn from(outcome: OperationOutcome) -> Self {
        Self {
            transaction_id: outcome.transaction_id,
            reference_id: outcome.reference_id,
            tx_type: outcome.tx_type,
            status: outcome.status,
            amount: outcome.amount.to_string(),
            currency: outcome.currency.code().to_string(),
            balance: outcome.balance.to_string(),
            timestamp: outcome.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct BalanceData {
    pub player_id: String,
    pub partner_id: Uuid,
    pub balance: String,
    pub currency: String,
}

#[derive(Serialize)]
pub struct TransactionListItem {
    pub transaction_id: Uuid,
    pub reference_id: String,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
    pub amount: String,
    pub currency: String,
    pub original_balance: String,
    pub updated_balance: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// --- parsing helpers ---

fn parse_amount(raw: &str) -> Result<Decimal, ApiError> {
    Decimal::from_str(raw.trim())
        .map_err(|_| ApiError::new(ErrorCode::InvalidAmount, format!("not a decimal: {raw}")))
}

fn parse_currency(raw: &str) -> Result<Currency, ApiError> {
    Currency::from_str(raw)
        .map_err(|e| ApiError::new(ErrorCode::CurrencyMismatch, e.to_string()))
}

// --- handlers ---

pub async fn balance(
    State(ctx): State<SharedContext>,
    Path(player): Path<String>,
    Extension(partner): Extension<PartnerContext>,
    Query(query): Query<BalanceQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let currency = query.currency.as_deref().map(parse_currency).transpose()?;
    let view = ctx
        .engine
        .balance(partner.partner_id, &player, currency.as_ref())
        .await?;
    Ok(ApiResponse::ok(BalanceData {
        player_id: view.player_id,
        partner_id: view.partner_id,
        balance: view.balance.to_string(),
        currency: view.currency.code().to_string(),
    }))
}

pub async fn transactions(
    State(ctx): State<SharedContext>,
    Path(player): Path<String>,
    Extension(partner): Extension<PartnerContext>,
    Query(query): Query<TransactionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = TransactionFilter {
        tx_type: query.tx_type,
        since: query.since,
        until: query.until,
        offset: query.offset.unwrap_or(0).max(0),
        limit: query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 1000),
    };
    let transactions = ctx
        .engine
        .transactions(partner.partner_id, &player, &filter)
        .await?;

    let items: Vec<TransactionListItem> = transactions
        .into_iter()
        .map(|t| TransactionListItem {
            transaction_id: t.id,
            reference_id: t.reference_id,
            tx_type: t.tx_type,
            status: t.status,
            amount: t.amount.to_string(),
            currency: t.currency.code().to_string(),
            original_balance: t.original_balance.to_string(),
            updated_balance: t.updated_balance.to_string(),
            game_id: t.game_id,
            round_id: t.round_id,
            created_at: t.created_at,
        })
        .collect();
    Ok(ApiResponse::ok(items))
}

pub async fn deposit(
    State(ctx): State<SharedContext>,
    Path(player): Path<String>,
    Extension(partner): Extension<PartnerContext>,
    Json(body): Json<MoneyBody>,
) -> Result<impl IntoResponse, ApiError> {
    let request = OperationRequest {
        player_id: player,
        reference_id: body.reference_id,
        amount: parse_amount(&body.amount)?,
        currency: parse_currency(&body.currency)?,
        game_id: None,
        round_id: None,
        related_reference_id: None,
        metadata: body.metadata,
    };
    let outcome = ctx.engine.deposit(partner.partner_id, &request).await?;
    Ok(ApiResponse::ok_with_message(
        TransactionData::from(outcome),
        "deposit completed",
    ))
}

pub async fn withdraw(
    State(ctx): State<SharedContext>,
    Path(player): Path<String>,
    Extension(partner): Extension<PartnerContext>,
    Json(body): Json<MoneyBody>,
) -> Result<impl IntoResponse, ApiError> {
    let request = OperationRequest {
        player_id: player,
        reference_id: body.reference_id,
        amount: parse_amount(&body.amount)?,
        currency: parse_currency(&body.currency)?,
        game_id: None,
        round_id: None,
        related_reference_id: None,
        metadata: body.metadata,
    };
    let outcome = ctx.engine.withdraw(partner.partner_id, &request).await?;
    Ok(ApiResponse::ok_with_message(
        TransactionData::from(outcome),
        "withdrawal completed",
    ))
}

pub async fn bet(
    State(ctx): State<SharedContext>,
    Path(player): Path<String>,
    Extension(partner): Extension<PartnerContext>,
    Json(body): Json<BetBody>,
) -> Result<impl IntoResponse, ApiError> {
    let request = OperationRequest {
        player_id: player,
        reference_id: body.reference_id,
        amount: parse_amount(&body.amount)?,
        currency: parse_currency(&body.currency)?,
        game_id: Some(body.game_id),
        round_id: body.round_id,
        related_reference_id: None,
        metadata: body.metadata,
    };
    let outcome = ctx.engine.bet(partner.partner_id, &request).await?;
    Ok(ApiResponse::ok_with_message(
        TransactionData::from(outcome),
        "bet placed",
    ))
}

pub async fn win(
    State(ctx): State<SharedContext>,
    Path(player): Path<String>,
    Extension(partner): Extension<PartnerContext>,
    Json(body): Json<WinBody>,
) -> Result<impl IntoResponse, ApiError> {
    let request = OperationRequest {
        player_id: player,
        reference_id: body.reference_id,
        amount: parse_amount(&body.amount)?,
        currency: parse_currency(&body.currency)?,
        game_id: Some(body.game_id),
        round_id: body.round_id,
        related_reference_id: body.related_bet_reference_id,
        metadata: body.metadata,
    };
    let outcome = ctx.engine.win(partner.partner_id, &request).await?;
    Ok(ApiResponse::ok_with_message(
        TransactionData::from(outcome),
        "win credited",
    ))
}

pub async fn rollback(
    State(ctx): State<SharedContext>,
    Path(player): Path<String>,
    Extension(partner): Extension<PartnerContext>,
    Json(body): Json<RollbackBody>,
) -> Result<impl IntoResponse, ApiError> {
    let request = RollbackRequest {
        player_id: player,
        reference_id: body.reference_id,
        original_reference_id: body.original_reference_id,
        reason: body.reason,
        metadata: body.metadata,
    };
    let outcome = ctx.engine.rollback(partner.partner_id, &request).await?;
    Ok(ApiResponse::ok_with_message(
        TransactionData::from(outcome),
        "transaction rolled back",
    ))
}
