//! HTTP error mapping
//!
//! The only place where taxonomy codes become status lines. Engine errors
//! convert losslessly; anything unexpected becomes `internal` with a trace
//! id the partner can quote back to support.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use playgate_aml::AmlError;
use playgate_auth::AuthError;
use playgate_core::ErrorCode;
use playgate_store::StoreError;
use playgate_wallet::WalletError;

/// A partner-visible error
#[derive(Debug)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn internal(source: impl std::fmt::Display) -> Self {
        let trace_id = Uuid::new_v4();
        error!(%trace_id, error = %source, "internal error");
        Self {
            code: ErrorCode::Internal,
            message: "Unexpected internal error".to_string(),
            details: Some(json!({ "trace_id": trace_id })),
        }
    }

    pub fn status(&self) -> StatusCode {
        status_for(self.code)
    }
}

/// Taxonomy → HTTP status
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorCode::IpNotAllowed | ErrorCode::PermissionDenied => StatusCode::FORBIDDEN,
        ErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::InvalidAmount
        | ErrorCode::CurrencyMismatch
        | ErrorCode::InsufficientFunds => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::IdempotencyConflict | ErrorCode::AlreadyRolledBack => StatusCode::CONFLICT,
        ErrorCode::WalletLocked => StatusCode::LOCKED,
        ErrorCode::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        ErrorCode::DependencyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut error = json!({
            "code": self.code,
            "message": self.message,
        });
        if let Some(details) = self.details {
            error["details"] = details;
        }
        (
            status,
            Json(json!({ "success": false, "error": error })),
        )
            .into_response()
    }
}

impl From<WalletError> for ApiError {
    fn from(e: WalletError) -> Self {
        match &e {
            WalletError::Store(inner) if inner.code() == ErrorCode::Internal => {
                Self::internal(inner)
            }
            _ => Self::new(e.code(), e.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        Self::new(e.code(), e.to_string())
    }
}

impl From<AmlError> for ApiError {
    fn from(e: AmlError) -> Self {
        match &e {
            AmlError::Store(inner) if inner.code() == ErrorCode::Internal => Self::internal(inner),
            _ => Self::new(e.code(), e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        if e.code() == ErrorCode::Internal {
            Self::internal(&e)
        } else {
            Self::new(e.code(), e.to_string())
        }
    }
}
