//! Health check endpoint (on the auth exclude list)

use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now(),
    }))
}
