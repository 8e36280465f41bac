//! Router assembly

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::SharedContext;

pub fn router(ctx: SharedContext) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        // Wallet surface
        .route("/wallet/:player/balance", get(handlers::wallet::balance))
        .route(
            "/wallet/:player/transactions",
            get(handlers::wallet::transactions),
        )
        .route("/wallet/:player/deposit", post(handlers::wallet::deposit))
        .route("/wallet/:player/withdraw", post(handlers::wallet::withdraw))
        .route("/wallet/:player/bet", post(handlers::wallet::bet))
        .route("/wallet/:player/win", post(handlers::wallet::win))
        .route("/wallet/:player/rollback", post(handlers::wallet::rollback))
        // AML surface
        .route("/aml/alerts", get(handlers::aml::list_alerts))
        .route(
            "/aml/alerts/:id/status",
            put(handlers::aml::update_alert_status),
        )
        .route(
            "/aml/players/:player/profile",
            get(handlers::aml::player_profile),
        )
        // Innermost to outermost: auth wraps handlers, the deadline wraps
        // both so a slow auth store also counts against the budget.
        .layer(from_fn_with_state(ctx.clone(), middleware::auth))
        .layer(from_fn_with_state(ctx.clone(), middleware::deadline))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
