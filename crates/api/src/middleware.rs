//! Request middleware: authentication, rate limiting, deadlines

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use playgate_auth::permissions;
use playgate_cache::RateDecision;
use playgate_core::ErrorCode;

use crate::error::ApiError;
use crate::state::SharedContext;

/// Permission required by a route, derived from its shape.
pub fn required_permission(method: &Method, path: &str) -> Option<&'static str> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match (method, segments.as_slice()) {
        (&Method::GET, ["wallet", _, "balance"]) => Some(permissions::WALLET_READ),
        (&Method::GET, ["wallet", _, "transactions"]) => Some(permissions::WALLET_READ),
        (&Method::POST, ["wallet", _, "deposit"]) => Some(permissions::WALLET_DEPOSIT),
        (&Method::POST, ["wallet", _, "withdraw"]) => Some(permissions::WALLET_WITHDRAW),
        (&Method::POST, ["wallet", _, "bet"]) => Some(permissions::WALLET_BET),
        (&Method::POST, ["wallet", _, "win"]) => Some(permissions::WALLET_WIN),
        (&Method::POST, ["wallet", _, "rollback"]) => Some(permissions::WALLET_ROLLBACK),
        (&Method::GET, ["aml", "alerts"]) => Some(permissions::AML_READ),
        (&Method::PUT, ["aml", "alerts", _, "status"]) => Some(permissions::AML_MANAGE),
        (&Method::GET, ["aml", "players", _, "profile"]) => Some(permissions::AML_READ),
        _ => None,
    }
}

/// Caller address: first X-Forwarded-For hop when present, else the socket
/// peer.
fn client_ip(req: &Request) -> IpAddr {
    if let Some(forwarded) = req
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(ip) = forwarded
            .split(',')
            .next()
            .and_then(|s| s.trim().parse().ok())
        {
            return ip;
        }
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
        .unwrap_or(IpAddr::from([127, 0, 0, 1]))
}

/// Authentication + rate limiting. Attaches the partner context for
/// downstream handlers.
pub async fn auth(State(ctx): State<SharedContext>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    if ctx.auth.is_excluded_path(&path) {
        return next.run(req).await;
    }

    // Routes the router does not know simply fall through to its 404.
    let Some(permission) = required_permission(req.method(), &path) else {
        return next.run(req).await;
    };

    let api_key = req
        .headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let ip = client_ip(&req);

    let partner = match ctx.auth.authenticate(api_key.as_deref(), ip, permission).await {
        Ok(partner) => partner,
        Err(e) => return ApiError::from(e).into_response(),
    };

    // One counter per (partner, endpoint class): "wallet" and "aml" don't
    // share a budget.
    let class = path.split('/').find(|s| !s.is_empty()).unwrap_or("root");
    let bucket = format!("{}:{class}", partner.partner_id);
    if ctx.rate_limiter.check(&bucket).await == RateDecision::Limited {
        return ApiError::new(ErrorCode::RateLimited, "Rate limit exceeded").into_response();
    }

    req.extensions_mut().insert(partner);
    next.run(req).await
}

/// Per-request deadline. Dropping the handler future aborts any open store
/// transaction, so a timed-out mutation rolls back without burning the
/// idempotency key.
pub async fn deadline(State(ctx): State<SharedContext>, req: Request, next: Next) -> Response {
    match tokio::time::timeout(ctx.config.operation_deadline, next.run(req)).await {
        Ok(response) => response,
        Err(_) => {
            ApiError::new(ErrorCode::DeadlineExceeded, "Request deadline exceeded")
                .into_response()
        }
    }
}
