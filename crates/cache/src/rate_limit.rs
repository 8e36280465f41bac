//! Fixed-window rate limiting on top of the cache
//!
//! One counter per (partner, endpoint class). If the cache is down the
//! limiter allows the request: rate limiting degrades, requests do not fail.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::Cache;

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited,
}

/// Fixed-window request counter
pub struct RateLimiter {
    cache: Arc<dyn Cache>,
    limit: u64,
    window: Duration,
}

impl RateLimiter {
    /// `limit` requests per `window` per bucket.
    pub fn new(cache: Arc<dyn Cache>, limit: u64, window: Duration) -> Self {
        Self {
            cache,
            limit,
            window,
        }
    }

    /// Count a hit against `bucket` and decide.
    pub async fn check(&self, bucket: &str) -> RateDecision {
        let key = format!("ratelimit:{bucket}");
        match self.cache.incr(&key, self.window).await {
            Ok(count) if count > self.limit => RateDecision::Limited,
            Ok(_) => RateDecision::Allowed,
            Err(e) => {
                // Cache outage disables rate limiting rather than failing
                // the request.
                warn!(bucket, error = %e, "rate limiter cache unavailable, allowing");
                RateDecision::Allowed
            }
        }
    }
}
