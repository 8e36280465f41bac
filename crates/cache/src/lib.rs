//! Short-lived cache layer
//!
//! Backs API-key lookups and rate-limit counters. Correctness never depends
//! on cache state: every caller treats a miss and an outage identically and
//! falls back to the store, and the rate limiter fails open.

pub mod error;
pub mod memory;
pub mod rate_limit;

use std::time::Duration;

use async_trait::async_trait;

pub use error::{CacheError, CacheResult};
pub use memory::MemoryCache;
pub use rate_limit::{RateDecision, RateLimiter};

/// Key/value cache with per-entry TTL.
///
/// Implementations must be cheap to clone behind an `Arc` and safe under
/// concurrent access.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Increment a counter, creating it with `ttl` on first touch.
    /// Returns the post-increment value.
    async fn incr(&self, key: &str, ttl: Duration) -> CacheResult<u64>;
}
