//! In-process TTL cache
//!
//! Expired entries are dropped lazily on read and swept opportunistically
//! on write once the map grows past a threshold.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::CacheResult;
use crate::Cache;

const SWEEP_THRESHOLD: usize = 4096;

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Process-local cache backend
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    async fn sweep_if_large(&self, now: Instant) {
        let mut entries = self.entries.write().await;
        if entries.len() >= SWEEP_THRESHOLD {
            entries.retain(|_, e| !e.is_expired(now));
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => {
                    return Ok(Some(entry.value.clone()));
                }
                None => return Ok(None),
                Some(_) => {}
            }
        }
        // Expired: drop it under the write lock
        self.entries.write().await.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let now = Instant::now();
        self.sweep_if_large(now).await;
        self.entries.write().await.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str, ttl: Duration) -> CacheResult<u64> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let next = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.value.parse::<u64>().unwrap_or(0) + 1
            }
            _ => 1,
        };

        // First touch (or expired window) restarts the TTL; later
        // increments keep the original window end.
        let expires_at = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => entry.expires_at,
            _ => now + ttl,
        };

        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }
}
