//! The request authenticator
//!
//! Wraps the key lookup (cache → store), key/partner validity checks, IP
//! allowlist and permission evaluation. One instance lives in the app
//! context and serves every request.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use playgate_cache::Cache;
use playgate_core::ApiKey;
use playgate_crypto::{lookup_digest, verify_secret};
use playgate_store::Store;

use crate::allowlist::ip_allowed;
use crate::error::{AuthError, AuthResult};
use crate::permissions::has_permission;

/// Auth pipeline tuning
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// When false, partner allowlists are ignored entirely
    pub enforce_ip_allowlist: bool,
    /// Path prefixes that skip authentication (health, OpenAPI)
    pub exclude_paths: Vec<String>,
    /// TTL for cached key lookups
    pub key_cache_ttl: Duration,
    /// Minimum interval between `last_used_at` writes per key
    pub last_used_interval: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enforce_ip_allowlist: true,
            exclude_paths: vec!["/health".to_string()],
            key_cache_ttl: Duration::from_secs(60),
            last_used_interval: Duration::from_secs(3600),
        }
    }
}

/// Authenticated partner identity attached to the request scope.
///
/// Downstream handlers read this instead of repeating the lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerContext {
    pub partner_id: Uuid,
    pub partner_code: String,
    pub api_key_id: Uuid,
    pub permissions: Vec<String>,
}

/// Request authenticator
pub struct Authenticator {
    store: Arc<dyn Store>,
    cache: Arc<dyn Cache>,
    config: AuthConfig,
}

impl Authenticator {
    pub fn new(store: Arc<dyn Store>, cache: Arc<dyn Cache>, config: AuthConfig) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    /// Whether a request path skips authentication entirely.
    pub fn is_excluded_path(&self, path: &str) -> bool {
        self.config
            .exclude_paths
            .iter()
            .any(|p| path == p || path.starts_with(&format!("{p}/")))
    }

    /// Run the full pipeline for one request.
    ///
    /// Total: returns a context or exactly one taxonomy error.
    pub async fn authenticate(
        &self,
        raw_key: Option<&str>,
        client_ip: IpAddr,
        required_permission: &str,
    ) -> AuthResult<PartnerContext> {
        // 1. Key extraction already happened at the HTTP layer; absence is
        //    simply unauthenticated.
        let raw_key = raw_key.filter(|k| !k.is_empty()).ok_or(AuthError::Unauthenticated)?;

        // 2. Hash and look up, cache first.
        let digest = lookup_digest(raw_key);
        let api_key = self.lookup_key(&digest).await?.ok_or(AuthError::Unauthenticated)?;

        // 3. Constant-time verification against the salted hash. A digest
        //    hit with a failing verification is treated exactly like a miss.
        if !verify_secret(raw_key, &api_key.secret_hash) {
            return Err(AuthError::Unauthenticated);
        }

        let now = Utc::now();
        if !api_key.is_usable(now) {
            return Err(AuthError::Unauthenticated);
        }

        // 4. Owning partner must exist and be active.
        let partner = self
            .store
            .get_partner(api_key.partner_id)
            .await?
            .ok_or(AuthError::Unauthenticated)?;
        if !partner.is_active() {
            return Err(AuthError::Unauthenticated);
        }

        // 5. IP allowlist.
        if self.config.enforce_ip_allowlist && !ip_allowed(&partner.allowed_ips, client_ip) {
            return Err(AuthError::IpNotAllowed(client_ip));
        }

        // 6. Permission match.
        if !has_permission(&api_key.permissions, required_permission) {
            return Err(AuthError::PermissionDenied(required_permission.to_string()));
        }

        // 7. Bump last_used_at at most once per interval, off the request path.
        self.touch_key_throttled(api_key.id).await;

        debug!(partner = %partner.code, key = %api_key.id, "request authenticated");

        Ok(PartnerContext {
            partner_id: partner.id,
            partner_code: partner.code,
            api_key_id: api_key.id,
            permissions: api_key.permissions,
        })
    }

    /// Cache-first key lookup. Cache failures degrade to the store.
    async fn lookup_key(&self, digest: &str) -> AuthResult<Option<ApiKey>> {
        let cache_key = format!("apikey:{digest}");

        match self.cache.get(&cache_key).await {
            Ok(Some(cached)) => {
                if let Ok(key) = serde_json::from_str::<ApiKey>(&cached) {
                    return Ok(Some(key));
                }
                // Unreadable cache entry: fall through to the store.
                let _ = self.cache.delete(&cache_key).await;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "api key cache read failed, using store"),
        }

        let key = self.store.find_api_key_by_digest(digest).await?;

        if let Some(ref key) = key {
            if let Ok(serialized) = serde_json::to_string(key) {
                if let Err(e) = self
                    .cache
                    .set(&cache_key, &serialized, self.config.key_cache_ttl)
                    .await
                {
                    warn!(error = %e, "api key cache write failed");
                }
            }
        }

        Ok(key)
    }

    /// Spawn the `last_used_at` write unless one ran within the interval.
    async fn touch_key_throttled(&self, key_id: Uuid) {
        let marker = format!("apikey:touched:{key_id}");
        match self.cache.get(&marker).await {
            Ok(Some(_)) => return,
            Ok(None) => {}
            // Cache down: skip the bump rather than amplifying store writes.
            Err(_) => return,
        }

        let _ = self
            .cache
            .set(&marker, "1", self.config.last_used_interval)
            .await;

        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.touch_api_key(key_id, Utc::now()).await {
                warn!(key = %key_id, error = %e, "failed to bump last_used_at");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use playgate_cache::MemoryCache;
    use playgate_core::{Partner, PartnerStatus};
    use playgate_crypto::generate_api_key;
    use playgate_store::MemoryStore;

    struct Fixture {
        auth: Authenticator,
        store: Arc<MemoryStore>,
        raw_key: String,
        partner_id: Uuid,
    }

    async fn fixture(allowed_ips: Vec<String>, permissions: Vec<String>) -> Fixture {
        let store = Arc::new(MemoryStore::with_default_cipher());
        let partner_id = Uuid::new_v4();
        store
            .seed_partner(Partner {
                id: partner_id,
                code: "LUCKY".into(),
                name: "Lucky Spin Ltd".into(),
                status: PartnerStatus::Active,
                allowed_ips,
                created_at: Utc::now(),
            })
            .await;

        let issued = generate_api_key("test").unwrap();
        store
            .seed_api_key(ApiKey {
                id: Uuid::new_v4(),
                partner_id,
                lookup_digest: issued.lookup_digest.clone(),
                secret_hash: issued.secret_hash.clone(),
                permissions,
                is_active: true,
                expires_at: None,
                last_used_at: None,
                created_at: Utc::now(),
            })
            .await;

        let auth = Authenticator::new(
            store.clone() as Arc<dyn Store>,
            Arc::new(MemoryCache::new()),
            AuthConfig::default(),
        );

        Fixture {
            auth,
            store,
            raw_key: issued.raw_key,
            partner_id,
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_happy_path() {
        let fx = fixture(vec![], vec!["wallet:*".into()]).await;
        let ctx = fx
            .auth
            .authenticate(Some(&fx.raw_key), ip("203.0.113.1"), "wallet:deposit")
            .await
            .unwrap();
        assert_eq!(ctx.partner_id, fx.partner_id);
        assert_eq!(ctx.partner_code, "LUCKY");
    }

    #[tokio::test]
    async fn test_missing_key_unauthenticated() {
        let fx = fixture(vec![], vec!["wallet:*".into()]).await;
        let err = fx
            .auth
            .authenticate(None, ip("203.0.113.1"), "wallet:deposit")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_unknown_key_unauthenticated() {
        let fx = fixture(vec![], vec!["wallet:*".into()]).await;
        let err = fx
            .auth
            .authenticate(Some("test_nonsense"), ip("203.0.113.1"), "wallet:deposit")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_allowlist_allows_and_denies() {
        let fx = fixture(vec!["10.0.0.0/24".into()], vec!["wallet:*".into()]).await;

        assert!(fx
            .auth
            .authenticate(Some(&fx.raw_key), ip("10.0.0.5"), "wallet:bet")
            .await
            .is_ok());

        let err = fx
            .auth
            .authenticate(Some(&fx.raw_key), ip("10.0.1.5"), "wallet:bet")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::IpNotAllowed(_)));
    }

    #[tokio::test]
    async fn test_permission_denied() {
        let fx = fixture(vec![], vec!["wallet:read".into()]).await;
        let err = fx
            .auth
            .authenticate(Some(&fx.raw_key), ip("203.0.113.1"), "wallet:withdraw")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_inactive_partner_rejected() {
        let fx = fixture(vec![], vec!["wallet:*".into()]).await;
        fx.store
            .seed_partner(Partner {
                id: fx.partner_id,
                code: "LUCKY".into(),
                name: "Lucky Spin Ltd".into(),
                status: PartnerStatus::Suspended,
                allowed_ips: vec![],
                created_at: Utc::now(),
            })
            .await;

        let err = fx
            .auth
            .authenticate(Some(&fx.raw_key), ip("203.0.113.1"), "wallet:deposit")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_expired_key_rejected() {
        let store = Arc::new(MemoryStore::with_default_cipher());
        let partner_id = Uuid::new_v4();
        store
            .seed_partner(Partner {
                id: partner_id,
                code: "P".into(),
                name: "P".into(),
                status: PartnerStatus::Active,
                allowed_ips: vec![],
                created_at: Utc::now(),
            })
            .await;

        let issued = generate_api_key("test").unwrap();
        store
            .seed_api_key(ApiKey {
                id: Uuid::new_v4(),
                partner_id,
                lookup_digest: issued.lookup_digest.clone(),
                secret_hash: issued.secret_hash.clone(),
                permissions: vec!["*".into()],
                is_active: true,
                expires_at: Some(Utc::now() - ChronoDuration::minutes(1)),
                last_used_at: None,
                created_at: Utc::now(),
            })
            .await;

        let auth = Authenticator::new(
            store as Arc<dyn Store>,
            Arc::new(MemoryCache::new()),
            AuthConfig::default(),
        );
        let err = auth
            .authenticate(Some(&issued.raw_key), ip("203.0.113.1"), "wallet:bet")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_excluded_paths() {
        let fx = fixture(vec![], vec![]).await;
        assert!(fx.auth.is_excluded_path("/health"));
        assert!(fx.auth.is_excluded_path("/health/live"));
        assert!(!fx.auth.is_excluded_path("/wallet/p-1/balance"));
        assert!(!fx.auth.is_excluded_path("/healthcheck"));
    }

    #[tokio::test]
    async fn test_enforcement_flag_disables_allowlist() {
        let store = Arc::new(MemoryStore::with_default_cipher());
        let partner_id = Uuid::new_v4();
        store
            .seed_partner(Partner {
                id: partner_id,
                code: "P".into(),
                name: "P".into(),
                status: PartnerStatus::Active,
                allowed_ips: vec!["10.0.0.0/24".into()],
                created_at: Utc::now(),
            })
            .await;
        let issued = generate_api_key("test").unwrap();
        store
            .seed_api_key(ApiKey {
                id: Uuid::new_v4(),
                partner_id,
                lookup_digest: issued.lookup_digest.clone(),
                secret_hash: issued.secret_hash.clone(),
                permissions: vec!["*".into()],
                is_active: true,
                expires_at: None,
                last_used_at: None,
                created_at: Utc::now(),
            })
            .await;

        let auth = Authenticator::new(
            store as Arc<dyn Store>,
            Arc::new(MemoryCache::new()),
            AuthConfig {
                enforce_ip_allowlist: false,
                ..Default::default()
            },
        );
        assert!(auth
            .authenticate(Some(&issued.raw_key), ip("198.51.100.7"), "wallet:bet")
            .await
            .is_ok());
    }
}
