//! Application context - wires everything together
//!
//! Constructed once at startup and shared through axum state; no component
//! is reached through a hidden global.

use std::sync::Arc;
use std::time::Duration;

use playgate_aml::{AmlAnalyzer, AmlConfig, AmlSubscriber};
use playgate_auth::{AuthConfig, Authenticator};
use playgate_bus::{BusConfig, EventBus};
use playgate_cache::{MemoryCache, RateLimiter};
use playgate_store::Store;
use playgate_wallet::WalletEngine;

use tracing::{info, warn};

use crate::config::Config;
use crate::notifier::AlertNotifier;

/// How often parked events get another chance
const DEAD_LETTER_REPLAY_INTERVAL: Duration = Duration::from_secs(300);
const DEAD_LETTER_REPLAY_BATCH: i64 = 100;

/// Shared application context
pub struct AppContext {
    pub config: Config,
    pub auth: Authenticator,
    pub engine: WalletEngine,
    pub analyzer: Arc<AmlAnalyzer>,
    pub bus: Arc<EventBus>,
    pub rate_limiter: RateLimiter,
}

pub type SharedContext = Arc<AppContext>;

impl AppContext {
    /// Wire the full stack over a store and start the event bus.
    pub fn build(config: Config, store: Arc<dyn Store>) -> SharedContext {
        let cache = Arc::new(MemoryCache::new());

        let bus = Arc::new(EventBus::new(
            BusConfig {
                queue_capacity: config.event_queue_capacity,
                ..Default::default()
            },
            Arc::clone(&store),
        ));

        let mut aml_config = AmlConfig::default();
        aml_config
            .large_value_thresholds
            .extend(config.aml_large_value_thresholds.clone());
        let analyzer = Arc::new(AmlAnalyzer::new(Arc::clone(&store), aml_config));

        bus.subscribe(Arc::new(AmlSubscriber::new(
            Arc::clone(&analyzer),
            bus.publisher(),
        )));
        bus.subscribe(Arc::new(AlertNotifier));
        bus.start();

        // Background redelivery of events that spilled to the dead-letter
        // table. Events that keep failing just land there again.
        let replay_bus = Arc::clone(&bus);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(DEAD_LETTER_REPLAY_INTERVAL);
            ticker.tick().await; // first tick fires immediately, skip it
            loop {
                ticker.tick().await;
                match replay_bus.replay_dead_letters(DEAD_LETTER_REPLAY_BATCH).await {
                    Ok(0) => {}
                    Ok(count) => info!(count, "replayed dead-lettered events"),
                    Err(e) => warn!(error = %e, "dead letter replay failed"),
                }
            }
        });

        let engine = WalletEngine::new(
            Arc::clone(&store),
            bus.publisher(),
            cache.clone() as Arc<dyn playgate_cache::Cache>,
        );

        let auth = Authenticator::new(
            Arc::clone(&store),
            cache.clone() as Arc<dyn playgate_cache::Cache>,
            AuthConfig {
                enforce_ip_allowlist: config.allowed_ip_enforcement,
                exclude_paths: config.auth_exclude_paths.clone(),
                ..Default::default()
            },
        );

        let rate_limiter = RateLimiter::new(
            cache as Arc<dyn playgate_cache::Cache>,
            config.default_rate_limit,
            Duration::from_secs(60),
        );

        Arc::new(Self {
            config,
            auth,
            engine,
            analyzer,
            bus,
            rate_limiter,
        })
    }
}
