//! Bus wiring: publisher handle, keyed workers, dead-letter spill

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use playgate_core::DomainEvent;
use playgate_store::{DeadLetter, Store};

use crate::error::{BusError, BusResult};
use crate::subscriber::Subscriber;

/// Bus tuning
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Total bounded queue capacity across workers (`event-queue-capacity`)
    pub queue_capacity: usize,
    /// Number of keyed workers; also the cross-player parallelism
    pub workers: usize,
    /// How long a producer blocks on a full queue before spilling
    pub publish_timeout: Duration,
    /// Delivery attempts per subscriber before dead-lettering
    pub max_delivery_attempts: u32,
    /// First retry delay; doubles per attempt
    pub retry_base_delay: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            workers: 4,
            publish_timeout: Duration::from_millis(250),
            max_delivery_attempts: 3,
            retry_base_delay: Duration::from_millis(100),
        }
    }
}

/// Cloneable producer handle.
///
/// Publishing never fails the caller: a refused event is logged and parked
/// in the dead-letter table so wallet correctness stays decoupled from
/// consumer health.
#[derive(Clone)]
pub struct Publisher {
    senders: Vec<mpsc::Sender<DomainEvent>>,
    store: Arc<dyn Store>,
    publish_timeout: Duration,
}

impl Publisher {
    /// Route an event to its partition worker.
    pub async fn publish(&self, event: DomainEvent) {
        let idx = partition(event.partition_key(), self.senders.len());

        match self.senders[idx]
            .send_timeout(event, self.publish_timeout)
            .await
        {
            Ok(()) => {}
            Err(mpsc::error::SendTimeoutError::Timeout(event)) => {
                warn!(topic = event.topic(), "event queue full, dead-lettering");
                self.dead_letter(&event, "queue full").await;
            }
            Err(mpsc::error::SendTimeoutError::Closed(event)) => {
                warn!(topic = event.topic(), "event bus closed, dead-lettering");
                self.dead_letter(&event, "bus closed").await;
            }
        }
    }

    async fn dead_letter(&self, event: &DomainEvent, reason: &str) {
        let payload = match serde_json::to_value(event) {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "cannot serialize event for dead letter, dropping");
                return;
            }
        };
        let letter = DeadLetter {
            id: Uuid::new_v4(),
            topic: event.topic().to_string(),
            payload,
            error: reason.to_string(),
            created_at: Utc::now(),
        };
        if let Err(e) = self.store.insert_dead_letter(&letter).await {
            error!(error = %e, topic = letter.topic, "failed to persist dead letter");
        }
    }
}

fn partition(key: &str, buckets: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() as usize) % buckets
}

/// The event bus. Construct, register subscribers, then `start`.
pub struct EventBus {
    publisher: Publisher,
    receivers: Mutex<Vec<mpsc::Receiver<DomainEvent>>>,
    subscribers: Mutex<Vec<Arc<dyn Subscriber>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    config: BusConfig,
    store: Arc<dyn Store>,
}

impl EventBus {
    pub fn new(config: BusConfig, store: Arc<dyn Store>) -> Self {
        let workers = config.workers.max(1);
        let per_worker = (config.queue_capacity / workers).max(1);

        let mut senders = Vec::with_capacity(workers);
        let mut receivers = Vec::with_capacity(workers);
        for _ in 0..workers {
            let (tx, rx) = mpsc::channel(per_worker);
            senders.push(tx);
            receivers.push(rx);
        }

        Self {
            publisher: Publisher {
                senders,
                store: Arc::clone(&store),
                publish_timeout: config.publish_timeout,
            },
            receivers: Mutex::new(receivers),
            subscribers: Mutex::new(Vec::new()),
            handles: Mutex::new(Vec::new()),
            config,
            store,
        }
    }

    /// Producer handle; cheap to clone, valid before `start`.
    pub fn publisher(&self) -> Publisher {
        self.publisher.clone()
    }

    /// Register a subscriber. Must happen before `start`.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) {
        self.subscribers.lock().unwrap().push(subscriber);
    }

    /// Spawn the worker tasks. Events published before this call are
    /// already queued and drain immediately.
    pub fn start(&self) {
        let receivers: Vec<_> = self.receivers.lock().unwrap().drain(..).collect();
        if receivers.is_empty() {
            return; // already started
        }

        let subscribers: Arc<Vec<Arc<dyn Subscriber>>> =
            Arc::new(self.subscribers.lock().unwrap().clone());
        info!(
            workers = receivers.len(),
            subscribers = subscribers.len(),
            "starting event bus"
        );

        let mut handles = self.handles.lock().unwrap();
        for (worker_id, mut rx) in receivers.into_iter().enumerate() {
            let subscribers = Arc::clone(&subscribers);
            let store = Arc::clone(&self.store);
            let config = self.config.clone();
            handles.push(tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    dispatch(worker_id, &event, &subscribers, &store, &config).await;
                }
            }));
        }
    }

    /// Re-publish parked events. Returns how many were requeued.
    pub async fn replay_dead_letters(&self, limit: i64) -> BusResult<usize> {
        let letters = self.store.take_dead_letters(limit).await?;
        let count = letters.len();
        for letter in letters {
            match serde_json::from_value::<DomainEvent>(letter.payload.clone()) {
                Ok(event) => self.publisher.publish(event).await,
                Err(e) => {
                    error!(id = %letter.id, error = %e, "unreadable dead letter, re-parking");
                    self.store.insert_dead_letter(&letter).await?;
                }
            }
        }
        Ok(count)
    }

    /// Stop the workers. Queued events are dropped; callers that care
    /// replay from the dead-letter table.
    pub fn shutdown(&self) {
        for handle in self.handles.lock().unwrap().drain(..) {
            handle.abort();
        }
    }
}

/// Deliver one event to every interested subscriber, isolating failures.
async fn dispatch(
    worker_id: usize,
    event: &DomainEvent,
    subscribers: &[Arc<dyn Subscriber>],
    store: &Arc<dyn Store>,
    config: &BusConfig,
) {
    for subscriber in subscribers {
        if !subscriber.topics().contains(&event.topic()) {
            continue;
        }

        let mut last_error = None;
        for attempt in 1..=config.max_delivery_attempts {
            match subscriber.handle(event).await {
                Ok(()) => {
                    last_error = None;
                    break;
                }
                Err(e) => {
                    warn!(
                        worker = worker_id,
                        subscriber = subscriber.name(),
                        topic = event.topic(),
                        attempt,
                        error = %e,
                        "event delivery failed"
                    );
                    last_error = Some(e);
                    if attempt < config.max_delivery_attempts {
                        let delay = config.retry_base_delay * 2u32.pow(attempt - 1);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        if let Some(e) = last_error {
            error!(
                subscriber = subscriber.name(),
                topic = event.topic(),
                error = %e,
                "delivery exhausted retries, dead-lettering"
            );
            let letter = DeadLetter {
                id: Uuid::new_v4(),
                topic: event.topic().to_string(),
                payload: serde_json::to_value(event).unwrap_or_default(),
                error: format!("{}: {e}", subscriber.name()),
                created_at: Utc::now(),
            };
            if let Err(persist_err) = store.insert_dead_letter(&letter).await {
                error!(error = %persist_err, "failed to persist dead letter");
            }
        }
    }
}
