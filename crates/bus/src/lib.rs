//! Playgate event bus
//!
//! Typed in-process pub/sub over bounded tokio channels. Events for the
//! same player always land on the same single-threaded worker, so per-player
//! ordering holds; across players workers run in parallel. When a queue
//! stays full past a short bounded wait, the event spills to the persistent
//! dead-letter table instead of failing the producer.

pub mod bus;
pub mod error;
pub mod subscriber;

pub use bus::{BusConfig, EventBus, Publisher};
pub use error::{BusError, BusResult};
pub use subscriber::Subscriber;
