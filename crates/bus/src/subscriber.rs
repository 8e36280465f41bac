//! Event subscriber trait

use async_trait::async_trait;

use playgate_core::DomainEvent;

use crate::error::BusResult;

/// A consumer of domain events.
///
/// Handlers must tolerate redelivery: the bus retries failed deliveries
/// with backoff before dead-lettering, so an event can arrive more than
/// once.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Subscriber name, for logging and dead-letter records
    fn name(&self) -> &str;

    /// Topics this subscriber wants
    fn topics(&self) -> &[&'static str];

    /// Handle one event. An `Err` triggers the retry/dead-letter path for
    /// this subscriber only; other subscribers still receive the event.
    async fn handle(&self, event: &DomainEvent) -> BusResult<()>;
}
