use async_trait::async_trait;

use crate::error::EventResult;
use crate::event::EventEnvelope;

/// Broker boundary.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Hand `envelope` to the broker. Returns once the broker has accepted it.
    async fn publish(&self, envelope: EventEnvelope) -> EventResult<()>;
}
