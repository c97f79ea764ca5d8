use std::fmt;
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{EventError, EventResult};
use crate::event::EventEnvelope;
use crate::traits::EventPublisher;

/// A broadcast channel receiver for published events.
pub type EventStream = broadcast::Receiver<EventEnvelope>;

struct Subscriber {
    topic: String,
    sender: broadcast::Sender<EventEnvelope>,
}

/// In-process publisher.
///
/// Every published envelope is appended to a log and fanned out to the
/// subscribers of its topic. Subscribers whose receivers are gone are pruned.
pub struct InMemoryEventPublisher {
    subscribers: RwLock<Vec<Subscriber>>,
    published: RwLock<Vec<EventEnvelope>>,
    channel_capacity: usize,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(channel_capacity: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            published: RwLock::new(Vec::new()),
            channel_capacity,
        }
    }

    /// Receive every future event published to `topic`.
    pub fn subscribe(&self, topic: impl Into<String>) -> EventResult<EventStream> {
        let (sender, receiver) = broadcast::channel(self.channel_capacity);
        self.subscribers
            .write()
            .map_err(|_| EventError::Poisoned)?
            .push(Subscriber {
                topic: topic.into(),
                sender,
            });
        Ok(receiver)
    }

    /// Every envelope published so far, in order.
    pub fn published(&self) -> EventResult<Vec<EventEnvelope>> {
        Ok(self
            .published
            .read()
            .map_err(|_| EventError::Poisoned)?
            .clone())
    }

    fn route(&self, envelope: &EventEnvelope) -> EventResult<()> {
        let mut subscribers = self.subscribers.write().map_err(|_| EventError::Poisoned)?;
        subscribers.retain(|sub| {
            if sub.topic == envelope.topic {
                sub.sender.send(envelope.clone()).is_ok()
            } else {
                sub.sender.receiver_count() > 0
            }
        });
        Ok(())
    }
}

impl Default for InMemoryEventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryEventPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let published = self.published.read().map(|p| p.len()).unwrap_or_default();
        f.debug_struct("InMemoryEventPublisher")
            .field("published", &published)
            .field("channel_capacity", &self.channel_capacity)
            .finish()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, envelope: EventEnvelope) -> EventResult<()> {
        debug!(topic = %envelope.topic, key = %envelope.key, "event published");
        self.route(&envelope)?;
        self.published
            .write()
            .map_err(|_| EventError::Poisoned)?
            .push(envelope);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ObjectVersionCreatingEvent;

    #[tokio::test]
    async fn subscribers_receive_their_topic_only() {
        let publisher = InMemoryEventPublisher::new();
        let mut objects = publisher.subscribe("objects").unwrap();
        let mut other = publisher.subscribe("other").unwrap();

        let envelope = ObjectVersionCreatingEvent::new(7, None)
            .to_envelope("objects")
            .unwrap();
        publisher.publish(envelope.clone()).await.unwrap();

        assert_eq!(objects.recv().await.unwrap(), envelope);
        assert!(other.try_recv().is_err());
        assert_eq!(publisher.published().unwrap(), vec![envelope]);
    }

    #[tokio::test]
    async fn dropped_subscriber_is_pruned() {
        let publisher = InMemoryEventPublisher::new();
        drop(publisher.subscribe("objects").unwrap());

        let envelope = ObjectVersionCreatingEvent::new(1, None)
            .to_envelope("objects")
            .unwrap();
        publisher.publish(envelope).await.unwrap();
        assert_eq!(publisher.subscribers.read().unwrap().len(), 0);
    }
}
