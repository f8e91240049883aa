use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures_core::Stream;
use tokio::sync::mpsc;

use crate::BusError;

/// A message as delivered to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    /// Partition key. Order events are keyed by order id.
    pub key: String,
    pub payload: Vec<u8>,
    /// 1 on first delivery, incremented on every redelivery.
    pub delivery_attempt: u32,
}

impl Message {
    pub fn new(topic: impl Into<String>, key: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            key: key.into(),
            payload,
            delivery_attempt: 1,
        }
    }

    /// The same message, one delivery attempt later.
    pub fn redelivered(mut self) -> Self {
        self.delivery_attempt += 1;
        self
    }
}

/// Trait for event bus implementations.
///
/// Delivery is at-least-once: a subscriber may observe the same message
/// more than once, and must treat reprocessing as a no-op.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publishes a payload to a topic.
    ///
    /// Returns once the bus has acknowledged the message. No deadline is
    /// applied here; see `OrderPublisher` for bounded publishing.
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<(), BusError>;

    /// Subscribes to a topic.
    ///
    /// Each subscription receives every message published to the topic
    /// after it was created.
    async fn subscribe(&self, topic: &str) -> Result<Subscription, BusError>;
}

/// A live subscription to one topic.
///
/// Yields messages as a [`Stream`]. Messages that failed to process can be
/// handed back through a [`Redelivery`] handle.
pub struct Subscription {
    topic: String,
    receiver: mpsc::UnboundedReceiver<Message>,
    redelivery: Redelivery,
}

impl Subscription {
    /// Builds a subscription around a channel fed by the bus.
    pub fn new(
        topic: impl Into<String>,
        sender: mpsc::UnboundedSender<Message>,
        receiver: mpsc::UnboundedReceiver<Message>,
    ) -> Self {
        let topic = topic.into();
        Self {
            redelivery: Redelivery {
                topic: topic.clone(),
                sender,
            },
            topic,
            receiver,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns a handle that puts messages back on this subscription.
    pub fn redelivery(&self) -> Redelivery {
        self.redelivery.clone()
    }
}

impl Stream for Subscription {
    type Item = Message;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Cloneable handle that redelivers messages to one subscription.
#[derive(Clone)]
pub struct Redelivery {
    topic: String,
    sender: mpsc::UnboundedSender<Message>,
}

impl Redelivery {
    /// Queues the message again with its delivery attempt incremented.
    pub fn redeliver(&self, message: Message) -> Result<(), BusError> {
        self.sender
            .send(message.redelivered())
            .map_err(|_| BusError::Closed(self.topic.clone()))
    }
}
