use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{RwLock, mpsc};

use crate::{BusError, EventBus, Message, Subscription};

/// In-process event bus.
///
/// Fans every published message out to all live subscriptions of its topic.
/// A bus built with [`InMemoryEventBus::recording`] also keeps a log of what
/// was published. Failures and slow acknowledgements can be injected to
/// exercise publish error paths.
#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    state: Arc<RwLock<InMemoryBusState>>,
}

#[derive(Default)]
struct InMemoryBusState {
    subscribers: HashMap<String, Vec<mpsc::UnboundedSender<Message>>>,
    /// `None` unless recording; the runtime bus keeps nothing.
    published: Option<Vec<Message>>,
    fail_on_publish: bool,
    failures_left: u32,
    publish_delay: Option<Duration>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus that logs every acknowledged message for later inspection.
    pub fn recording() -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryBusState {
                published: Some(Vec::new()),
                ..InMemoryBusState::default()
            })),
        }
    }

    /// Make every subsequent publish fail.
    pub async fn set_fail_on_publish(&self, fail: bool) {
        self.state.write().await.fail_on_publish = fail;
    }

    /// Make the next `count` publishes fail, then recover.
    pub async fn fail_next_publishes(&self, count: u32) {
        self.state.write().await.failures_left = count;
    }

    /// Delay every subsequent acknowledgement.
    pub async fn set_publish_delay(&self, delay: Option<Duration>) {
        self.state.write().await.publish_delay = delay;
    }

    /// Messages published to a topic, in publish order. Always empty unless
    /// the bus is recording.
    pub async fn published(&self, topic: &str) -> Vec<Message> {
        self.state
            .read()
            .await
            .published
            .iter()
            .flatten()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    pub async fn published_count(&self, topic: &str) -> usize {
        self.published(topic).await.len()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<(), BusError> {
        let (fail, delay) = {
            let mut state = self.state.write().await;
            let injected = state.failures_left > 0;
            if injected {
                state.failures_left -= 1;
            }
            (state.fail_on_publish || injected, state.publish_delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if fail {
            return Err(BusError::PublishFailed {
                topic: topic.to_string(),
                reason: "bus unavailable".to_string(),
            });
        }

        let message = Message::new(topic, key, payload);
        let mut state = self.state.write().await;

        if let Some(senders) = state.subscribers.get_mut(topic) {
            senders.retain(|sender| sender.send(message.clone()).is_ok());
        }
        if let Some(published) = state.published.as_mut() {
            published.push(message);
        }

        tracing::trace!(topic, key, "message published");
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, BusError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.state
            .write()
            .await
            .subscribers
            .entry(topic.to_string())
            .or_default()
            .push(sender.clone());

        Ok(Subscription::new(topic, sender, receiver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{FutureExt, StreamExt};

    #[tokio::test]
    async fn fans_out_to_every_subscription_of_the_topic() {
        let bus = InMemoryEventBus::new();
        let mut first = bus.subscribe("a").await.unwrap();
        let mut second = bus.subscribe("a").await.unwrap();
        let mut other = bus.subscribe("b").await.unwrap();

        bus.publish("a", "key", b"hello".to_vec()).await.unwrap();

        assert_eq!(first.next().await.unwrap().payload, b"hello");
        assert_eq!(second.next().await.unwrap().payload, b"hello");
        assert!(other.next().now_or_never().is_none());
    }

    #[tokio::test]
    async fn records_published_messages_per_topic() {
        let bus = InMemoryEventBus::recording();
        bus.publish("a", "1", Vec::new()).await.unwrap();
        bus.publish("b", "2", Vec::new()).await.unwrap();
        bus.publish("a", "3", Vec::new()).await.unwrap();

        let keys: Vec<_> = bus.published("a").await.into_iter().map(|m| m.key).collect();
        assert_eq!(keys, vec!["1", "3"]);
        assert_eq!(bus.published_count("b").await, 1);
    }

    #[tokio::test]
    async fn runtime_bus_keeps_no_log() {
        let bus = InMemoryEventBus::new();
        let mut subscription = bus.subscribe("a").await.unwrap();

        for key in 0..100 {
            bus.publish("a", &key.to_string(), vec![0; 64]).await.unwrap();
        }

        assert!(bus.state.read().await.published.is_none());
        assert_eq!(bus.published_count("a").await, 0);
        assert_eq!(subscription.next().await.unwrap().key, "0");
    }

    #[tokio::test]
    async fn injected_failure_publishes_nothing() {
        let bus = InMemoryEventBus::recording();
        let mut subscription = bus.subscribe("a").await.unwrap();
        bus.set_fail_on_publish(true).await;

        let result = bus.publish("a", "k", Vec::new()).await;
        assert!(matches!(result, Err(BusError::PublishFailed { .. })));
        assert_eq!(bus.published_count("a").await, 0);
        assert!(subscription.next().now_or_never().is_none());

        bus.set_fail_on_publish(false).await;
        bus.publish("a", "k", Vec::new()).await.unwrap();
        assert!(subscription.next().await.is_some());
    }

    #[tokio::test]
    async fn counted_failures_recover() {
        let bus = InMemoryEventBus::recording();
        bus.fail_next_publishes(2).await;

        assert!(bus.publish("a", "1", Vec::new()).await.is_err());
        assert!(bus.publish("a", "2", Vec::new()).await.is_err());
        bus.publish("a", "3", Vec::new()).await.unwrap();

        let keys: Vec<_> = bus.published("a").await.into_iter().map(|m| m.key).collect();
        assert_eq!(keys, vec!["3"]);
    }

    #[tokio::test]
    async fn dropped_subscriptions_are_pruned() {
        let bus = InMemoryEventBus::new();
        drop(bus.subscribe("a").await.unwrap());

        bus.publish("a", "k", Vec::new()).await.unwrap();
        assert_eq!(bus.state.read().await.subscribers["a"].len(), 0);
    }
}
