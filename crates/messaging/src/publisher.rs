use std::time::Duration;

use domain::{Order, OrderEvent, StatusFact};

use crate::{BusError, EventBus, topics};

/// Default time the bus has to acknowledge a publish.
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Publishes order lifecycle envelopes to their fixed topics.
///
/// Every publish is bounded by a deadline. A publish that is not
/// acknowledged in time is reported as failed, never assumed delivered.
#[derive(Clone)]
pub struct OrderPublisher<B: EventBus> {
    bus: B,
    timeout: Duration,
}

impl<B: EventBus> OrderPublisher<B> {
    pub fn new(bus: B, timeout: Duration) -> Self {
        Self { bus, timeout }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Announces a newly created order on the order events topic.
    pub async fn announce_created(&self, order: &Order) -> Result<(), BusError> {
        self.publish(topics::ORDER_EVENTS, &OrderEvent::from_order(order))
            .await
    }

    /// Asks the payment participant to refund an order.
    ///
    /// The envelope carries the order's REFUNDING snapshot.
    pub async fn request_refund(&self, order: &Order) -> Result<(), BusError> {
        self.publish(topics::ORDER_EVENTS, &OrderEvent::from_order(order))
            .await
    }

    /// Raises a sub-status fact for the rest of the choreography.
    pub async fn raise_status(&self, fact: &StatusFact) -> Result<(), BusError> {
        self.publish(topics::ORDER_STATUS_EVENTS, &OrderEvent::from_fact(fact))
            .await
    }

    /// Publishes an envelope with the default deadline.
    pub async fn publish(&self, topic: &str, event: &OrderEvent) -> Result<(), BusError> {
        self.publish_within(topic, event, self.timeout).await
    }

    /// Publishes an envelope, failing if the bus does not acknowledge it
    /// within `deadline`.
    #[tracing::instrument(skip(self, event), fields(order_id = %event.id))]
    pub async fn publish_within(
        &self,
        topic: &str,
        event: &OrderEvent,
        deadline: Duration,
    ) -> Result<(), BusError> {
        let payload = event.to_vec()?;

        match tokio::time::timeout(deadline, self.bus.publish(topic, &event.id, payload)).await {
            Ok(Ok(())) => {
                metrics::counter!("order_events_published_total", "topic" => topic.to_string())
                    .increment(1);
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "publish failed");
                Err(e)
            }
            Err(_) => {
                tracing::warn!(?deadline, "publish timed out");
                Err(BusError::Timeout {
                    topic: topic.to_string(),
                    after: deadline,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryEventBus;
    use domain::{NewOrder, OrderStatus, SubStatus};

    fn publisher() -> OrderPublisher<InMemoryEventBus> {
        OrderPublisher::new(InMemoryEventBus::recording(), DEFAULT_PUBLISH_TIMEOUT)
    }

    #[tokio::test]
    async fn created_order_goes_to_order_events() {
        let publisher = publisher();
        let order = Order::create(NewOrder::new(12.5, "ramen")).unwrap();

        publisher.announce_created(&order).await.unwrap();

        let published = publisher.bus().published(topics::ORDER_EVENTS).await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].key, order.id.to_string());

        let event = OrderEvent::from_slice(&published[0].payload).unwrap();
        assert!(event.is_created());
        assert_eq!(event.amount, Some(12.5));
        assert_eq!(event.detail.as_deref(), Some("ramen"));
    }

    #[tokio::test]
    async fn facts_go_to_order_status_events() {
        let publisher = publisher();
        let order = Order::create(NewOrder::new(3.0, "tea")).unwrap();
        let fact = StatusFact::failed(order.id, SubStatus::KitchenPreparationFailed, "oven offline");

        publisher.raise_status(&fact).await.unwrap();

        assert_eq!(publisher.bus().published_count(topics::ORDER_EVENTS).await, 0);
        let published = publisher.bus().published(topics::ORDER_STATUS_EVENTS).await;
        let event = OrderEvent::from_slice(&published[0].payload).unwrap();
        assert_eq!(event.sub_status.as_deref(), Some("KITCHEN_PREPARATION_FAILED"));
        assert_eq!(event.failure_reason.as_deref(), Some("oven offline"));
    }

    #[tokio::test]
    async fn bus_failure_is_reported() {
        let publisher = publisher();
        publisher.bus().set_fail_on_publish(true).await;
        let order = Order::create(NewOrder::new(1.0, "x")).unwrap();

        let result = publisher.announce_created(&order).await;
        assert!(matches!(result, Err(BusError::PublishFailed { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_acknowledgement_fails_closed() {
        let publisher = OrderPublisher::new(InMemoryEventBus::recording(), Duration::from_millis(50));
        publisher
            .bus()
            .set_publish_delay(Some(Duration::from_secs(1)))
            .await;
        let mut order = Order::create(NewOrder::new(1.0, "x")).unwrap();
        order.status = OrderStatus::Refunding;

        let result = publisher.request_refund(&order).await;

        assert!(matches!(
            result,
            Err(BusError::Timeout { after, .. }) if after == Duration::from_millis(50)
        ));
        assert_eq!(publisher.bus().published_count(topics::ORDER_EVENTS).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_deadline_overrides_default() {
        let publisher = publisher();
        publisher
            .bus()
            .set_publish_delay(Some(Duration::from_millis(200)))
            .await;
        let order = Order::create(NewOrder::new(1.0, "x")).unwrap();
        let event = OrderEvent::from_order(&order);

        let result = publisher
            .publish_within(topics::ORDER_EVENTS, &event, Duration::from_millis(10))
            .await;
        assert!(matches!(result, Err(BusError::Timeout { .. })));

        publisher
            .publish_within(topics::ORDER_EVENTS, &event, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(publisher.bus().published_count(topics::ORDER_EVENTS).await, 1);
    }
}
