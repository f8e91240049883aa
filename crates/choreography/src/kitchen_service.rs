//! The kitchen participant.
//!
//! Keeps its own copy of every announced order and reports preparation
//! outcomes as sub-status facts. It never touches the order service's
//! projection.

use chrono::Utc;
use common::OrderId;
use domain::{Order, OrderEvent, StatusFact, SubStatus};
use messaging::{EventBus, OrderPublisher};
use order_store::{OrderStore, OrderStoreExt, StoreError};

use crate::apply::{ApplyOutcome, apply_with_retry};
use crate::{ChoreographyError, Result, RetryPolicy};

/// Result of preparing an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KitchenOutcome {
    /// The order was prepared and handed over.
    Prepared,
    /// Preparation failed.
    Failed { reason: Option<String> },
}

impl KitchenOutcome {
    /// The fact this outcome raises for an order.
    pub fn fact(&self, order_id: OrderId) -> StatusFact {
        match self {
            KitchenOutcome::Prepared => StatusFact::new(order_id, SubStatus::Delivered),
            KitchenOutcome::Failed { reason } => StatusFact {
                order_id,
                sub_status: SubStatus::KitchenPreparationFailed,
                failure_reason: reason.clone().filter(|r| !r.trim().is_empty()),
            },
        }
    }

    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            KitchenOutcome::Prepared => "prepared",
            KitchenOutcome::Failed { .. } => "failed",
        }
    }
}

/// What an "order-events" envelope did to the kitchen projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// A CREATED copy was inserted.
    Seeded(OrderId),
    /// The order was already known.
    AlreadyKnown(OrderId),
    /// The envelope does not announce a new order.
    Ignored,
    /// The payload could not be interpreted.
    Malformed { reason: String },
}

/// Kitchen service: owns the kitchen projection.
pub struct KitchenService<S: OrderStore, B: EventBus> {
    store: S,
    publisher: OrderPublisher<B>,
    retry: RetryPolicy,
}

impl<S: OrderStore, B: EventBus> KitchenService<S, B> {
    pub fn new(store: S, publisher: OrderPublisher<B>, retry: RetryPolicy) -> Self {
        Self {
            store,
            publisher,
            retry,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Records a preparation outcome and raises the matching fact.
    ///
    /// Reporting the same outcome twice raises the fact again so that a
    /// caller can recover from a failed publish. Consumers deduplicate.
    #[tracing::instrument(skip(self), fields(outcome = outcome.as_str()))]
    pub async fn record_outcome(&self, order_id: &str, outcome: KitchenOutcome) -> Result<Order> {
        let order_id = parse_order_id(order_id)?;
        let fact = outcome.fact(order_id);

        let order = match apply_with_retry(&self.store, &fact, &self.retry).await? {
            ApplyOutcome::Applied(order) => {
                tracing::info!(%order_id, status = %order.status, "kitchen outcome recorded");
                order
            }
            ApplyOutcome::Unchanged(order) => {
                tracing::info!(%order_id, "kitchen outcome already recorded, raising again");
                order
            }
            ApplyOutcome::Rejected { rejection, .. } => {
                tracing::warn!(%order_id, %rejection, "kitchen outcome rejected");
                return Err(ChoreographyError::RejectedTransition {
                    order_id,
                    rejection,
                });
            }
        };

        metrics::counter!("kitchen_outcomes_total", "outcome" => outcome.as_str()).increment(1);

        self.publisher.raise_status(&fact).await?;

        Ok(order)
    }

    /// Seeds the projection from an "order-events" envelope.
    #[tracing::instrument(skip(self, payload), fields(bytes = payload.len()))]
    pub async fn seed_from_event(&self, payload: &[u8]) -> Result<SeedOutcome> {
        let event = match OrderEvent::from_slice(payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "malformed event");
                return Ok(SeedOutcome::Malformed {
                    reason: e.to_string(),
                });
            }
        };

        if !event.is_created() {
            return Ok(SeedOutcome::Ignored);
        }

        let order = match Order::from_created_event(&event, Utc::now()) {
            Ok(order) => order,
            Err(e) => {
                tracing::warn!(error = %e, "malformed created event");
                return Ok(SeedOutcome::Malformed {
                    reason: e.to_string(),
                });
            }
        };

        match self.store.create(&order).await {
            Ok(()) => {
                tracing::debug!(order_id = %order.id, "kitchen projection seeded");
                Ok(SeedOutcome::Seeded(order.id))
            }
            Err(StoreError::AlreadyExists(order_id)) => Ok(SeedOutcome::AlreadyKnown(order_id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the kitchen's projection of an order.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        Ok(self.store.get(order_id).await?)
    }
}

fn parse_order_id(raw: &str) -> Result<OrderId> {
    if raw.trim().is_empty() {
        return Err(ChoreographyError::Validation("orderId is required".into()));
    }
    raw.parse()
        .map_err(|e| ChoreographyError::Validation(format!("invalid orderId '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{NewOrder, OrderStatus};
    use messaging::{InMemoryEventBus, topics};
    use order_store::InMemoryOrderStore;
    use std::time::Duration;

    fn kitchen() -> KitchenService<InMemoryOrderStore, InMemoryEventBus> {
        KitchenService::new(
            InMemoryOrderStore::new(),
            OrderPublisher::new(InMemoryEventBus::recording(), Duration::from_secs(5)),
            RetryPolicy::default(),
        )
    }

    async fn seeded(kitchen: &KitchenService<InMemoryOrderStore, InMemoryEventBus>) -> Order {
        let order = Order::create(NewOrder::new(18.0, "pho")).unwrap();
        let payload = OrderEvent::from_order(&order).to_vec().unwrap();
        kitchen.seed_from_event(&payload).await.unwrap();
        order
    }

    #[test]
    fn blank_failure_reason_is_dropped() {
        let id = OrderId::new();
        let fact = KitchenOutcome::Failed {
            reason: Some("  ".into()),
        }
        .fact(id);
        assert_eq!(fact.failure_reason, None);
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let kitchen = kitchen();
        let order = Order::create(NewOrder::new(18.0, "pho")).unwrap();
        let payload = OrderEvent::from_order(&order).to_vec().unwrap();

        assert_eq!(
            kitchen.seed_from_event(&payload).await.unwrap(),
            SeedOutcome::Seeded(order.id)
        );
        assert_eq!(
            kitchen.seed_from_event(&payload).await.unwrap(),
            SeedOutcome::AlreadyKnown(order.id)
        );

        let copy = kitchen.get_order(order.id).await.unwrap();
        assert_eq!(copy.status, OrderStatus::Created);
        assert_eq!(copy.detail, "pho");
    }

    #[tokio::test]
    async fn refund_request_does_not_seed() {
        let kitchen = kitchen();
        let mut order = Order::create(NewOrder::new(18.0, "pho")).unwrap();
        order.status = OrderStatus::Refunding;
        order.sub_status = Some(SubStatus::KitchenPreparationFailed);
        let payload = OrderEvent::from_order(&order).to_vec().unwrap();

        assert_eq!(
            kitchen.seed_from_event(&payload).await.unwrap(),
            SeedOutcome::Ignored
        );
        assert_eq!(kitchen.store().order_count().await, 0);
    }

    #[tokio::test]
    async fn prepared_raises_delivered() {
        let kitchen = kitchen();
        let order = seeded(&kitchen).await;

        let updated = kitchen
            .record_outcome(&order.id.to_string(), KitchenOutcome::Prepared)
            .await
            .unwrap();

        assert_eq!(updated.status, OrderStatus::Done);
        let raised = kitchen
            .publisher
            .bus()
            .published(topics::ORDER_STATUS_EVENTS)
            .await;
        assert_eq!(raised.len(), 1);
        let event = OrderEvent::from_slice(&raised[0].payload).unwrap();
        assert_eq!(event.sub_status.as_deref(), Some("DELIVERED"));
    }

    #[tokio::test]
    async fn repeated_outcome_raises_again() {
        let kitchen = kitchen();
        let order = seeded(&kitchen).await;
        let id = order.id.to_string();

        kitchen.record_outcome(&id, KitchenOutcome::Prepared).await.unwrap();
        let again = kitchen.record_outcome(&id, KitchenOutcome::Prepared).await.unwrap();

        assert_eq!(again.version, common::Version::new(2));
        assert_eq!(
            kitchen
                .publisher
                .bus()
                .published_count(topics::ORDER_STATUS_EVENTS)
                .await,
            2
        );
    }

    #[tokio::test]
    async fn failure_after_success_is_rejected() {
        let kitchen = kitchen();
        let order = seeded(&kitchen).await;
        let id = order.id.to_string();
        kitchen.record_outcome(&id, KitchenOutcome::Prepared).await.unwrap();

        let result = kitchen
            .record_outcome(
                &id,
                KitchenOutcome::Failed {
                    reason: Some("oven offline".into()),
                },
            )
            .await;

        assert!(matches!(
            result,
            Err(ChoreographyError::RejectedTransition { order_id, .. }) if order_id == order.id
        ));
        assert_eq!(
            kitchen
                .publisher
                .bus()
                .published_count(topics::ORDER_STATUS_EVENTS)
                .await,
            1
        );
    }

    #[tokio::test]
    async fn missing_and_invalid_ids_are_validation() {
        let kitchen = kitchen();

        assert!(matches!(
            kitchen.record_outcome("", KitchenOutcome::Prepared).await,
            Err(ChoreographyError::Validation(_))
        ));
        assert!(matches!(
            kitchen.record_outcome("not-a-uuid", KitchenOutcome::Prepared).await,
            Err(ChoreographyError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let kitchen = kitchen();
        let id = OrderId::new();

        let result = kitchen
            .record_outcome(&id.to_string(), KitchenOutcome::Prepared)
            .await;

        assert!(matches!(result, Err(ChoreographyError::NotFound(missing)) if missing == id));
    }

    #[tokio::test]
    async fn publish_failure_keeps_projection() {
        let kitchen = kitchen();
        let order = seeded(&kitchen).await;
        kitchen.publisher.bus().set_fail_on_publish(true).await;

        let result = kitchen
            .record_outcome(&order.id.to_string(), KitchenOutcome::Prepared)
            .await;

        assert!(matches!(result, Err(ChoreographyError::Publish(_))));
        assert_eq!(
            kitchen.get_order(order.id).await.unwrap().status,
            OrderStatus::Done
        );
    }
}
