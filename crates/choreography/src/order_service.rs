//! The order-owning service.
//!
//! Creates orders, announces them, and keeps its projection in step with
//! the sub-status facts raised by the kitchen and payment participants.
//! The only event it raises in reaction is the refund request. An order
//! keeps `refund_pending` set until that request is acknowledged, so a
//! redelivered KITCHEN_PREPARATION_FAILED sends a request the bus refused.

use common::OrderId;
use domain::{DomainError, NewOrder, Order, OrderEvent, OrderStatus, StatusFact};
use messaging::{EventBus, OrderPublisher};
use order_store::{OrderStore, OrderStoreExt, StoreError};

use crate::apply::{ApplyOutcome, apply_with_retry};
use crate::{ChoreographyError, Result, RetryPolicy};

/// What consuming one inbound event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The projection advanced, or a redelivery found a refund request still
    /// owed. `refund_requested` is true when a refund request was published.
    Applied {
        status: OrderStatus,
        refund_requested: bool,
    },
    /// The order was already in the target status.
    Duplicate,
    /// The event is well formed but must not be applied.
    Rejected { reason: String },
    /// No order with this id exists here.
    UnknownOrder(OrderId),
    /// The payload could not be interpreted.
    Malformed { reason: String },
}

impl ConsumeOutcome {
    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumeOutcome::Applied { .. } => "applied",
            ConsumeOutcome::Duplicate => "duplicate",
            ConsumeOutcome::Rejected { .. } => "rejected",
            ConsumeOutcome::UnknownOrder(_) => "unknown_order",
            ConsumeOutcome::Malformed { .. } => "malformed",
        }
    }
}

/// Order service: owns the authoritative order projection.
pub struct OrderService<S: OrderStore, B: EventBus> {
    store: S,
    publisher: OrderPublisher<B>,
    retry: RetryPolicy,
}

impl<S: OrderStore, B: EventBus> OrderService<S, B> {
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

    /// Creates an order in CREATED status and announces it.
    ///
    /// If the announcement fails the order stays persisted and the error is
    /// reported as [`ChoreographyError::Publish`].
    #[tracing::instrument(skip(self, new_order), fields(amount = new_order.amount))]
    pub async fn create_order(&self, new_order: NewOrder) -> Result<Order> {
        let order = Order::create(new_order)?;
        self.store.create(&order).await?;
        metrics::counter!("orders_created_total").increment(1);

        self.publisher.announce_created(&order).await?;

        tracing::info!(order_id = %order.id, "order created");
        Ok(order)
    }

    /// Returns the current projection of an order.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        Ok(self.store.get(order_id).await?)
    }

    /// Consumes one inbound lifecycle event.
    ///
    /// Malformed, unrecognized, unknown-order, duplicate and rejected events
    /// are acknowledged with an outcome. Errors are returned only for
    /// failures worth surfacing to the delivery layer.
    #[tracing::instrument(skip(self, payload), fields(bytes = payload.len()))]
    pub async fn consume(&self, payload: &[u8]) -> Result<ConsumeOutcome> {
        let result = self.consume_inner(payload).await;

        let outcome = match &result {
            Ok(outcome) => outcome.as_str(),
            Err(_) => "error",
        };
        metrics::counter!("order_events_consumed_total", "outcome" => outcome).increment(1);

        result
    }

    async fn consume_inner(&self, payload: &[u8]) -> Result<ConsumeOutcome> {
        let fact = match OrderEvent::from_slice(payload).and_then(|e| StatusFact::try_from(&e)) {
            Ok(fact) => fact,
            Err(e @ DomainError::UnrecognizedSubStatus(_)) => {
                tracing::warn!(error = %e, "ignoring event");
                return Ok(ConsumeOutcome::Rejected {
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "malformed event");
                return Ok(ConsumeOutcome::Malformed {
                    reason: e.to_string(),
                });
            }
        };

        let outcome = match apply_with_retry(&self.store, &fact, &self.retry).await {
            Ok(outcome) => outcome,
            Err(ChoreographyError::NotFound(order_id)) => {
                tracing::warn!(%order_id, sub_status = %fact.sub_status, "event for unknown order");
                return Ok(ConsumeOutcome::UnknownOrder(order_id));
            }
            Err(e) => return Err(e),
        };

        match outcome {
            ApplyOutcome::Applied(order) => {
                tracing::info!(
                    order_id = %order.id,
                    status = %order.status,
                    sub_status = %fact.sub_status,
                    "order advanced"
                );

                let status = order.status;
                let refund_requested = order.refund_pending;
                if refund_requested {
                    self.request_refund(order).await?;
                }

                Ok(ConsumeOutcome::Applied {
                    status,
                    refund_requested,
                })
            }
            ApplyOutcome::Unchanged(order) if order.refund_pending => {
                tracing::info!(order_id = %order.id, "refund request still owed, publishing");
                let status = order.status;
                self.request_refund(order).await?;

                Ok(ConsumeOutcome::Applied {
                    status,
                    refund_requested: true,
                })
            }
            ApplyOutcome::Unchanged(order) => {
                tracing::debug!(order_id = %order.id, sub_status = %fact.sub_status, "duplicate event");
                Ok(ConsumeOutcome::Duplicate)
            }
            ApplyOutcome::Rejected { order, rejection } => {
                tracing::warn!(order_id = %order.id, %rejection, "transition rejected");
                Ok(ConsumeOutcome::Rejected {
                    reason: rejection.to_string(),
                })
            }
        }
    }

    /// Publishes the refund request, then clears the order's marker.
    ///
    /// A failed publish leaves the marker set and is retryable. Failing to
    /// clear it only risks one more request on redelivery; the payment side
    /// deduplicates.
    async fn request_refund(&self, mut order: Order) -> Result<()> {
        self.publisher.request_refund(&order).await.map_err(|e| {
            tracing::error!(order_id = %order.id, error = %e, "refund request not published");
            ChoreographyError::Publish(e)
        })?;

        for _ in 0..self.retry.max_attempts {
            order.refund_pending = false;
            match self.store.update(&order).await {
                Ok(_) => return Ok(()),
                Err(StoreError::Conflict { .. }) => match self.store.find(order.id).await {
                    Ok(Some(fresh)) if fresh.refund_pending => order = fresh,
                    Ok(_) => return Ok(()),
                    Err(e) => {
                        tracing::warn!(order_id = %order.id, error = %e, "refund marker not cleared");
                        return Ok(());
                    }
                },
                Err(e) => {
                    tracing::warn!(order_id = %order.id, error = %e, "refund marker not cleared");
                    return Ok(());
                }
            }
        }

        tracing::warn!(order_id = %order.id, "refund marker not cleared after conflicts");
        Ok(())
    }
}
