//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{OrderId, Version};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

use super::{OrderEvent, OrderStatus, StatusFact, SubStatus, Transition, transition};

/// Input for creating a new order.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub amount: f64,
    pub detail: String,
}

impl NewOrder {
    pub fn new(amount: f64, detail: impl Into<String>) -> Self {
        Self {
            amount,
            detail: detail.into(),
        }
    }
}

/// A service-local projection of an order.
///
/// The owning service's copy is authoritative for `amount` and `detail`;
/// other services only own the sub-statuses they raise themselves.
/// `status` always equals the table target of `sub_status` (or `Created`
/// while no sub-status has been accepted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,

    /// Coarse lifecycle phase.
    pub status: OrderStatus,

    /// The last accepted fact.
    pub sub_status: Option<SubStatus>,

    /// Why the order failed, only set on failure-class sub-statuses.
    pub failure_reason: Option<String>,

    pub amount: f64,

    pub detail: String,

    pub created_at: DateTime<Utc>,

    /// Advances on every accepted transition.
    pub updated_at: DateTime<Utc>,

    /// Optimistic concurrency token, maintained by the store.
    pub version: Version,

    /// Set on entering `Refunding` until the owning service has published
    /// the refund request.
    #[serde(default, skip_serializing)]
    pub refund_pending: bool,
}

impl Order {
    /// Creates a new order in `Created` status with a fresh identifier.
    pub fn create(new_order: NewOrder) -> Result<Self, DomainError> {
        if !new_order.amount.is_finite() || new_order.amount < 0.0 {
            return Err(DomainError::InvalidAmount(new_order.amount));
        }

        let now = Utc::now();
        Ok(Self {
            id: OrderId::new(),
            status: OrderStatus::Created,
            sub_status: None,
            failure_reason: None,
            amount: new_order.amount,
            detail: new_order.detail,
            created_at: now,
            updated_at: now,
            version: Version::first(),
            refund_pending: false,
        })
    }

    /// Builds a downstream projection from an owning service's "created" event.
    ///
    /// `now` stands in for timestamps the event does not carry.
    pub fn from_created_event(event: &OrderEvent, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if !event.is_created() {
            return Err(DomainError::NotACreatedEvent(event.id.clone()));
        }

        let id = event.order_id()?;
        let created_at = event.created_at.unwrap_or(now);

        Ok(Self {
            id,
            status: OrderStatus::Created,
            sub_status: None,
            failure_reason: None,
            amount: event.amount.unwrap_or_default(),
            detail: event.detail.clone().unwrap_or_default(),
            created_at,
            updated_at: event.updated_at.unwrap_or(created_at),
            version: Version::first(),
            refund_pending: false,
        })
    }

    /// Applies a sub-status fact.
    ///
    /// Only [`Transition::Advance`] mutates the order; duplicates and
    /// rejected facts leave every field untouched.
    pub fn apply(&mut self, fact: &StatusFact, now: DateTime<Utc>) -> Transition {
        let outcome = transition(self.status, fact.sub_status);

        if let Transition::Advance(status) = outcome {
            self.failure_reason = match fact.sub_status {
                // A refund closes a failure that already carries its reason.
                SubStatus::Refunded => fact
                    .failure_reason
                    .clone()
                    .or_else(|| self.failure_reason.take()),
                sub_status if sub_status.is_failure() => fact.failure_reason.clone(),
                _ => None,
            };
            self.status = status;
            self.sub_status = Some(fact.sub_status);
            self.refund_pending = status == OrderStatus::Refunding;
            self.updated_at = now.max(self.updated_at);
        }

        outcome
    }
}
