//! Lifecycle event envelope exchanged between services.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

use super::{Order, OrderStatus, SubStatus};

/// Wire envelope for order lifecycle events.
///
/// The same shape carries "order created" and "refund requested"
/// announcements (full aggregate fields) as well as bare sub-status facts
/// raised by the kitchen and payment participants (`id` + `subStatus`).
/// `subStatus` stays a raw string so that unrecognized values can be told
/// apart from malformed payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl OrderEvent {
    /// Builds an envelope carrying the full aggregate.
    pub fn from_order(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            status: Some(order.status),
            sub_status: order.sub_status.map(|s| s.as_str().to_string()),
            failure_reason: order.failure_reason.clone(),
            amount: Some(order.amount),
            detail: Some(order.detail.clone()),
            created_at: Some(order.created_at),
            updated_at: Some(order.updated_at),
        }
    }

    /// Builds a bare sub-status envelope.
    pub fn from_fact(fact: &StatusFact) -> Self {
        Self {
            id: fact.order_id.to_string(),
            status: None,
            sub_status: Some(fact.sub_status.as_str().to_string()),
            failure_reason: fact.failure_reason.clone(),
            amount: None,
            detail: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Decodes an envelope from a bus payload.
    pub fn from_slice(payload: &[u8]) -> Result<Self, DomainError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Encodes the envelope for the bus.
    pub fn to_vec(&self) -> Result<Vec<u8>, DomainError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Returns true if this envelope announces a newly created order.
    pub fn is_created(&self) -> bool {
        self.status == Some(OrderStatus::Created) && self.sub_status.is_none()
    }

    /// Parses the order identifier.
    pub fn order_id(&self) -> Result<OrderId, DomainError> {
        if self.id.trim().is_empty() {
            return Err(DomainError::MissingOrderId);
        }
        self.id
            .parse()
            .map_err(|source| DomainError::InvalidOrderId {
                value: self.id.clone(),
                source,
            })
    }
}

/// A validated sub-status fact about one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFact {
    pub order_id: OrderId,
    pub sub_status: SubStatus,
    pub failure_reason: Option<String>,
}

impl StatusFact {
    pub fn new(order_id: OrderId, sub_status: SubStatus) -> Self {
        Self {
            order_id,
            sub_status,
            failure_reason: None,
        }
    }

    pub fn failed(order_id: OrderId, sub_status: SubStatus, reason: impl Into<String>) -> Self {
        Self {
            order_id,
            sub_status,
            failure_reason: Some(reason.into()),
        }
    }
}

impl TryFrom<&OrderEvent> for StatusFact {
    type Error = DomainError;

    /// Fails with [`DomainError::UnrecognizedSubStatus`] for sub-statuses
    /// outside the vocabulary and with other variants for malformed envelopes.
    fn try_from(event: &OrderEvent) -> Result<Self, Self::Error> {
        let order_id = event.order_id()?;
        let raw = event
            .sub_status
            .as_deref()
            .ok_or(DomainError::MissingSubStatus(order_id))?;
        let sub_status = raw.parse::<SubStatus>()?;

        Ok(Self {
            order_id,
            sub_status,
            failure_reason: event
                .failure_reason
                .clone()
                .filter(|reason| !reason.trim().is_empty()),
        })
    }
}
