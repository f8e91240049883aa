//! Order status and sub-status vocabularies.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Coarse lifecycle phase of an order.
///
/// ```text
/// Created ──► Processing ──► Refunding ──► Failed
///    │            │
///    │            └──────────────────────► Done
///    └───────────────────────────────────► Failed
/// ```
///
/// `Failed` and `Done` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order accepted by the owning service, nothing has happened yet.
    #[default]
    Created,

    /// Payment confirmed, preparation under way.
    Processing,

    /// Kitchen failed, a refund has been requested.
    Refunding,

    /// Order ended without being delivered (terminal).
    Failed,

    /// Order delivered (terminal).
    Done,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Created,
        OrderStatus::Processing,
        OrderStatus::Refunding,
        OrderStatus::Failed,
        OrderStatus::Done,
    ];

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Failed | OrderStatus::Done)
    }

    /// Statuses reachable from this one, directly or by skipping steps whose
    /// facts have not arrived yet.
    pub fn successors(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Created => &[
                OrderStatus::Processing,
                OrderStatus::Refunding,
                OrderStatus::Failed,
                OrderStatus::Done,
            ],
            OrderStatus::Processing => &[
                OrderStatus::Refunding,
                OrderStatus::Failed,
                OrderStatus::Done,
            ],
            OrderStatus::Refunding => &[OrderStatus::Failed],
            OrderStatus::Failed | OrderStatus::Done => &[],
        }
    }

    /// Returns true if an order in this status may move to `target`.
    pub fn can_advance_to(&self, target: OrderStatus) -> bool {
        self.successors().contains(&target)
    }

    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Refunding => "REFUNDING",
            OrderStatus::Failed => "FAILED",
            OrderStatus::Done => "DONE",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::UnrecognizedStatus(s.to_string()))
    }
}

/// The fine-grained fact that triggers a status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubStatus {
    /// Payment participant charged the customer.
    PaymentPaid,

    /// Payment participant could not charge the customer.
    PaymentFailed,

    /// Kitchen could not prepare the order.
    KitchenPreparationFailed,

    /// Payment participant refunded the customer.
    Refunded,

    /// Kitchen prepared and handed over the order.
    Delivered,
}

impl SubStatus {
    /// All known sub-statuses.
    pub const ALL: [SubStatus; 5] = [
        SubStatus::PaymentPaid,
        SubStatus::PaymentFailed,
        SubStatus::KitchenPreparationFailed,
        SubStatus::Refunded,
        SubStatus::Delivered,
    ];

    /// Returns true if this sub-status records a failure and may carry a reason.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SubStatus::PaymentFailed | SubStatus::KitchenPreparationFailed | SubStatus::Refunded
        )
    }

    /// Returns the wire name of the sub-status.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubStatus::PaymentPaid => "PAYMENT_PAID",
            SubStatus::PaymentFailed => "PAYMENT_FAILED",
            SubStatus::KitchenPreparationFailed => "KITCHEN_PREPARATION_FAILED",
            SubStatus::Refunded => "REFUNDED",
            SubStatus::Delivered => "DELIVERED",
        }
    }
}

impl std::fmt::Display for SubStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubStatus::ALL
            .into_iter()
            .find(|sub_status| sub_status.as_str() == s)
            .ok_or_else(|| DomainError::UnrecognizedSubStatus(s.to_string()))
    }
}
