//! Choreography error types.

use common::OrderId;
use domain::{DomainError, Rejection};
use messaging::BusError;
use order_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the order and kitchen services.
#[derive(Debug, Error)]
pub enum ChoreographyError {
    /// The request or event is malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The order does not exist in this service's projection.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// Concurrent writers kept winning the race for this order.
    #[error("Concurrent modification of order {order_id} ({attempts} attempts)")]
    Conflict { order_id: OrderId, attempts: u32 },

    /// The store is unavailable.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The store returned data it should never hold.
    #[error("Internal error: {0}")]
    Internal(String),

    /// An event could not be published. State changes made before the
    /// publish are kept.
    #[error("Publish failed: {0}")]
    Publish(#[from] BusError),

    /// The lifecycle does not allow the requested move.
    #[error("Transition rejected for order {order_id}: {rejection}")]
    RejectedTransition {
        order_id: OrderId,
        rejection: Rejection,
    },
}

impl ChoreographyError {
    /// Returns true if processing the same input again may succeed.
    ///
    /// A bus that refused or did not acknowledge a publish is transient.
    /// Anything the publish still owes is kept on the order, so a second
    /// attempt sends it.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChoreographyError::Conflict { .. }
                | ChoreographyError::Transport(_)
                | ChoreographyError::Publish(
                    BusError::PublishFailed { .. } | BusError::Timeout { .. }
                )
        )
    }
}

impl From<StoreError> for ChoreographyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(order_id) => ChoreographyError::NotFound(order_id),
            StoreError::Conflict { order_id, .. } => ChoreographyError::Conflict {
                order_id,
                attempts: 1,
            },
            StoreError::AlreadyExists(order_id) => {
                ChoreographyError::Validation(format!("order {order_id} already exists"))
            }
            StoreError::Corrupt { .. } => ChoreographyError::Internal(err.to_string()),
            StoreError::Database(_) | StoreError::Migration(_) => {
                ChoreographyError::Transport(err.to_string())
            }
        }
    }
}

impl From<DomainError> for ChoreographyError {
    fn from(err: DomainError) -> Self {
        ChoreographyError::Validation(err.to_string())
    }
}

/// Convenience type alias for choreography results.
pub type Result<T> = std::result::Result<T, ChoreographyError>;

#[cfg(test)]
mod tests {
    use super::*;
    use common::Version;
    use domain::OrderStatus;
    use std::time::Duration;

    #[test]
    fn store_errors_map_to_kinds() {
        let id = OrderId::new();

        assert!(matches!(
            ChoreographyError::from(StoreError::NotFound(id)),
            ChoreographyError::NotFound(missing) if missing == id
        ));
        assert!(matches!(
            ChoreographyError::from(StoreError::Conflict {
                order_id: id,
                expected: Version::first(),
                actual: Version::new(2),
            }),
            ChoreographyError::Conflict { attempts: 1, .. }
        ));
        assert!(matches!(
            ChoreographyError::from(StoreError::Corrupt {
                order_id: id,
                reason: "bad status".into(),
            }),
            ChoreographyError::Internal(_)
        ));
    }

    #[test]
    fn retryable_kinds() {
        let id = OrderId::new();

        assert!(ChoreographyError::Conflict { order_id: id, attempts: 3 }.is_retryable());
        assert!(ChoreographyError::Transport("down".into()).is_retryable());
        assert!(
            ChoreographyError::Publish(BusError::Timeout {
                topic: "order-events".into(),
                after: Duration::from_secs(5),
            })
            .is_retryable()
        );
        assert!(
            ChoreographyError::Publish(BusError::PublishFailed {
                topic: "order-events".into(),
                reason: "bus unavailable".into(),
            })
            .is_retryable()
        );

        assert!(!ChoreographyError::Validation("bad".into()).is_retryable());
        assert!(!ChoreographyError::NotFound(id).is_retryable());
        assert!(!ChoreographyError::Publish(BusError::Closed("order-events".into())).is_retryable());
        assert!(
            !ChoreographyError::RejectedTransition {
                order_id: id,
                rejection: Rejection::Terminal {
                    from: OrderStatus::Done,
                    to: OrderStatus::Refunding,
                },
            }
            .is_retryable()
        );
    }
}
