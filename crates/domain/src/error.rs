//! Domain error types.

use common::OrderId;
use thiserror::Error;

/// Errors raised while building or interpreting orders and their events.
///
/// All variants describe bad input: none of them is worth retrying.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Order amount is negative or not a number.
    #[error("Invalid amount: {0} (must be a finite, non-negative number)")]
    InvalidAmount(f64),

    /// The event or request carries no order id.
    #[error("Order id is required")]
    MissingOrderId,

    /// The order id is not a valid identifier.
    #[error("Invalid order id '{value}': {source}")]
    InvalidOrderId {
        value: String,
        #[source]
        source: uuid::Error,
    },

    /// A status event arrived without a sub-status.
    #[error("Event for order {0} carries no sub-status")]
    MissingSubStatus(OrderId),

    /// The sub-status is not part of the lifecycle vocabulary.
    #[error("Unrecognized sub-status: {0}")]
    UnrecognizedSubStatus(String),

    /// The status is not part of the lifecycle vocabulary.
    #[error("Unrecognized status: {0}")]
    UnrecognizedStatus(String),

    /// A projection can only be seeded from an "order created" event.
    #[error("Event for order {0} does not announce a new order")]
    NotACreatedEvent(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
