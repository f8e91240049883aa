use common::{OrderId, Version};
use thiserror::Error;

/// Errors that can occur when interacting with an order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An order with the same id is already stored.
    #[error("Order already exists: {0}")]
    AlreadyExists(OrderId),

    /// The order is not in the store.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// The stored version moved on since the caller read the order.
    #[error("Concurrency conflict for order {order_id}: expected version {expected}, found {actual}")]
    Conflict {
        order_id: OrderId,
        expected: Version,
        actual: Version,
    },

    /// A stored row does not decode into a valid order.
    #[error("Corrupt order {order_id}: {reason}")]
    Corrupt { order_id: OrderId, reason: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
