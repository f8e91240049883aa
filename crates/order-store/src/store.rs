use async_trait::async_trait;
use common::{OrderId, Version};
use domain::Order;

use crate::{Result, StoreError};

/// Core trait for order projection stores.
///
/// Each service owns one store holding its own projection of every order
/// it knows about. All implementations must be thread-safe (Send + Sync)
/// since the store is shared by every worker and request handler of a
/// service.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a new order.
    ///
    /// Fails with `AlreadyExists` if the id is taken. The order is stored
    /// with the version it carries.
    async fn create(&self, order: &Order) -> Result<()>;

    /// Looks up an order.
    ///
    /// Returns None if the order doesn't exist.
    async fn find(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Replaces an order with optimistic concurrency.
    ///
    /// `order.version` must be the version the caller read. Fails with
    /// `NotFound` if the order is absent and with `Conflict` if the stored
    /// version differs. Returns the new version.
    async fn update(&self, order: &Order) -> Result<Version>;
}

/// Extension trait providing convenience methods for order stores.
#[async_trait]
pub trait OrderStoreExt: OrderStore {
    /// Loads an order, failing with `NotFound` if it doesn't exist.
    async fn get(&self, order_id: OrderId) -> Result<Order> {
        self.find(order_id)
            .await?
            .ok_or(StoreError::NotFound(order_id))
    }
}

// Blanket implementation for all OrderStore implementations
impl<T: OrderStore + ?Sized> OrderStoreExt for T {}

