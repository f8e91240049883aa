use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, Version};
use domain::Order;
use tokio::sync::RwLock;

use crate::{OrderStore, Result, StoreError};

/// In-memory order store.
///
/// Provides the same interface and concurrency semantics as the PostgreSQL
/// implementation. The lock is held only for the compare-and-swap itself.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: &Order) -> Result<()> {
        let mut orders = self.orders.write().await;

        if orders.contains_key(&order.id) {
            return Err(StoreError::AlreadyExists(order.id));
        }

        let mut stored = order.clone();
        if stored.version == Version::initial() {
            stored.version = Version::first();
        }
        orders.insert(order.id, stored);

        Ok(())
    }

    async fn find(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn update(&self, order: &Order) -> Result<Version> {
        let mut orders = self.orders.write().await;

        let stored = orders
            .get_mut(&order.id)
            .ok_or(StoreError::NotFound(order.id))?;

        if stored.version != order.version {
            return Err(StoreError::Conflict {
                order_id: order.id,
                expected: order.version,
                actual: stored.version,
            });
        }

        let new_version = order.version.next();
        *stored = Order {
            version: new_version,
            ..order.clone()
        };

        Ok(new_version)
    }
}
