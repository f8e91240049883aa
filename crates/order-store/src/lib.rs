pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use postgres::{OrderTable, PostgresOrderStore};
pub use store::{OrderStore, OrderStoreExt};
