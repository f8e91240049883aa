pub mod health;
pub mod kitchen;
pub mod metrics;
pub mod orders;

use common::OrderId;

use crate::error::ApiError;

fn parse_order_id(raw: &str) -> Result<OrderId, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id '{raw}': {e}")))
}
