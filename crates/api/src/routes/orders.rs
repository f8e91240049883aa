//! Order service endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{NewOrder, Order, OrderStatus};
use messaging::EventBus;
use order_store::OrderStore;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub amount: f64,
    #[serde(default)]
    pub detail: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderCreatedResponse {
    pub id: String,
    pub amount: f64,
    pub detail: String,
    pub status: OrderStatus,
}

impl From<&Order> for OrderCreatedResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            amount: order.amount,
            detail: order.detail.clone(),
            status: order.status,
        }
    }
}

// -- Handlers --

/// POST /orders — create a new order and announce it.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: OrderStore + 'static, B: EventBus + 'static>(
    State(state): State<Arc<AppState<S, B>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError> {
    let order = state
        .orders
        .create_order(NewOrder::new(req.amount, req.detail))
        .await?;

    Ok((StatusCode::CREATED, Json(OrderCreatedResponse::from(&order))))
}

/// GET /orders/{id} — the order service's projection of an order.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + 'static, B: EventBus + 'static>(
    State(state): State<Arc<AppState<S, B>>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id = super::parse_order_id(&id)?;
    let order = state.orders.get_order(order_id).await?;
    Ok(Json(order))
}
