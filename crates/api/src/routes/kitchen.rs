//! Kitchen participant endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use choreography::KitchenOutcome;
use domain::Order;
use messaging::EventBus;
use order_store::OrderStore;
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitchenOutcomeRequest {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

/// POST /kitchen/success — the order was prepared.
#[tracing::instrument(skip(state, req))]
pub async fn success<S: OrderStore + 'static, B: EventBus + 'static>(
    State(state): State<Arc<AppState<S, B>>>,
    Json(req): Json<KitchenOutcomeRequest>,
) -> Result<StatusCode, ApiError> {
    record(&state, req.order_id, KitchenOutcome::Prepared).await
}

/// POST /kitchen/failed — preparation failed.
#[tracing::instrument(skip(state, req))]
pub async fn failed<S: OrderStore + 'static, B: EventBus + 'static>(
    State(state): State<Arc<AppState<S, B>>>,
    Json(req): Json<KitchenOutcomeRequest>,
) -> Result<StatusCode, ApiError> {
    let outcome = KitchenOutcome::Failed {
        reason: req.failure_reason,
    };
    record(&state, req.order_id, outcome).await
}

async fn record<S: OrderStore + 'static, B: EventBus + 'static>(
    state: &AppState<S, B>,
    order_id: Option<String>,
    outcome: KitchenOutcome,
) -> Result<StatusCode, ApiError> {
    state
        .kitchen
        .record_outcome(order_id.as_deref().unwrap_or_default(), outcome)
        .await?;
    Ok(StatusCode::OK)
}

/// GET /kitchen/orders/{id} — the kitchen's projection of an order.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + 'static, B: EventBus + 'static>(
    State(state): State<Arc<AppState<S, B>>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id = super::parse_order_id(&id)?;
    let order = state.kitchen.get_order(order_id).await?;
    Ok(Json(order))
}
