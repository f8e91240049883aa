//! Liveness endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use messaging::EventBus;
use order_store::OrderStore;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Backend holding the projections: `"postgres"` or `"memory"`.
    pub storage: &'static str,
}

/// GET /health
pub async fn check<S: OrderStore + 'static, B: EventBus + 'static>(
    State(state): State<Arc<AppState<S, B>>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        storage: state.storage,
    })
}
