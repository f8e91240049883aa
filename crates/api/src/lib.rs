//! HTTP API and runtime wiring for the order choreography.
//!
//! Exposes the order service and the kitchen participant over REST, with
//! structured logging (tracing) and Prometheus metrics, and starts the bus
//! consumers that keep both projections moving.

pub mod config;
pub mod error;
pub mod routes;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use choreography::{KitchenService, OrderService, run_consumer};
use messaging::{BusError, EventBus, OrderPublisher, topics};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::OrderStore;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// Shared application state accessible from all handlers.
///
/// Each service owns its own store; they share nothing but the bus.
pub struct AppState<S: OrderStore, B: EventBus> {
    pub orders: Arc<OrderService<S, B>>,
    pub kitchen: Arc<KitchenService<S, B>>,
    pub storage: &'static str,
}

/// Builds both services over their own stores and a shared bus.
pub fn create_state<S, B>(
    order_store: S,
    kitchen_store: S,
    bus: B,
    storage: &'static str,
    config: &Config,
) -> Arc<AppState<S, B>>
where
    S: OrderStore + 'static,
    B: EventBus + Clone + 'static,
{
    let publisher = OrderPublisher::new(bus, config.publish_timeout);

    Arc::new(AppState {
        orders: Arc::new(OrderService::new(
            order_store,
            publisher.clone(),
            config.retry_policy(),
        )),
        kitchen: Arc::new(KitchenService::new(
            kitchen_store,
            publisher,
            config.retry_policy(),
        )),
        storage,
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, B>(state: Arc<AppState<S, B>>, metrics_handle: PrometheusHandle) -> Router
where
    S: OrderStore + 'static,
    B: EventBus + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S, B>))
        .route("/orders", post(routes::orders::create::<S, B>))
        .route("/orders/{id}", get(routes::orders::get::<S, B>))
        .route("/kitchen/success", post(routes::kitchen::success::<S, B>))
        .route("/kitchen/failed", post(routes::kitchen::failed::<S, B>))
        .route("/kitchen/orders/{id}", get(routes::kitchen::get::<S, B>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Subscribes both services to their topics and runs their workers until
/// `shutdown` resolves.
///
/// The order service consumes sub-status facts; the kitchen seeds its
/// projection from order announcements.
pub async fn spawn_consumers<S, B, F, Fut>(
    state: &AppState<S, B>,
    bus: &B,
    config: &Config,
    shutdown: F,
) -> Result<Vec<JoinHandle<()>>, BusError>
where
    S: OrderStore + 'static,
    B: EventBus + 'static,
    F: Fn() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let status_events = bus.subscribe(topics::ORDER_STATUS_EVENTS).await?;
    let order_events = bus.subscribe(topics::ORDER_EVENTS).await?;

    Ok(vec![
        tokio::spawn(run_consumer(
            status_events,
            state.orders.clone(),
            config.worker_config(),
            shutdown(),
        )),
        tokio::spawn(run_consumer(
            order_events,
            state.kitchen.clone(),
            config.worker_config(),
            shutdown(),
        )),
    ])
}
