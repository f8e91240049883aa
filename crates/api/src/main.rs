//! API server entry point.

use messaging::{EventBus, InMemoryEventBus};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryOrderStore, OrderStore, OrderTable, PostgresOrderStore};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use api::config::Config;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    // 3. Pick the projection stores
    let bus = InMemoryEventBus::new();
    match config.database_url.clone() {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(&url)
                .await?;
            let orders = PostgresOrderStore::new(pool.clone(), OrderTable::Orders);
            orders.run_migrations().await?;
            let kitchen = PostgresOrderStore::new(pool, OrderTable::KitchenOrders);

            tracing::info!("using PostgreSQL projections");
            serve(config, orders, kitchen, bus, "postgres", metrics_handle).await
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory projections");
            serve(
                config,
                InMemoryOrderStore::new(),
                InMemoryOrderStore::new(),
                bus,
                "memory",
                metrics_handle,
            )
            .await
        }
    }
}

async fn serve<S, B>(
    config: Config,
    order_store: S,
    kitchen_store: S,
    bus: B,
    storage: &'static str,
    metrics_handle: PrometheusHandle,
) -> Result<(), BoxError>
where
    S: OrderStore + 'static,
    B: EventBus + Clone + 'static,
{
    let state = api::create_state(order_store, kitchen_store, bus.clone(), storage, &config);

    // 4. Start consumers
    let (stop_tx, stop_rx) = watch::channel(false);
    let consumers = api::spawn_consumers(&state, &bus, &config, move || {
        let mut rx = stop_rx.clone();
        async move {
            let _ = rx.wait_for(|stop| *stop).await;
        }
    })
    .await?;

    // 5. Start server
    let app = api::create_app(state, metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = stop_tx.send(true);
        })
        .await?;

    // 6. Let consumers finish in-flight messages
    for consumer in consumers {
        if let Err(e) = consumer.await {
            tracing::error!(error = %e, "consumer task failed");
        }
    }

    tracing::info!("server shut down gracefully");
    Ok(())
}
