//! API server entry point.

use std::sync::Arc;

use order_store::{OrderStore, PostgresOrderStore};
use payments::{PaymentGateway, PostgresJobStore, TransitionWorker};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use workflow::{InMemoryInventoryService, InMemoryNotificationPublisher, OrderWorkflow};

use api::config::Config;
use api::routes::orders::AppState;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
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

async fn serve<S: OrderStore + Clone + 'static>(
    config: &Config,
    state: Arc<AppState<S>>,
    worker: TransitionWorker<S>,
    metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
) {
    let worker_task = tokio::spawn(worker.run());

    let app = api::create_app(state, metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // Any job in flight is re-dispatched from the store on next start.
    worker_task.abort();
    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Wire state and serve
    match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to database");

            let store = PostgresOrderStore::new(pool.clone());
            store.run_migrations().await.expect("migrations failed");

            let workflow = OrderWorkflow::new(
                store,
                Arc::new(InMemoryInventoryService::new()),
                Arc::new(InMemoryNotificationPublisher::new()),
            );
            let jobs = Arc::new(PostgresJobStore::new(pool));
            let gateway = PaymentGateway::new(
                workflow.clone(),
                jobs.clone(),
                config.ready_delay_secs,
                config.delivered_delay_secs,
            );
            let worker = TransitionWorker::new(workflow.clone(), jobs, config.job_poll_interval);

            let state = Arc::new(AppState { workflow, gateway });
            serve(&config, state, worker, metrics_handle).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage");
            let default = api::create_default_state(&config);
            serve(&config, default.state, default.worker, metrics_handle).await;
        }
    }
}
