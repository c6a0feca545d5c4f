//! HTTP API server with observability for the order system.
//!
//! Provides REST endpoints for the order lifecycle and the payment
//! processor webhook, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryOrderStore, OrderStore};
use payments::{InMemoryJobStore, PaymentGateway, TransitionWorker};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use workflow::{InMemoryInventoryService, InMemoryNotificationPublisher, OrderWorkflow};

use config::Config;
use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: OrderStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/user/{id}", get(routes::orders::list_by_user::<S>))
        .route(
            "/orders/business/{id}",
            get(routes::orders::list_by_business::<S>),
        )
        .route(
            "/orders/{id}/status",
            patch(routes::orders::update_status::<S>),
        )
        .route(
            "/orders/{order_id}/items",
            post(routes::orders::add_item::<S>),
        )
        .route(
            "/orders/{order_id}/items/{item_id}",
            delete(routes::orders::remove_item::<S>),
        )
        .route(
            "/orders/{order_id}/items/{item_id}/quantity",
            patch(routes::orders::update_item_quantity::<S>),
        )
        .route("/payments/webhook", post(routes::payments::webhook::<S>))
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

/// Default in-memory wiring plus handles to the collaborators, so tests
/// and local runs can seed the catalog and inspect side effects.
pub struct DefaultState {
    pub state: Arc<AppState<InMemoryOrderStore>>,
    pub worker: TransitionWorker<InMemoryOrderStore>,
    pub inventory: InMemoryInventoryService,
    pub notifier: InMemoryNotificationPublisher,
    pub jobs: InMemoryJobStore,
}

/// Creates application state backed by in-memory stores.
pub fn create_default_state(config: &Config) -> DefaultState {
    let store = InMemoryOrderStore::new();
    let inventory = InMemoryInventoryService::new();
    let notifier = InMemoryNotificationPublisher::new();
    let jobs = InMemoryJobStore::new();

    let workflow = OrderWorkflow::new(
        store,
        Arc::new(inventory.clone()),
        Arc::new(notifier.clone()),
    );
    let gateway = PaymentGateway::new(
        workflow.clone(),
        Arc::new(jobs.clone()),
        config.ready_delay_secs,
        config.delivered_delay_secs,
    );
    let worker = TransitionWorker::new(
        workflow.clone(),
        Arc::new(jobs.clone()),
        config.job_poll_interval,
    );

    DefaultState {
        state: Arc::new(AppState { workflow, gateway }),
        worker,
        inventory,
        notifier,
        jobs,
    }
}
