//! Prometheus scrape endpoint.
//!
//! Exposes the counters recorded across the workflow and the payment
//! scheduler (order creations, transitions, job retries) in the Prometheus
//! text exposition format.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

/// GET /metrics — renders the current metrics snapshot.
pub async fn render(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}
