//! Payment processor webhook endpoint.

use axum::Json;
use axum::extract::State;
use order_store::OrderStore;
use payments::{PaymentEvent, PaymentOutcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::ApiError;
use crate::routes::orders::AppState;

/// Raw webhook body. Fields are validated here rather than rejected by the
/// deserializer so missing fields come back as 400s with an error body.
#[derive(Deserialize)]
pub struct WebhookRequest {
    pub order_id: Option<Value>,
    pub status: Option<String>,
    pub payment_id: Option<String>,
}

#[derive(Serialize)]
pub struct WebhookResponse {
    pub order_id: i64,
    pub order_status: String,
}

/// Processors send the order id as either a JSON string or number.
fn order_id_field(value: Option<Value>) -> Result<String, ApiError> {
    match value {
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ApiError::BadRequest("missing field: order_id".to_string())),
    }
}

/// POST /payments/webhook — apply a payment processor notification.
#[tracing::instrument(skip(state, req))]
pub async fn webhook<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<WebhookRequest>,
) -> Result<Json<WebhookResponse>, ApiError> {
    let event = PaymentEvent {
        order_id: order_id_field(req.order_id)?,
        status: req
            .status
            .ok_or_else(|| ApiError::BadRequest("missing field: status".to_string()))?,
        payment_id: req
            .payment_id
            .ok_or_else(|| ApiError::BadRequest("missing field: payment_id".to_string()))?,
    };

    let outcome = state.gateway.handle_event(event).await?;
    let order = match outcome {
        PaymentOutcome::Progressing { order, .. } => order,
        PaymentOutcome::Cancelled { order } => order,
    };

    Ok(Json(WebhookResponse {
        order_id: order.id().map(|id| id.as_i64()).unwrap_or_default(),
        order_status: order.status().to_string(),
    }))
}
