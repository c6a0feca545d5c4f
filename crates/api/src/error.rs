//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::OrderError;
use order_store::StoreError;
use payments::GatewayError;
use workflow::WorkflowError;

/// API-level error type that maps to HTTP responses.
///
/// Every response body is `{"error": <message>, "code": <CODE>}` with a
/// machine-readable code alongside the human-readable message.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Workflow or domain logic error.
    Workflow(WorkflowError),
    /// Payment gateway error.
    Gateway(GatewayError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Workflow(err) => workflow_error_to_response(err),
            ApiError::Gateway(err) => gateway_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", msg)
            }
        };

        let body = serde_json::json!({ "error": message, "code": code });
        (status, axum::Json(body)).into_response()
    }
}

fn workflow_error_to_response(err: WorkflowError) -> (StatusCode, &'static str, String) {
    let message = err.to_string();
    match err {
        WorkflowError::OrderNotFound(_) | WorkflowError::UnitNotFound(_) => {
            (StatusCode::NOT_FOUND, "NOT_FOUND", message)
        }
        WorkflowError::EmptyOrder => (StatusCode::BAD_REQUEST, "INVALID_ORDER", message),
        WorkflowError::InactiveUnit(_) => (StatusCode::BAD_REQUEST, "INACTIVE_UNIT", message),
        WorkflowError::Order(order_err) => match order_err {
            OrderError::UnrecognizedStatus { .. } => {
                (StatusCode::BAD_REQUEST, "INVALID_STATUS", message)
            }
            OrderError::InvalidStateTransition { .. } => {
                (StatusCode::BAD_REQUEST, "INVALID_ORDER_STATUS", message)
            }
            OrderError::ItemNotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", message),
            OrderError::InvalidQuantity { .. } => {
                (StatusCode::BAD_REQUEST, "INVALID_QUANTITY", message)
            }
            OrderError::InvalidPrice { .. } => (StatusCode::BAD_REQUEST, "INVALID_PRICE", message),
        },
        WorkflowError::Store(store_err) => match store_err {
            StoreError::VersionConflict { .. } => (StatusCode::CONFLICT, "CONFLICT", message),
            StoreError::OrderNotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", message),
            _ => {
                tracing::error!(error = %message, "store error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", message)
            }
        },
        WorkflowError::Inventory(_) => {
            tracing::error!(error = %message, "inventory collaborator error");
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", message)
        }
    }
}

fn gateway_error_to_response(err: GatewayError) -> (StatusCode, &'static str, String) {
    match err {
        GatewayError::InvalidOrderId { .. } => {
            (StatusCode::BAD_REQUEST, "INVALID_ORDER_ID", err.to_string())
        }
        GatewayError::UnknownPaymentStatus { .. } => (
            StatusCode::BAD_REQUEST,
            "UNKNOWN_PAYMENT_STATUS",
            err.to_string(),
        ),
        GatewayError::Workflow(inner) => workflow_error_to_response(inner),
        GatewayError::Schedule(inner) => {
            tracing::error!(error = %inner, "scheduler error");
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", inner.to_string())
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        ApiError::Workflow(err)
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError::Gateway(err)
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Workflow(WorkflowError::Order(err))
    }
}
