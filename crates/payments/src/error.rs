//! Error types for the payment gateway and scheduler.

use thiserror::Error;
use workflow::WorkflowError;

/// Errors from the durable transition schedule.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Job not found: {0}")]
    JobNotFound(uuid::Uuid),

    #[error("Invalid job row: {0}")]
    InvalidRow(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors from handling an inbound payment event.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid order id in payment event: {value}")]
    InvalidOrderId { value: String },

    #[error("Unknown payment status: {value}")]
    UnknownPaymentStatus { value: String },

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

pub type Result<T, E = GatewayError> = std::result::Result<T, E>;
