//! Workflow error types.

use common::{OrderId, UnitId};
use domain::OrderError;
use order_store::StoreError;
use thiserror::Error;

use crate::services::inventory::InventoryError;

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Order not found.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// Referenced inventory unit not found.
    #[error("inventory unit not found: {0}")]
    UnitNotFound(UnitId),

    /// Referenced inventory unit is not sellable.
    #[error("inventory unit {0} is not active")]
    InactiveUnit(UnitId),

    /// Order created with no items.
    #[error("order must contain at least one item")]
    EmptyOrder,

    /// An error raised by the order aggregate.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// An error from the order store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A transport-level inventory failure outside the best-effort loop.
    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

/// Result type for workflow operations.
pub type Result<T> = std::result::Result<T, WorkflowError>;
