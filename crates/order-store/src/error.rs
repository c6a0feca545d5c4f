use common::OrderId;
use domain::Version;
use thiserror::Error;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A compare-and-swap write found a different stored version.
    #[error("version conflict for order {order_id}: expected {expected}, found {actual}")]
    VersionConflict {
        order_id: OrderId,
        expected: Version,
        actual: Version,
    },

    /// The order was not found in the store.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// An update was attempted on an order that was never persisted.
    #[error("order has no id; it must be inserted before it can be updated")]
    MissingId,

    /// A stored row could not be mapped back to a domain value.
    #[error("invalid stored row: {0}")]
    InvalidRow(String),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
