//! Domain error types.

use common::OrderItemId;
use thiserror::Error;

use crate::status::OrderStatus;

/// Errors raised by the order aggregate.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Status value outside the recognized set.
    #[error("unrecognized status '{value}'")]
    UnrecognizedStatus { value: String },

    /// Operation is not legal in the order's current status.
    #[error("cannot {action} in {current} status")]
    InvalidStateTransition {
        current: OrderStatus,
        action: &'static str,
    },

    /// Line item not found in the order.
    #[error("item {item_id} not found in order")]
    ItemNotFound { item_id: OrderItemId },

    /// Quantity outside the accepted range.
    #[error("invalid quantity {quantity} (must be between 1 and {})", crate::order::MAX_QUANTITY)]
    InvalidQuantity { quantity: i64 },

    /// Negative unit price.
    #[error("invalid price {price} cents (must not be negative)")]
    InvalidPrice { price: i64 },
}
