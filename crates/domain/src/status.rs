//! Order status state machine.

use serde::{Deserialize, Serialize};

use crate::error::OrderError;

/// The status of an order in its lifecycle.
///
/// Forward path:
/// ```text
/// pending ──► confirmed ──► preparing ──► ready ──► delivered
///     │            │             │          │
///     └────────────┴─────────────┴──────────┴──► cancelled
/// ```
///
/// Only terminality is enforced: any non-terminal status may move to any
/// other recognized status, but `delivered` and `cancelled` accept no
/// further transitions. `paid` is an internal marker set by the payment
/// gateway before the delayed progression begins; it is not accepted from
/// the HTTP status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order is being assembled, items can be added/removed.
    #[default]
    Pending,

    /// Payment approved, progression to ready/delivered is scheduled.
    Paid,

    /// Business has confirmed the order.
    Confirmed,

    /// Bags are being prepared.
    Preparing,

    /// Ready for pickup.
    Ready,

    /// Picked up / delivered (terminal).
    Delivered,

    /// Order was cancelled (terminal).
    Cancelled,
}

impl OrderStatus {
    /// The set of statuses a client may request through the API,
    /// in their exact wire spelling.
    pub const RECOGNIZED: [&'static str; 6] = [
        "pending",
        "confirmed",
        "preparing",
        "ready",
        "delivered",
        "cancelled",
    ];

    /// Parses a status requested by a client.
    ///
    /// Case-sensitive; `paid` is internal and deliberately not accepted here.
    pub fn parse_requested(value: &str) -> Result<Self, OrderError> {
        match value {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "preparing" => Ok(OrderStatus::Preparing),
            "ready" => Ok(OrderStatus::Ready),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(OrderError::UnrecognizedStatus {
                value: other.to_string(),
            }),
        }
    }

    /// Returns true if items can be modified in this status.
    pub fn can_modify_items(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if the order can still be cancelled.
    ///
    /// Cancellation is rejected only once the order is delivered.
    pub fn can_be_cancelled(&self) -> bool {
        !matches!(self, OrderStatus::Delivered)
    }

    /// Returns true if this is a terminal status (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns the status in its wire spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Parses any stored status, including the internal `paid` marker.
    pub fn from_stored(value: &str) -> Result<Self, OrderError> {
        if value == "paid" {
            return Ok(OrderStatus::Paid);
        }
        Self::parse_requested(value)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_parse_requested_accepts_the_six_statuses() {
        for value in OrderStatus::RECOGNIZED {
            let status = OrderStatus::parse_requested(value).unwrap();
            assert_eq!(status.as_str(), value);
        }
    }

    #[test]
    fn test_parse_requested_rejects_paid() {
        let result = OrderStatus::parse_requested("paid");
        assert!(matches!(
            result,
            Err(OrderError::UnrecognizedStatus { .. })
        ));
    }

    #[test]
    fn test_parse_requested_is_case_sensitive() {
        assert!(OrderStatus::parse_requested("Pending").is_err());
        assert!(OrderStatus::parse_requested("DELIVERED").is_err());
    }

    #[test]
    fn test_parse_requested_rejects_unknown() {
        assert!(OrderStatus::parse_requested("shipped").is_err());
        assert!(OrderStatus::parse_requested("").is_err());
    }

    #[test]
    fn test_from_stored_accepts_paid() {
        assert_eq!(
            OrderStatus::from_stored("paid").unwrap(),
            OrderStatus::Paid
        );
    }

    #[test]
    fn test_only_pending_can_modify_items() {
        assert!(OrderStatus::Pending.can_modify_items());
        assert!(!OrderStatus::Paid.can_modify_items());
        assert!(!OrderStatus::Confirmed.can_modify_items());
        assert!(!OrderStatus::Preparing.can_modify_items());
        assert!(!OrderStatus::Ready.can_modify_items());
        assert!(!OrderStatus::Delivered.can_modify_items());
        assert!(!OrderStatus::Cancelled.can_modify_items());
    }

    #[test]
    fn test_can_be_cancelled_except_delivered() {
        assert!(OrderStatus::Pending.can_be_cancelled());
        assert!(OrderStatus::Paid.can_be_cancelled());
        assert!(OrderStatus::Confirmed.can_be_cancelled());
        assert!(OrderStatus::Preparing.can_be_cancelled());
        assert!(OrderStatus::Ready.can_be_cancelled());
        assert!(!OrderStatus::Delivered.can_be_cancelled());
        assert!(OrderStatus::Cancelled.can_be_cancelled());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Paid.is_terminal());
        assert!(!OrderStatus::Ready.is_terminal());
    }

    #[test]
    fn test_serialization_uses_wire_spelling() {
        let json = serde_json::to_string(&OrderStatus::Preparing).unwrap();
        assert_eq!(json, "\"preparing\"");
        let back: OrderStatus = serde_json::from_str("\"paid\"").unwrap();
        assert_eq!(back, OrderStatus::Paid);
    }
}
