use common::{Money, OrderItemId, UnitId};
use serde::{Deserialize, Serialize};

/// A line item in an order.
///
/// `unit_price` is a snapshot taken when the item is added; later catalog
/// price changes do not affect it. The id is assigned by the store and is
/// `None` until the item has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Store-assigned identifier.
    pub id: Option<OrderItemId>,

    /// The inventory unit (bag) this line refers to.
    pub unit_id: UnitId,

    /// Quantity ordered, at least 1.
    pub quantity: u32,

    /// Price per unit in cents, snapshotted at add time.
    pub unit_price: Money,
}

impl OrderItem {
    /// Creates a new, not-yet-persisted order item.
    pub fn new(unit_id: UnitId, quantity: u32, unit_price: Money) -> Self {
        Self {
            id: None,
            unit_id,
            quantity,
            unit_price,
        }
    }

    /// Returns the total price for this line (quantity × unit price).
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}
