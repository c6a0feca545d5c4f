//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{BusinessId, Money, OrderId, OrderItemId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::OrderError;
use crate::item::OrderItem;
use crate::status::OrderStatus;
use crate::version::Version;

/// Largest accepted line-item quantity. The store persists quantities as
/// `INTEGER`, so anything above this cannot round-trip.
pub const MAX_QUANTITY: u32 = i32::MAX as u32;

/// Order aggregate root.
///
/// Exclusively owns its line items; every mutation recomputes the total so
/// that `total == Σ(item.price × item.quantity)` holds at all times. Item
/// mutations are legal only while the order is `pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Store-assigned identifier, `None` until persisted.
    id: Option<OrderId>,

    /// Client that placed the order.
    user_id: UserId,

    /// Business selling the bags.
    business_id: BusinessId,

    /// Current lifecycle status.
    status: OrderStatus,

    /// Derived total amount.
    total: Money,

    /// Creation timestamp.
    created_at: DateTime<Utc>,

    /// Version for optimistic concurrency, bumped by the store.
    #[serde(default)]
    version: Version,

    /// Line items, in insertion order.
    items: Vec<OrderItem>,
}

impl Order {
    /// Creates a new, not-yet-persisted order in `pending` status.
    pub fn new(user_id: UserId, business_id: BusinessId) -> Self {
        Self {
            id: None,
            user_id,
            business_id,
            status: OrderStatus::Pending,
            total: Money::zero(),
            created_at: Utc::now(),
            version: Version::initial(),
            items: Vec::new(),
        }
    }

    /// Rehydrates an order from stored fields.
    ///
    /// The total is recomputed from the items rather than trusted from
    /// storage.
    pub fn from_parts(
        id: OrderId,
        user_id: UserId,
        business_id: BusinessId,
        status: OrderStatus,
        created_at: DateTime<Utc>,
        version: Version,
        items: Vec<OrderItem>,
    ) -> Self {
        let mut order = Self {
            id: Some(id),
            user_id,
            business_id,
            status,
            total: Money::zero(),
            created_at,
            version,
            items,
        };
        order.recalculate_total();
        order
    }
}

// Query methods
impl Order {
    /// Store-assigned identifier, `None` until persisted.
    pub fn id(&self) -> Option<OrderId> {
        self.id
    }

    /// The client that placed the order.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// The business selling the bags.
    pub fn business_id(&self) -> BusinessId {
        self.business_id
    }

    /// Current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Derived total amount.
    pub fn total(&self) -> Money {
        self.total
    }

    /// Creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Current optimistic-concurrency version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Line items in insertion order.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Looks up a line item by id.
    pub fn item(&self, item_id: OrderItemId) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.id == Some(item_id))
    }

    /// Returns true if the order has at least one item.
    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }

    /// Returns true if the order can still be cancelled.
    pub fn can_be_cancelled(&self) -> bool {
        self.status.can_be_cancelled()
    }

    /// Recomputes the total from the current item set.
    pub fn calculate_total(&self) -> Money {
        self.items.iter().map(OrderItem::total_price).sum()
    }
}

// Command methods
impl Order {
    /// Appends a line item and recomputes the total.
    ///
    /// Requires `pending` status, a quantity between 1 and [`MAX_QUANTITY`]
    /// and a non-negative price.
    pub fn add_item(&mut self, item: OrderItem) -> Result<(), OrderError> {
        if !self.status.can_modify_items() {
            return Err(OrderError::InvalidStateTransition {
                current: self.status,
                action: "add item",
            });
        }
        if item.quantity < 1 || item.quantity > MAX_QUANTITY {
            return Err(OrderError::InvalidQuantity {
                quantity: i64::from(item.quantity),
            });
        }
        if item.unit_price.is_negative() {
            return Err(OrderError::InvalidPrice {
                price: item.unit_price.cents(),
            });
        }

        self.items.push(item);
        self.recalculate_total();
        Ok(())
    }

    /// Removes a line item by id and recomputes the total.
    ///
    /// An absent item surfaces `ItemNotFound` rather than silently
    /// succeeding.
    pub fn remove_item(&mut self, item_id: OrderItemId) -> Result<OrderItem, OrderError> {
        if !self.status.can_modify_items() {
            return Err(OrderError::InvalidStateTransition {
                current: self.status,
                action: "remove item",
            });
        }

        let idx = self
            .items
            .iter()
            .position(|i| i.id == Some(item_id))
            .ok_or(OrderError::ItemNotFound { item_id })?;

        let removed = self.items.remove(idx);
        self.recalculate_total();
        Ok(removed)
    }

    /// Changes a line item's quantity and recomputes the total.
    pub fn update_item_quantity(
        &mut self,
        item_id: OrderItemId,
        quantity: u32,
    ) -> Result<(), OrderError> {
        if !self.status.can_modify_items() {
            return Err(OrderError::InvalidStateTransition {
                current: self.status,
                action: "update item quantity",
            });
        }
        if quantity < 1 || quantity > MAX_QUANTITY {
            return Err(OrderError::InvalidQuantity {
                quantity: i64::from(quantity),
            });
        }

        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == Some(item_id))
            .ok_or(OrderError::ItemNotFound { item_id })?;

        item.quantity = quantity;
        self.recalculate_total();
        Ok(())
    }

    /// Moves the order to a new status.
    ///
    /// A same-status request is an idempotent no-op (returns `false`), so a
    /// redelivered webhook or retried job cannot double-apply a transition.
    /// Terminal statuses accept no further transitions.
    pub fn apply_status(&mut self, next: OrderStatus) -> Result<bool, OrderError> {
        if next == self.status {
            return Ok(false);
        }
        if self.status.is_terminal() {
            return Err(OrderError::InvalidStateTransition {
                current: self.status,
                action: "change status",
            });
        }
        self.status = next;
        Ok(true)
    }

    /// Cancels the order.
    ///
    /// Legal from any status except `delivered`; cancelling an already
    /// cancelled order is a no-op.
    pub fn cancel(&mut self) -> Result<bool, OrderError> {
        if !self.can_be_cancelled() {
            return Err(OrderError::InvalidStateTransition {
                current: self.status,
                action: "cancel",
            });
        }
        if self.status == OrderStatus::Cancelled {
            return Ok(false);
        }
        self.status = OrderStatus::Cancelled;
        Ok(true)
    }

    fn recalculate_total(&mut self) {
        self.total = self.calculate_total();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::UnitId;

    fn pending_order() -> Order {
        let mut order = Order::from_parts(
            OrderId::new(1),
            UserId::new(10),
            BusinessId::new(20),
            OrderStatus::Pending,
            Utc::now(),
            Version::new(1),
            vec![],
        );
        order
            .add_item(OrderItem {
                id: Some(OrderItemId::new(1)),
                unit_id: UnitId::new(1),
                quantity: 2,
                unit_price: Money::from_cents(1099),
            })
            .unwrap();
        order
    }

    #[test]
    fn test_new_order_is_pending_and_empty() {
        let order = Order::new(UserId::new(1), BusinessId::new(2));
        assert!(order.id().is_none());
        assert_eq!(order.status(), OrderStatus::Pending);
        assert!(!order.has_items());
        assert!(order.total().is_zero());
        assert_eq!(order.version(), Version::initial());
    }

    #[test]
    fn test_add_item_recomputes_total() {
        let mut order = pending_order();
        order
            .add_item(OrderItem::new(UnitId::new(2), 1, Money::from_cents(1599)))
            .unwrap();

        // 2 × 10.99 + 1 × 15.99 = 37.97
        assert_eq!(order.total().cents(), 3797);
        assert_eq!(order.total(), order.calculate_total());
    }

    #[test]
    fn test_add_item_rejects_zero_quantity() {
        let mut order = pending_order();
        let result = order.add_item(OrderItem::new(UnitId::new(2), 0, Money::from_cents(100)));
        assert!(matches!(result, Err(OrderError::InvalidQuantity { .. })));
    }

    #[test]
    fn test_add_item_rejects_negative_price() {
        let mut order = pending_order();
        let result = order.add_item(OrderItem::new(UnitId::new(2), 1, Money::from_cents(-1)));
        assert!(matches!(result, Err(OrderError::InvalidPrice { .. })));
    }

    #[test]
    fn test_add_item_allows_zero_price() {
        let mut order = pending_order();
        order
            .add_item(OrderItem::new(UnitId::new(2), 1, Money::zero()))
            .unwrap();
        assert_eq!(order.items().len(), 2);
    }

    #[test]
    fn test_remove_item_recomputes_total() {
        let mut order = pending_order();
        let removed = order.remove_item(OrderItemId::new(1)).unwrap();
        assert_eq!(removed.unit_id, UnitId::new(1));
        assert!(order.total().is_zero());
        assert!(!order.has_items());
    }

    #[test]
    fn test_remove_absent_item_surfaces_not_found() {
        let mut order = pending_order();
        let result = order.remove_item(OrderItemId::new(99));
        assert!(matches!(result, Err(OrderError::ItemNotFound { .. })));
    }

    #[test]
    fn test_add_item_rejects_quantity_above_max() {
        let mut order = pending_order();
        let result = order.add_item(OrderItem::new(
            UnitId::new(2),
            3_000_000_000,
            Money::from_cents(100),
        ));
        assert!(matches!(
            result,
            Err(OrderError::InvalidQuantity {
                quantity: 3_000_000_000
            })
        ));
        // Total must still reflect only the items that were accepted.
        assert_eq!(order.total().cents(), 2 * 1099);
    }

    #[test]
    fn test_add_item_accepts_max_quantity() {
        let mut order = pending_order();
        order
            .add_item(OrderItem::new(UnitId::new(2), MAX_QUANTITY, Money::from_cents(1)))
            .unwrap();
        assert_eq!(
            order.total().cents(),
            2 * 1099 + i64::from(MAX_QUANTITY)
        );
    }

    #[test]
    fn test_update_item_quantity_recomputes_total() {
        let mut order = pending_order();
        order
            .update_item_quantity(OrderItemId::new(1), 5)
            .unwrap();
        assert_eq!(order.total().cents(), 5 * 1099);
    }

    #[test]
    fn test_update_item_quantity_rejects_zero() {
        let mut order = pending_order();
        let result = order.update_item_quantity(OrderItemId::new(1), 0);
        assert!(matches!(
            result,
            Err(OrderError::InvalidQuantity { quantity: 0 })
        ));
    }

    #[test]
    fn test_update_item_quantity_rejects_value_above_max() {
        let mut order = pending_order();
        let result = order.update_item_quantity(OrderItemId::new(1), MAX_QUANTITY + 1);
        assert!(matches!(result, Err(OrderError::InvalidQuantity { .. })));
        assert_eq!(order.total().cents(), 2 * 1099);
    }

    #[test]
    fn test_item_mutations_require_pending() {
        let mut order = pending_order();
        order.apply_status(OrderStatus::Confirmed).unwrap();

        let add = order.add_item(OrderItem::new(UnitId::new(3), 1, Money::zero()));
        assert!(matches!(
            add,
            Err(OrderError::InvalidStateTransition { .. })
        ));

        let remove = order.remove_item(OrderItemId::new(1));
        assert!(matches!(
            remove,
            Err(OrderError::InvalidStateTransition { .. })
        ));

        let update = order.update_item_quantity(OrderItemId::new(1), 3);
        assert!(matches!(
            update,
            Err(OrderError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_any_non_terminal_status_may_jump() {
        // Forward ordering is not enforced, only terminality.
        let mut order = pending_order();
        order.apply_status(OrderStatus::Ready).unwrap();
        order.apply_status(OrderStatus::Confirmed).unwrap();
        order.apply_status(OrderStatus::Delivered).unwrap();
        assert_eq!(order.status(), OrderStatus::Delivered);
    }

    #[test]
    fn test_same_status_is_idempotent_noop() {
        let mut order = pending_order();
        order.apply_status(OrderStatus::Ready).unwrap();
        assert!(!order.apply_status(OrderStatus::Ready).unwrap());

        order.apply_status(OrderStatus::Delivered).unwrap();
        assert!(!order.apply_status(OrderStatus::Delivered).unwrap());
    }

    #[test]
    fn test_delivered_accepts_no_further_transition() {
        let mut order = pending_order();
        order.apply_status(OrderStatus::Delivered).unwrap();

        let result = order.apply_status(OrderStatus::Ready);
        assert!(matches!(
            result,
            Err(OrderError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_cancel_rejected_once_delivered() {
        let mut order = pending_order();
        order.apply_status(OrderStatus::Delivered).unwrap();
        assert!(!order.can_be_cancelled());
        assert!(matches!(
            order.cancel(),
            Err(OrderError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_cancel_from_any_other_status() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
        ] {
            let mut order = pending_order();
            order.apply_status(status).unwrap();
            assert!(order.cancel().unwrap());
            assert_eq!(order.status(), OrderStatus::Cancelled);
        }
    }

    #[test]
    fn test_cancel_twice_is_noop() {
        let mut order = pending_order();
        assert!(order.cancel().unwrap());
        assert!(!order.cancel().unwrap());
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }

    #[test]
    fn test_from_parts_recomputes_total() {
        let items = vec![
            OrderItem {
                id: Some(OrderItemId::new(1)),
                unit_id: UnitId::new(1),
                quantity: 2,
                unit_price: Money::from_cents(1099),
            },
            OrderItem {
                id: Some(OrderItemId::new(2)),
                unit_id: UnitId::new(2),
                quantity: 1,
                unit_price: Money::from_cents(1599),
            },
        ];
        let order = Order::from_parts(
            OrderId::new(5),
            UserId::new(1),
            BusinessId::new(2),
            OrderStatus::Pending,
            Utc::now(),
            Version::new(3),
            items,
        );
        assert_eq!(order.total().cents(), 3797);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let order = pending_order();
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id(), order.id());
        assert_eq!(back.status(), order.status());
        assert_eq!(back.total(), order.total());
        assert_eq!(back.items(), order.items());
    }
}
