use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{BusinessId, OrderId, OrderItemId, UserId};
use domain::{Order, OrderItem, Version};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError,
    store::OrderStore,
};

#[derive(Default)]
struct State {
    orders: HashMap<OrderId, Order>,
    next_order_id: i64,
    next_item_id: i64,
}

impl State {
    fn assign_item_ids(&mut self, items: &[OrderItem]) -> Vec<OrderItem> {
        items
            .iter()
            .map(|item| {
                let mut item = item.clone();
                if item.id.is_none() {
                    self.next_item_id += 1;
                    item.id = Some(OrderItemId::new(self.next_item_id));
                }
                item
            })
            .collect()
    }
}

/// In-memory order store for tests and default runs.
///
/// Provides the same contract as the PostgreSQL implementation, including
/// identity assignment and version compare-and-swap.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Clears all stored orders.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.orders.clear();
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<Order> {
        let mut state = self.state.write().await;

        state.next_order_id += 1;
        let id = OrderId::new(state.next_order_id);
        let items = state.assign_item_ids(order.items());

        let stored = Order::from_parts(
            id,
            order.user_id(),
            order.business_id(),
            order.status(),
            order.created_at(),
            Version::new(1),
            items,
        );
        state.orders.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, order: &Order) -> Result<Order> {
        let id = order.id().ok_or(StoreError::MissingId)?;
        let mut state = self.state.write().await;

        let current = state
            .orders
            .get(&id)
            .ok_or(StoreError::OrderNotFound(id))?;

        if current.version() != order.version() {
            return Err(StoreError::VersionConflict {
                order_id: id,
                expected: order.version(),
                actual: current.version(),
            });
        }

        let items = state.assign_item_ids(order.items());
        let stored = Order::from_parts(
            id,
            order.user_id(),
            order.business_id(),
            order.status(),
            order.created_at(),
            order.version().next(),
            items,
        );
        state.orders.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state.orders.values().cloned().collect();
        orders.sort_by_key(Order::id);
        Ok(orders)
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.user_id() == user_id)
            .cloned()
            .collect();
        orders.sort_by_key(Order::id);
        Ok(orders)
    }

    async fn list_by_business(&self, business_id: BusinessId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.business_id() == business_id)
            .cloned()
            .collect();
        orders.sort_by_key(Order::id);
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Money, UnitId};
    use domain::OrderStatus;

    fn new_order(user: i64, business: i64) -> Order {
        let mut order = Order::new(UserId::new(user), BusinessId::new(business));
        order
            .add_item(OrderItem::new(UnitId::new(1), 2, Money::from_cents(1099)))
            .unwrap();
        order
    }

    #[tokio::test]
    async fn test_insert_assigns_ids_and_version() {
        let store = InMemoryOrderStore::new();
        let stored = store.insert(new_order(1, 2)).await.unwrap();

        assert_eq!(stored.id(), Some(OrderId::new(1)));
        assert_eq!(stored.version(), Version::new(1));
        assert!(stored.items()[0].id.is_some());
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_order_ids() {
        let store = InMemoryOrderStore::new();
        let first = store.insert(new_order(1, 2)).await.unwrap();
        let second = store.insert(new_order(1, 2)).await.unwrap();

        assert_eq!(first.id(), Some(OrderId::new(1)));
        assert_eq!(second.id(), Some(OrderId::new(2)));
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let store = InMemoryOrderStore::new();
        let mut stored = store.insert(new_order(1, 2)).await.unwrap();

        stored.apply_status(OrderStatus::Confirmed).unwrap();
        let updated = store.update(&stored).await.unwrap();

        assert_eq!(updated.version(), Version::new(2));
        assert_eq!(updated.status(), OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_update_assigns_ids_to_new_items() {
        let store = InMemoryOrderStore::new();
        let mut stored = store.insert(new_order(1, 2)).await.unwrap();

        stored
            .add_item(OrderItem::new(UnitId::new(9), 1, Money::from_cents(500)))
            .unwrap();
        let updated = store.update(&stored).await.unwrap();

        assert!(updated.items().iter().all(|i| i.id.is_some()));
        assert_eq!(updated.items().len(), 2);
    }

    #[tokio::test]
    async fn test_stale_version_write_conflicts() {
        let store = InMemoryOrderStore::new();
        let stored = store.insert(new_order(1, 2)).await.unwrap();

        // Two readers load the same version.
        let mut first = stored.clone();
        let mut second = stored.clone();

        first.apply_status(OrderStatus::Confirmed).unwrap();
        store.update(&first).await.unwrap();

        second.apply_status(OrderStatus::Preparing).unwrap();
        let result = store.update(&second).await;
        assert!(matches!(result, Err(StoreError::VersionConflict { .. })));

        // The first write survived.
        let current = store.get(stored.id().unwrap()).await.unwrap().unwrap();
        assert_eq!(current.status(), OrderStatus::Confirmed);
        assert_eq!(current.version(), Version::new(2));
    }

    #[tokio::test]
    async fn test_update_unpersisted_order_fails() {
        let store = InMemoryOrderStore::new();
        let order = new_order(1, 2);
        let result = store.update(&order).await;
        assert!(matches!(result, Err(StoreError::MissingId)));
    }

    #[tokio::test]
    async fn test_get_absent_order_is_none() {
        let store = InMemoryOrderStore::new();
        assert!(store.get(OrderId::new(42)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_by_user_and_business() {
        let store = InMemoryOrderStore::new();
        store.insert(new_order(1, 10)).await.unwrap();
        store.insert(new_order(1, 20)).await.unwrap();
        store.insert(new_order(2, 10)).await.unwrap();

        let by_user = store.list_by_user(UserId::new(1)).await.unwrap();
        assert_eq!(by_user.len(), 2);

        let by_business = store.list_by_business(BusinessId::new(10)).await.unwrap();
        assert_eq!(by_business.len(), 2);

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].id() < w[1].id()));
    }
}
