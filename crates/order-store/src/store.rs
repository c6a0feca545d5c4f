use async_trait::async_trait;
use common::{BusinessId, OrderId, UserId};
use domain::Order;

use crate::Result;

/// Core trait for order store implementations.
///
/// All implementations must be thread-safe (Send + Sync). Writes that
/// change an existing order go through [`OrderStore::update`], which
/// persists status, total and the full item set atomically and performs a
/// compare-and-swap on the order's version.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order, assigning its id and its items' ids.
    ///
    /// The returned order carries the assigned identities and version 1.
    async fn insert(&self, order: Order) -> Result<Order>;

    /// Persists the current state of a previously inserted order.
    ///
    /// Fails with `VersionConflict` when the stored version no longer
    /// matches `order.version()`, and with `OrderNotFound` when the order
    /// has been removed. New items are assigned ids; items absent from the
    /// order are deleted. Returns the stored order with the bumped version.
    async fn update(&self, order: &Order) -> Result<Order>;

    /// Loads an order by id, `None` if absent.
    async fn get(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists every order, in id order.
    async fn list(&self) -> Result<Vec<Order>>;

    /// Lists the orders placed by one client, in id order.
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>>;

    /// Lists the orders belonging to one business, in id order.
    async fn list_by_business(&self, business_id: BusinessId) -> Result<Vec<Order>>;
}
