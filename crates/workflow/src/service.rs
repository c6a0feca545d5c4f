//! Order workflow service.
//!
//! Orchestrates creation, item mutation, cancellation and status
//! transitions, enforcing the cross-entity rules the aggregate alone
//! cannot: price snapshots come from the inventory collaborator, inactive
//! units are not sellable, and delivery deactivates the sold units.

use std::sync::Arc;

use common::{BusinessId, Money, OrderId, OrderItemId, UnitId, UserId};
use domain::{Order, OrderError, OrderItem, OrderStatus};
use order_store::OrderStore;

use crate::deactivation::DeactivationReport;
use crate::error::{Result, WorkflowError};
use crate::services::inventory::InventoryService;
use crate::services::notify::{NotificationPublisher, OrderNotification};

/// A requested line item as supplied by a client.
///
/// Any client-supplied price is ignored; the snapshot always comes from
/// the inventory unit's current price.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub unit_id: UnitId,
    pub quantity: u32,
    pub unit_price: Option<Money>,
}

/// Result of a status update, carrying the deactivation outcome when the
/// transition was to `delivered`.
#[derive(Debug)]
pub struct StatusUpdate {
    pub order: Order,
    pub deactivation: Option<DeactivationReport>,
}

/// Service orchestrating the order lifecycle.
#[derive(Clone)]
pub struct OrderWorkflow<S: OrderStore> {
    store: S,
    inventory: Arc<dyn InventoryService>,
    notifier: Arc<dyn NotificationPublisher>,
}

impl<S: OrderStore> OrderWorkflow<S> {
    /// Creates a new workflow service over the given store and
    /// collaborators.
    pub fn new(
        store: S,
        inventory: Arc<dyn InventoryService>,
        notifier: Arc<dyn NotificationPublisher>,
    ) -> Self {
        Self {
            store,
            inventory,
            notifier,
        }
    }

    /// Creates a new order for a client.
    ///
    /// Every item is validated against the inventory collaborator and its
    /// price snapshotted from the catalog; the order is persisted in
    /// `pending` status. An empty item list never reaches the store.
    #[tracing::instrument(skip(self, items))]
    pub async fn create_order(
        &self,
        user_id: UserId,
        business_id: BusinessId,
        items: Vec<NewOrderItem>,
    ) -> Result<Order> {
        if items.is_empty() {
            return Err(WorkflowError::EmptyOrder);
        }

        let mut order = Order::new(user_id, business_id);
        for item in &items {
            let unit = self.validate_unit(item.unit_id).await?;
            order.add_item(OrderItem::new(item.unit_id, item.quantity, unit.price))?;
        }

        let stored = self.store.insert(order).await?;
        let order_id = stored.id().ok_or(order_store::StoreError::MissingId)?;
        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(%order_id, total = %stored.total(), "order created");

        self.notify(OrderNotification::OrderCreated {
            order_id,
            user_id,
            business_id,
            total: stored.total(),
        })
        .await;

        Ok(stored)
    }

    /// Loads an order, failing when absent.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, id: OrderId) -> Result<Order> {
        self.store
            .get(id)
            .await?
            .ok_or(WorkflowError::OrderNotFound(id))
    }

    /// Lists every order.
    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.store.list().await?)
    }

    /// Lists the orders placed by one client.
    pub async fn list_orders_by_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        Ok(self.store.list_by_user(user_id).await?)
    }

    /// Lists the orders belonging to one business.
    pub async fn list_orders_by_business(&self, business_id: BusinessId) -> Result<Vec<Order>> {
        Ok(self.store.list_by_business(business_id).await?)
    }

    /// Moves an order to a new status.
    ///
    /// A same-status request is an idempotent no-op and does not write to
    /// the store. When the new status is `delivered`, the sold units are
    /// deactivated after the status write has committed; that loop is
    /// best-effort and its failures are reported, never propagated.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<StatusUpdate> {
        let mut order = self.get_order(id).await?;
        let changed = order.apply_status(status)?;

        if !changed {
            return Ok(StatusUpdate {
                order,
                deactivation: None,
            });
        }

        let stored = self.store.update(&order).await?;
        metrics::counter!("order_status_transitions_total", "status" => status.as_str())
            .increment(1);
        tracing::info!(order_id = %id, %status, "order status updated");

        self.notify(OrderNotification::StatusChanged {
            order_id: id,
            status,
        })
        .await;

        let deactivation = if status == OrderStatus::Delivered {
            Some(self.deactivate_order_units(&stored).await)
        } else {
            None
        };

        Ok(StatusUpdate {
            order: stored,
            deactivation,
        })
    }

    /// Adds an item to a pending order.
    ///
    /// The referenced unit is validated exactly as at creation and its
    /// current price snapshotted.
    #[tracing::instrument(skip(self, item))]
    pub async fn add_item_to_order(&self, id: OrderId, item: NewOrderItem) -> Result<Order> {
        let mut order = self.get_order(id).await?;

        if !order.status().can_modify_items() {
            return Err(OrderError::InvalidStateTransition {
                current: order.status(),
                action: "add item",
            }
            .into());
        }

        let unit = self.validate_unit(item.unit_id).await?;
        order.add_item(OrderItem::new(item.unit_id, item.quantity, unit.price))?;

        Ok(self.store.update(&order).await?)
    }

    /// Removes an item from a pending order.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item_from_order(
        &self,
        id: OrderId,
        item_id: OrderItemId,
    ) -> Result<Order> {
        let mut order = self.get_order(id).await?;
        order.remove_item(item_id)?;
        Ok(self.store.update(&order).await?)
    }

    /// Changes an item's quantity on a pending order.
    ///
    /// The quantity is taken as a signed value so a negative request is
    /// rejected as `InvalidQuantity` rather than a deserialization error.
    #[tracing::instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        id: OrderId,
        item_id: OrderItemId,
        quantity: i64,
    ) -> Result<Order> {
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| *q >= 1)
            .ok_or(OrderError::InvalidQuantity { quantity })?;

        let mut order = self.get_order(id).await?;
        order.update_item_quantity(item_id, quantity)?;
        Ok(self.store.update(&order).await?)
    }

    /// Cancels an order.
    ///
    /// Legal from any status except `delivered`.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, id: OrderId) -> Result<Order> {
        let mut order = self.get_order(id).await?;
        let changed = order.cancel()?;

        if !changed {
            return Ok(order);
        }

        let stored = self.store.update(&order).await?;
        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(order_id = %id, "order cancelled");

        self.notify(OrderNotification::StatusChanged {
            order_id: id,
            status: OrderStatus::Cancelled,
        })
        .await;

        Ok(stored)
    }

    /// Deactivates every unit referenced by the order's items.
    ///
    /// Sequential and best-effort: each failure is logged and counted, and
    /// the loop continues, so one bad catalog row cannot block the rest or
    /// the operation that triggered the batch.
    pub async fn deactivate_order_units(&self, order: &Order) -> DeactivationReport {
        let mut report = DeactivationReport::default();

        for item in order.items() {
            report.attempted += 1;
            match self.inventory.set_unit_active(item.unit_id, false).await {
                Ok(_) => report.deactivated += 1,
                Err(e) => {
                    metrics::counter!("deactivation_failures_total").increment(1);
                    tracing::warn!(
                        unit_id = %item.unit_id,
                        error = %e,
                        "failed to deactivate inventory unit"
                    );
                    report.failures.push((item.unit_id, e.to_string()));
                }
            }
        }

        if !report.is_complete() {
            tracing::warn!(
                attempted = report.attempted,
                failed = report.failures.len(),
                "inventory deactivation batch finished with failures"
            );
        }
        report
    }

    async fn validate_unit(&self, unit_id: UnitId) -> Result<crate::services::inventory::InventoryUnit> {
        let unit = self
            .inventory
            .get_unit(unit_id)
            .await?
            .ok_or(WorkflowError::UnitNotFound(unit_id))?;
        if !unit.active {
            return Err(WorkflowError::InactiveUnit(unit_id));
        }
        Ok(unit)
    }

    async fn notify(&self, notification: OrderNotification) {
        // Fire-and-forget: a broken channel never fails the operation.
        if let Err(e) = self.notifier.publish(notification).await {
            tracing::warn!(error = %e, "notification publish failed");
        }
    }
}
