//! External collaborators of the order workflow.

pub mod inventory;
pub mod notify;

pub use inventory::{InMemoryInventoryService, InventoryError, InventoryService, InventoryUnit};
pub use notify::{
    InMemoryNotificationPublisher, NotificationPublisher, NotifyError, OrderNotification,
};
