//! Order workflow service and its external collaborators.
//!
//! The workflow enforces what the aggregate alone cannot: item prices are
//! snapshotted from the inventory catalog, inactive units are rejected,
//! and delivery deactivates the sold units best-effort.

mod deactivation;
mod error;
mod service;
pub mod services;

pub use deactivation::DeactivationReport;
pub use error::{Result, WorkflowError};
pub use service::{NewOrderItem, OrderWorkflow, StatusUpdate};
pub use services::{
    InMemoryInventoryService, InMemoryNotificationPublisher, InventoryError, InventoryService,
    InventoryUnit, NotificationPublisher, NotifyError, OrderNotification,
};
