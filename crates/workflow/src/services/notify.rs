//! Notification publisher trait and in-memory implementation.
//!
//! Publishing is fire-and-forget: callers swallow failures, so a broken
//! push channel can never fail an order operation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{BusinessId, Money, OrderId, UserId};
use domain::OrderStatus;
use thiserror::Error;

/// An order event worth telling interested parties about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderNotification {
    /// A new order was placed.
    OrderCreated {
        order_id: OrderId,
        user_id: UserId,
        business_id: BusinessId,
        total: Money,
    },
    /// An order moved to a new status.
    StatusChanged {
        order_id: OrderId,
        status: OrderStatus,
    },
}

/// Error from the notification channel.
#[derive(Debug, Error)]
#[error("notification publish failed: {0}")]
pub struct NotifyError(pub String);

/// Trait for the external notification channel (e.g. device push).
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    /// Publishes one notification.
    async fn publish(&self, notification: OrderNotification) -> Result<(), NotifyError>;
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    published: Vec<OrderNotification>,
    fail: bool,
}

/// In-memory publisher for tests and default runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationPublisher {
    state: Arc<RwLock<InMemoryNotifierState>>,
}

impl InMemoryNotificationPublisher {
    /// Creates a new in-memory publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the publisher to fail every publish.
    pub fn set_fail(&self, fail: bool) {
        self.state.write().unwrap().fail = fail;
    }

    /// Returns all notifications published so far.
    pub fn published(&self) -> Vec<OrderNotification> {
        self.state.read().unwrap().published.clone()
    }
}

#[async_trait]
impl NotificationPublisher for InMemoryNotificationPublisher {
    async fn publish(&self, notification: OrderNotification) -> Result<(), NotifyError> {
        let mut state = self.state.write().unwrap();
        if state.fail {
            return Err(NotifyError("simulated publish failure".to_string()));
        }
        state.published.push(notification);
        Ok(())
    }
}
