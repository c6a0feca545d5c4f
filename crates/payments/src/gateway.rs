//! Inbound boundary for external payment processor notifications.

use std::sync::Arc;

use common::OrderId;
use domain::{Order, OrderStatus};
use order_store::OrderStore;
use serde::Deserialize;
use workflow::{DeactivationReport, OrderWorkflow};

use crate::error::{GatewayError, Result};
use crate::schedule::{FollowUp, JobStore, ScheduledTransition};

/// A raw payment notification as delivered by the processor.
///
/// The order id arrives as a string and is validated here, not by the
/// transport layer.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
    pub order_id: String,
    pub status: String,
    pub payment_id: String,
}

/// Recognized processor statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Approved,
    Completed,
    Failed,
    Cancelled,
    Rejected,
}

impl PaymentStatus {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "approved" => Ok(Self::Approved),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            "rejected" => Ok(Self::Rejected),
            _ => Err(GatewayError::UnknownPaymentStatus {
                value: value.to_string(),
            }),
        }
    }

    /// Whether the processor confirmed the charge.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Approved | Self::Completed)
    }
}

/// What a handled payment event did to the order.
#[derive(Debug)]
pub enum PaymentOutcome {
    /// Charge confirmed: order marked paid, its units deactivated, and the
    /// delayed progression towards `delivered` queued.
    Progressing {
        order: Order,
        deactivation: DeactivationReport,
    },
    /// Charge failed: order cancelled, inventory untouched.
    Cancelled { order: Order },
}

/// Handles payment processor notifications and drives the workflow.
#[derive(Clone)]
pub struct PaymentGateway<S: OrderStore> {
    workflow: OrderWorkflow<S>,
    jobs: Arc<dyn JobStore>,
    ready_delay_secs: i64,
    delivered_delay_secs: i64,
}

impl<S: OrderStore> PaymentGateway<S> {
    pub fn new(
        workflow: OrderWorkflow<S>,
        jobs: Arc<dyn JobStore>,
        ready_delay_secs: i64,
        delivered_delay_secs: i64,
    ) -> Self {
        Self {
            workflow,
            jobs,
            ready_delay_secs,
            delivered_delay_secs,
        }
    }

    /// Processes one payment event.
    ///
    /// On a confirmed charge the order is marked `paid`, its inventory
    /// units are deactivated best-effort, and a `ready` transition is
    /// queued with a `delivered` follow-up. On a failed charge the order
    /// is cancelled. Redelivery of the same event is safe: the paid
    /// transition is a no-op the second time and the queued jobs apply
    /// idempotently.
    #[tracing::instrument(skip(self, event), fields(order_id = %event.order_id, status = %event.status))]
    pub async fn handle_event(&self, event: PaymentEvent) -> Result<PaymentOutcome> {
        let order_id = OrderId::parse(&event.order_id).map_err(|_| {
            GatewayError::InvalidOrderId {
                value: event.order_id.clone(),
            }
        })?;
        let status = PaymentStatus::parse(&event.status)?;

        // Surface NotFound before touching anything.
        self.workflow.get_order(order_id).await?;

        metrics::counter!("payment_events_total", "status" => event.status.clone()).increment(1);

        if status.is_success() {
            let update = self.workflow.update_status(order_id, OrderStatus::Paid).await?;
            let deactivation = self.workflow.deactivate_order_units(&update.order).await;

            let job = ScheduledTransition::new(
                order_id,
                OrderStatus::Ready,
                chrono::Utc::now(),
                self.ready_delay_secs,
                Some(FollowUp {
                    status: OrderStatus::Delivered,
                    delay_secs: self.delivered_delay_secs,
                }),
            );
            self.jobs.enqueue(job).await?;

            tracing::info!(
                %order_id,
                payment_id = %event.payment_id,
                "payment confirmed, progression queued"
            );
            Ok(PaymentOutcome::Progressing {
                order: update.order,
                deactivation,
            })
        } else {
            let order = self.workflow.cancel_order(order_id).await?;
            tracing::info!(
                %order_id,
                payment_id = %event.payment_id,
                "payment failed, order cancelled"
            );
            Ok(PaymentOutcome::Cancelled { order })
        }
    }
}
