//! Polling worker that applies due scheduled transitions.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use order_store::OrderStore;
use workflow::{OrderWorkflow, WorkflowError};

use crate::error::ScheduleError;
use crate::schedule::{JobStore, ScheduledTransition};

/// How many times a job is retried on a transient failure before being
/// dropped.
const MAX_ATTEMPTS: i32 = 5;
/// Delay before a failed job is retried.
const RETRY_DELAY_SECS: i64 = 5;

/// Applies due transition jobs against the workflow service.
///
/// Transition handlers are idempotent: a job whose target status is
/// already current applies as a no-op, so a redelivered webhook or a
/// retried job never double-applies. Jobs whose order is gone or has
/// reached a terminal status are dropped, not retried.
#[derive(Clone)]
pub struct TransitionWorker<S: OrderStore> {
    workflow: OrderWorkflow<S>,
    jobs: Arc<dyn JobStore>,
    poll_interval: Duration,
}

impl<S: OrderStore> TransitionWorker<S> {
    pub fn new(workflow: OrderWorkflow<S>, jobs: Arc<dyn JobStore>, poll_interval: Duration) -> Self {
        Self {
            workflow,
            jobs,
            poll_interval,
        }
    }

    /// Polls forever at the configured interval.
    ///
    /// Intended to be spawned; the task is simply dropped on shutdown and
    /// any in-flight job is picked up again on the next start.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(interval_ms = self.poll_interval.as_millis() as u64, "transition worker started");
        loop {
            interval.tick().await;
            if let Err(e) = self.tick(Utc::now()).await {
                tracing::error!(error = %e, "transition worker poll failed");
            }
        }
    }

    /// Applies every job due at `now` and returns how many were applied.
    ///
    /// Exposed separately from [`run`](Self::run) so the schedule can be
    /// driven deterministically in tests.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<usize, ScheduleError> {
        let due = self.jobs.due(now).await?;
        let mut applied = 0;

        for job in due {
            match self.workflow.update_status(job.order_id, job.target).await {
                Ok(_) => {
                    if let Some(follow_up) = job.follow_up {
                        self.jobs
                            .enqueue(ScheduledTransition::new(
                                job.order_id,
                                follow_up.status,
                                now,
                                follow_up.delay_secs,
                                None,
                            ))
                            .await?;
                    }
                    self.jobs.complete(job.id).await?;
                    metrics::counter!("scheduled_transitions_applied_total").increment(1);
                    applied += 1;
                }
                Err(WorkflowError::OrderNotFound(order_id)) => {
                    tracing::warn!(%order_id, job_id = %job.id, "dropping job for missing order");
                    self.jobs.complete(job.id).await?;
                }
                Err(WorkflowError::Order(e)) => {
                    // Terminal order; the scheduled progression no longer
                    // applies. Its follow-up is dropped with it.
                    tracing::debug!(
                        order_id = %job.order_id,
                        job_id = %job.id,
                        error = %e,
                        "dropping inapplicable job"
                    );
                    self.jobs.complete(job.id).await?;
                }
                Err(e) if job.attempts + 1 >= MAX_ATTEMPTS => {
                    metrics::counter!("scheduled_transitions_dropped_total").increment(1);
                    tracing::error!(
                        order_id = %job.order_id,
                        job_id = %job.id,
                        attempts = job.attempts + 1,
                        error = %e,
                        "dropping job after repeated failures"
                    );
                    self.jobs.complete(job.id).await?;
                }
                Err(e) => {
                    tracing::warn!(
                        order_id = %job.order_id,
                        job_id = %job.id,
                        error = %e,
                        "job failed, scheduling retry"
                    );
                    self.jobs
                        .retry(job.id, now + chrono::Duration::seconds(RETRY_DELAY_SECS))
                        .await?;
                }
            }
        }

        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{PaymentEvent, PaymentGateway};
    use crate::schedule::InMemoryJobStore;
    use common::{BusinessId, Money, OrderId, UnitId, UserId};
    use domain::OrderStatus;
    use order_store::InMemoryOrderStore;
    use workflow::{InMemoryInventoryService, InMemoryNotificationPublisher, NewOrderItem};

    struct Harness {
        gateway: PaymentGateway<InMemoryOrderStore>,
        worker: TransitionWorker<InMemoryOrderStore>,
        workflow: OrderWorkflow<InMemoryOrderStore>,
        jobs: InMemoryJobStore,
        order_id: OrderId,
    }

    async fn setup() -> Harness {
        let store = InMemoryOrderStore::new();
        let inventory = InMemoryInventoryService::new();
        inventory.add_unit(UnitId::new(1), Money::from_cents(1099), true);

        let workflow = OrderWorkflow::new(
            store,
            Arc::new(inventory),
            Arc::new(InMemoryNotificationPublisher::new()),
        );
        let jobs = InMemoryJobStore::new();
        let gateway = PaymentGateway::new(workflow.clone(), Arc::new(jobs.clone()), 30, 60);
        let worker = TransitionWorker::new(
            workflow.clone(),
            Arc::new(jobs.clone()),
            Duration::from_millis(100),
        );

        let order = workflow
            .create_order(
                UserId::new(1),
                BusinessId::new(2),
                vec![NewOrderItem {
                    unit_id: UnitId::new(1),
                    quantity: 1,
                    unit_price: None,
                }],
            )
            .await
            .unwrap();

        Harness {
            gateway,
            worker,
            workflow,
            jobs,
            order_id: order.id().unwrap(),
        }
    }

    fn approved(order_id: OrderId) -> PaymentEvent {
        PaymentEvent {
            order_id: order_id.to_string(),
            status: "approved".to_string(),
            payment_id: "pay_123".to_string(),
        }
    }

    async fn status(h: &Harness) -> OrderStatus {
        h.workflow.get_order(h.order_id).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_two_stage_progression() {
        let h = setup().await;
        let start = Utc::now();
        h.gateway.handle_event(approved(h.order_id)).await.unwrap();

        // Nothing is due before the first delay elapses.
        assert_eq!(h.worker.tick(start).await.unwrap(), 0);
        assert_eq!(status(&h).await, OrderStatus::Paid);

        // First delay: paid → ready, and the delivered follow-up is queued.
        let after_ready = start + chrono::Duration::seconds(31);
        assert_eq!(h.worker.tick(after_ready).await.unwrap(), 1);
        assert_eq!(status(&h).await, OrderStatus::Ready);
        assert_eq!(h.jobs.pending_count().await.unwrap(), 1);

        // Second delay: ready → delivered, queue drained.
        let after_delivered = after_ready + chrono::Duration::seconds(61);
        assert_eq!(h.worker.tick(after_delivered).await.unwrap(), 1);
        assert_eq!(status(&h).await, OrderStatus::Delivered);
        assert_eq!(h.jobs.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_jobs_survive_worker_restart() {
        let h = setup().await;
        let start = Utc::now();
        h.gateway.handle_event(approved(h.order_id)).await.unwrap();

        // A fresh worker over the same job store picks the queue up where
        // the previous process left it.
        drop(h.worker);
        let replacement = TransitionWorker::new(
            h.workflow.clone(),
            Arc::new(h.jobs.clone()),
            Duration::from_millis(100),
        );

        let after_ready = start + chrono::Duration::seconds(31);
        assert_eq!(replacement.tick(after_ready).await.unwrap(), 1);
        assert_eq!(
            h.workflow.get_order(h.order_id).await.unwrap().status(),
            OrderStatus::Ready
        );
    }

    #[tokio::test]
    async fn test_duplicate_jobs_apply_once() {
        let h = setup().await;
        let start = Utc::now();
        h.gateway.handle_event(approved(h.order_id)).await.unwrap();
        h.gateway.handle_event(approved(h.order_id)).await.unwrap();
        assert_eq!(h.jobs.pending_count().await.unwrap(), 2);

        let after_ready = start + chrono::Duration::seconds(31);
        assert_eq!(h.worker.tick(after_ready).await.unwrap(), 2);
        assert_eq!(status(&h).await, OrderStatus::Ready);

        // Both follow-ups fire; the second delivered apply is a no-op.
        let after_delivered = after_ready + chrono::Duration::seconds(61);
        assert_eq!(h.worker.tick(after_delivered).await.unwrap(), 2);
        assert_eq!(status(&h).await, OrderStatus::Delivered);
        assert_eq!(h.jobs.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_job_for_cancelled_order_is_dropped() {
        let h = setup().await;
        let start = Utc::now();
        h.gateway.handle_event(approved(h.order_id)).await.unwrap();
        h.workflow.cancel_order(h.order_id).await.unwrap();

        // Cancelled is terminal: the ready job no longer applies and must
        // not resurrect the order.
        let after_ready = start + chrono::Duration::seconds(31);
        assert_eq!(h.worker.tick(after_ready).await.unwrap(), 0);
        assert_eq!(status(&h).await, OrderStatus::Cancelled);
        assert_eq!(h.jobs.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_job_for_missing_order_is_dropped() {
        let h = setup().await;
        let now = Utc::now();
        h.jobs
            .enqueue(ScheduledTransition::new(
                OrderId::new(9999),
                OrderStatus::Ready,
                now,
                0,
                None,
            ))
            .await
            .unwrap();

        assert_eq!(h.worker.tick(now).await.unwrap(), 0);
        assert_eq!(h.jobs.pending_count().await.unwrap(), 0);
    }
}
