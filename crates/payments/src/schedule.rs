//! Durable delayed status transitions.
//!
//! The payment gateway does not sleep in-process to advance an order; it
//! persists a `ScheduledTransition` job and a worker polls the store for
//! due jobs. Jobs survive a process restart, and a job may carry one
//! follow-up transition that is enqueued when the job itself completes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::OrderId;
use domain::OrderStatus;
use sqlx::{PgPool, Row, postgres::PgRow};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ScheduleError;

/// The transition to enqueue once a job has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowUp {
    pub status: OrderStatus,
    pub delay_secs: i64,
}

/// A persisted "move order X to status Y at time T" job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTransition {
    pub id: Uuid,
    pub order_id: OrderId,
    pub target: OrderStatus,
    pub run_at: DateTime<Utc>,
    pub follow_up: Option<FollowUp>,
    pub attempts: i32,
}

impl ScheduledTransition {
    /// Creates a job due `delay_secs` after `now`.
    pub fn new(
        order_id: OrderId,
        target: OrderStatus,
        now: DateTime<Utc>,
        delay_secs: i64,
        follow_up: Option<FollowUp>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            target,
            run_at: now + Duration::seconds(delay_secs),
            follow_up,
            attempts: 0,
        }
    }
}

/// Storage for scheduled transitions.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persists a new job.
    async fn enqueue(&self, job: ScheduledTransition) -> Result<(), ScheduleError>;

    /// Returns every job due at or before `now`, oldest first.
    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledTransition>, ScheduleError>;

    /// Removes a finished (or abandoned) job.
    async fn complete(&self, id: Uuid) -> Result<(), ScheduleError>;

    /// Reschedules a failed job, bumping its attempt counter.
    async fn retry(&self, id: Uuid, run_at: DateTime<Utc>) -> Result<(), ScheduleError>;

    /// Number of jobs currently queued.
    async fn pending_count(&self) -> Result<usize, ScheduleError>;
}

/// In-memory job store for tests and local development.
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobStore {
    jobs: Arc<RwLock<HashMap<Uuid, ScheduledTransition>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn enqueue(&self, job: ScheduledTransition) -> Result<(), ScheduleError> {
        self.jobs.write().await.insert(job.id, job);
        Ok(())
    }

    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledTransition>, ScheduleError> {
        let jobs = self.jobs.read().await;
        let mut due: Vec<ScheduledTransition> = jobs
            .values()
            .filter(|job| job.run_at <= now)
            .cloned()
            .collect();
        due.sort_by_key(|job| job.run_at);
        Ok(due)
    }

    async fn complete(&self, id: Uuid) -> Result<(), ScheduleError> {
        self.jobs
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(ScheduleError::JobNotFound(id))
    }

    async fn retry(&self, id: Uuid, run_at: DateTime<Utc>) -> Result<(), ScheduleError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(ScheduleError::JobNotFound(id))?;
        job.run_at = run_at;
        job.attempts += 1;
        Ok(())
    }

    async fn pending_count(&self) -> Result<usize, ScheduleError> {
        Ok(self.jobs.read().await.len())
    }
}

/// PostgreSQL-backed job store over the `scheduled_transitions` table.
#[derive(Debug, Clone)]
pub struct PostgresJobStore {
    pool: PgPool,
}

impl PostgresJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_job(row: &PgRow) -> Result<ScheduledTransition, ScheduleError> {
        let target: String = row.get("target_status");
        let target = OrderStatus::from_stored(&target)
            .map_err(|e| ScheduleError::InvalidRow(e.to_string()))?;

        let follow_up_status: Option<String> = row.get("follow_up_status");
        let follow_up_delay: Option<i64> = row.get("follow_up_delay_secs");
        let follow_up = match (follow_up_status, follow_up_delay) {
            (Some(status), Some(delay_secs)) => Some(FollowUp {
                status: OrderStatus::from_stored(&status)
                    .map_err(|e| ScheduleError::InvalidRow(e.to_string()))?,
                delay_secs,
            }),
            (None, None) => None,
            _ => {
                return Err(ScheduleError::InvalidRow(
                    "follow-up status and delay must be set together".to_string(),
                ));
            }
        };

        Ok(ScheduledTransition {
            id: row.get("id"),
            order_id: OrderId::new(row.get("order_id")),
            target,
            run_at: row.get("run_at"),
            follow_up,
            attempts: row.get("attempts"),
        })
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn enqueue(&self, job: ScheduledTransition) -> Result<(), ScheduleError> {
        sqlx::query(
            r#"
            INSERT INTO scheduled_transitions
                (id, order_id, target_status, run_at, follow_up_status, follow_up_delay_secs, attempts)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(job.id)
        .bind(job.order_id.as_i64())
        .bind(job.target.as_str())
        .bind(job.run_at)
        .bind(job.follow_up.map(|f| f.status.as_str()))
        .bind(job.follow_up.map(|f| f.delay_secs))
        .bind(job.attempts)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledTransition>, ScheduleError> {
        let rows = sqlx::query(
            "SELECT * FROM scheduled_transitions WHERE run_at <= $1 ORDER BY run_at, id",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_job).collect()
    }

    async fn complete(&self, id: Uuid) -> Result<(), ScheduleError> {
        let result = sqlx::query("DELETE FROM scheduled_transitions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ScheduleError::JobNotFound(id));
        }
        Ok(())
    }

    async fn retry(&self, id: Uuid, run_at: DateTime<Utc>) -> Result<(), ScheduleError> {
        let result = sqlx::query(
            "UPDATE scheduled_transitions SET run_at = $2, attempts = attempts + 1 WHERE id = $1",
        )
        .bind(id)
        .bind(run_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(ScheduleError::JobNotFound(id));
        }
        Ok(())
    }

    async fn pending_count(&self) -> Result<usize, ScheduleError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM scheduled_transitions")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.get("count");
        Ok(count as usize)
    }
}
