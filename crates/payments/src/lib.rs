//! Payment-event gateway and the durable delayed-progression scheduler.
//!
//! A confirmed payment marks the order paid, deactivates its inventory
//! units, and queues a two-stage `ready` then `delivered` progression as
//! persisted jobs. A polling worker applies due jobs idempotently, so the
//! progression survives restarts and tolerates webhook redelivery.

mod error;
mod gateway;
mod schedule;
mod worker;

pub use error::{GatewayError, Result, ScheduleError};
pub use gateway::{PaymentEvent, PaymentGateway, PaymentOutcome, PaymentStatus};
pub use schedule::{
    FollowUp, InMemoryJobStore, JobStore, PostgresJobStore, ScheduledTransition,
};
pub use worker::TransitionWorker;
