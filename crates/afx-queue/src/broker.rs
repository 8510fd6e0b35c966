//! Broker seam shared by the API and the worker.

use std::time::Duration;

use async_trait::async_trait;

use afx_models::{JobId, JobOutcome, JobPoll};

use crate::error::QueueResult;
use crate::job::{Delivery, TransformJob};

/// At-least-once job distribution plus a result backend.
#[async_trait]
pub trait JobBroker: Send + Sync {
    /// Record the job as pending and append it to the queue.
    async fn enqueue(&self, job: &TransformJob) -> QueueResult<JobId>;

    /// Current state of a job.
    async fn poll(&self, job_id: &JobId) -> QueueResult<JobPoll>;

    /// Wait up to `block` for the next new job for `consumer`.
    async fn consume(&self, consumer: &str, block: Duration) -> QueueResult<Option<Delivery>>;

    /// Take over deliveries left unacknowledged for at least `min_idle`.
    async fn claim_stale(
        &self,
        consumer: &str,
        min_idle: Duration,
        count: usize,
    ) -> QueueResult<Vec<Delivery>>;

    /// Store the terminal outcome. Returns whether this call wrote it.
    async fn publish_result(&self, job_id: &JobId, outcome: &JobOutcome) -> QueueResult<bool>;

    /// Mark a delivery as done so it is never redelivered.
    async fn ack(&self, delivery: &Delivery) -> QueueResult<()>;
}
