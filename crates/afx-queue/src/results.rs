//! Result backend: pending markers and write-once terminal results.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use afx_models::{JobId, JobOutcome, JobPoll};
use afx_storage::{keys, EphemeralStore};

use crate::error::QueueResult;

const PENDING_MARKER: &str = "pending";

/// Tracks job state in the ephemeral store.
#[derive(Clone)]
pub struct ResultBackend {
    store: Arc<dyn EphemeralStore>,
    retention: Duration,
}

impl ResultBackend {
    pub fn new(store: Arc<dyn EphemeralStore>, retention: Duration) -> Self {
        Self { store, retention }
    }

    /// Record that `job_id` exists and has not finished.
    pub async fn mark_pending(&self, job_id: &JobId) -> QueueResult<()> {
        self.store
            .put(&keys::job_marker(job_id.as_str()), PENDING_MARKER, self.retention)
            .await?;
        Ok(())
    }

    /// Current state of `job_id`.
    pub async fn poll(&self, job_id: &JobId) -> QueueResult<JobPoll> {
        if let Some(raw) = self.store.get(&keys::job_result(job_id.as_str())).await? {
            let outcome: JobOutcome = serde_json::from_str(&raw)?;
            return Ok(JobPoll::Finished(outcome));
        }

        match self.store.get(&keys::job_marker(job_id.as_str())).await? {
            Some(_) => Ok(JobPoll::Pending),
            None => Ok(JobPoll::NotFound),
        }
    }

    /// Store the terminal outcome unless one is already stored.
    ///
    /// Returns `false` when an earlier outcome won; that outcome is kept.
    pub async fn publish(&self, job_id: &JobId, outcome: &JobOutcome) -> QueueResult<bool> {
        let payload = serde_json::to_string(outcome)?;
        let written = self
            .store
            .put_if_absent(&keys::job_result(job_id.as_str()), &payload, self.retention)
            .await?;
        if !written {
            debug!(job_id = %job_id, "Result already published, keeping the first");
        }
        Ok(written)
    }
}
