//! In-process broker with the same delivery semantics as the Redis queue.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::debug;

use afx_models::{JobId, JobOutcome, JobPoll};
use afx_storage::EphemeralStore;

use crate::broker::JobBroker;
use crate::error::QueueResult;
use crate::job::{Delivery, TransformJob};
use crate::results::ResultBackend;

struct PendingEntry {
    delivery: Delivery,
    consumer: String,
    delivered_at: Instant,
}

#[derive(Default)]
struct Inner {
    next_seq: u64,
    ready: VecDeque<Delivery>,
    pending: HashMap<String, PendingEntry>,
}

/// Queue held in memory; used by tests and single-process setups.
pub struct MemoryJobQueue {
    inner: Mutex<Inner>,
    notify: Notify,
    results: ResultBackend,
}

impl MemoryJobQueue {
    pub fn new(store: Arc<dyn EphemeralStore>, retention: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            notify: Notify::new(),
            results: ResultBackend::new(store, retention),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Jobs enqueued but not yet delivered.
    pub fn ready_len(&self) -> usize {
        self.inner().ready.len()
    }

    /// Jobs delivered but not yet acknowledged.
    pub fn pending_len(&self) -> usize {
        self.inner().pending.len()
    }

    fn try_take(&self, consumer: &str) -> Option<Delivery> {
        let mut inner = self.inner();
        let delivery = inner.ready.pop_front()?;
        inner.pending.insert(
            delivery.message_id.clone(),
            PendingEntry {
                delivery: delivery.clone(),
                consumer: consumer.to_string(),
                delivered_at: Instant::now(),
            },
        );
        Some(delivery)
    }
}

#[async_trait]
impl JobBroker for MemoryJobQueue {
    async fn enqueue(&self, job: &TransformJob) -> QueueResult<JobId> {
        self.results.mark_pending(&job.job_id).await?;

        {
            let mut inner = self.inner();
            inner.next_seq += 1;
            let message_id = format!("{}-0", inner.next_seq);
            inner.ready.push_back(Delivery {
                message_id,
                job: job.clone(),
            });
        }
        self.notify.notify_one();

        debug!(job_id = %job.job_id, function = %job.function, "Enqueued job");
        Ok(job.job_id.clone())
    }

    async fn poll(&self, job_id: &JobId) -> QueueResult<JobPoll> {
        self.results.poll(job_id).await
    }

    async fn consume(&self, consumer: &str, block: Duration) -> QueueResult<Option<Delivery>> {
        let deadline = tokio::time::Instant::now() + block;
        loop {
            if let Some(delivery) = self.try_take(consumer) {
                return Ok(Some(delivery));
            }
            if tokio::time::timeout_at(deadline, self.notify.notified())
                .await
                .is_err()
            {
                return Ok(self.try_take(consumer));
            }
        }
    }

    async fn claim_stale(
        &self,
        consumer: &str,
        min_idle: Duration,
        count: usize,
    ) -> QueueResult<Vec<Delivery>> {
        let mut inner = self.inner();
        let now = Instant::now();

        let mut stale: Vec<&mut PendingEntry> = inner
            .pending
            .values_mut()
            .filter(|entry| now.duration_since(entry.delivered_at) >= min_idle)
            .collect();
        stale.sort_by(|a, b| a.delivered_at.cmp(&b.delivered_at));

        Ok(stale
            .into_iter()
            .take(count)
            .map(|entry| {
                debug!(
                    job_id = %entry.delivery.job.job_id,
                    from = %entry.consumer,
                    to = %consumer,
                    "Claimed stale job"
                );
                entry.consumer = consumer.to_string();
                entry.delivered_at = now;
                entry.delivery.clone()
            })
            .collect())
    }

    async fn publish_result(&self, job_id: &JobId, outcome: &JobOutcome) -> QueueResult<bool> {
        self.results.publish(job_id, outcome).await
    }

    async fn ack(&self, delivery: &Delivery) -> QueueResult<()> {
        self.inner().pending.remove(&delivery.message_id);
        Ok(())
    }
}
