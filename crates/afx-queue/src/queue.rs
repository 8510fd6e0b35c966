//! Job queue using Redis Streams.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamClaimReply, StreamId, StreamPendingCountReply, StreamReadReply};
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use afx_models::{JobId, JobOutcome, JobPoll};
use afx_storage::EphemeralStore;

use crate::broker::JobBroker;
use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};
use crate::job::{Delivery, TransformJob};
use crate::results::ResultBackend;

/// Redis Streams broker; results live in the ephemeral store.
pub struct JobQueue {
    conn: MultiplexedConnection,
    config: QueueConfig,
    results: ResultBackend,
}

impl JobQueue {
    /// Connect to Redis.
    pub async fn connect(config: QueueConfig, store: Arc<dyn EphemeralStore>) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::connection_failed(e.to_string()))?;
        let results = ResultBackend::new(store, config.result_retention);
        Ok(Self {
            conn,
            config,
            results,
        })
    }

    /// Initialize the queue (create consumer group if not exists).
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.conn.clone();

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("Created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("Consumer group already exists: {}", self.config.consumer_group);
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    /// Get queue length.
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.conn.clone();
        let len: u64 = conn.xlen(&self.config.stream_name).await?;
        Ok(len)
    }

    /// Parse stream entries, acknowledging any that cannot be decoded.
    async fn decode_entries(&self, entries: Vec<StreamId>) -> Vec<Delivery> {
        let mut deliveries = Vec::with_capacity(entries.len());

        for entry in entries {
            let parsed = entry
                .get::<String>("job")
                .ok_or_else(|| QueueError::invalid_job("missing job field"))
                .and_then(|payload| {
                    serde_json::from_str::<TransformJob>(&payload).map_err(QueueError::from)
                });

            match parsed {
                Ok(job) => deliveries.push(Delivery {
                    message_id: entry.id,
                    job,
                }),
                Err(e) => {
                    warn!(message_id = %entry.id, "Dropping malformed job payload: {}", e);
                    self.xack_del(&entry.id).await.ok();
                }
            }
        }

        deliveries
    }

    async fn xack_del(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.conn.clone();

        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl JobBroker for JobQueue {
    async fn enqueue(&self, job: &TransformJob) -> QueueResult<JobId> {
        let payload = serde_json::to_string(job)?;

        self.results.mark_pending(&job.job_id).await?;

        let mut conn = self.conn.clone();
        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("function")
            .arg(&job.function)
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::enqueue_failed(e.to_string()))?;

        info!(
            job_id = %job.job_id,
            function = %job.function,
            message_id = %message_id,
            "Enqueued job"
        );

        Ok(job.job_id.clone())
    }

    async fn poll(&self, job_id: &JobId) -> QueueResult<JobPoll> {
        self.results.poll(job_id).await
    }

    async fn consume(&self, consumer: &str, block: Duration) -> QueueResult<Option<Delivery>> {
        let mut conn = self.conn.clone();

        let reply: Option<StreamReadReply> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer)
            .arg("COUNT")
            .arg(1)
            .arg("BLOCK")
            .arg(block.as_millis() as u64)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">")
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::DequeueFailed(e.to_string()))?;

        let entries: Vec<StreamId> = reply
            .map(|r| r.keys.into_iter().flat_map(|k| k.ids).collect())
            .unwrap_or_default();

        let delivery = self.decode_entries(entries).await.into_iter().next();
        if let Some(ref d) = delivery {
            debug!(job_id = %d.job.job_id, "Consumed job from stream");
        }
        Ok(delivery)
    }

    async fn claim_stale(
        &self,
        consumer: &str,
        min_idle: Duration,
        count: usize,
    ) -> QueueResult<Vec<Delivery>> {
        let mut conn = self.conn.clone();
        let min_idle_ms = min_idle.as_millis() as u64;

        let pending: StreamPendingCountReply = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("IDLE")
            .arg(min_idle_ms)
            .arg("-")
            .arg("+")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        if pending.ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut cmd = redis::cmd("XCLAIM");
        cmd.arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer)
            .arg(min_idle_ms);
        for entry in &pending.ids {
            cmd.arg(&entry.id);
        }
        let claimed: StreamClaimReply = cmd.query_async(&mut conn).await?;

        let deliveries = self.decode_entries(claimed.ids).await;
        for d in &deliveries {
            info!(job_id = %d.job.job_id, message_id = %d.message_id, "Claimed stale job");
        }
        Ok(deliveries)
    }

    async fn publish_result(&self, job_id: &JobId, outcome: &JobOutcome) -> QueueResult<bool> {
        self.results.publish(job_id, outcome).await
    }

    async fn ack(&self, delivery: &Delivery) -> QueueResult<()> {
        self.xack_del(&delivery.message_id).await?;
        debug!(job_id = %delivery.job.job_id, "Acknowledged job");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afx_models::{EffectKind, EffectParams};
    use afx_storage::RedisStore;

    #[tokio::test]
    #[ignore = "requires a running Redis at REDIS_URL"]
    async fn test_redis_stream_lifecycle() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let config = QueueConfig {
            redis_url: url.clone(),
            stream_name: format!("afx:test:jobs:{suffix}"),
            consumer_group: format!("afx:test:workers:{suffix}"),
            ..Default::default()
        };
        let store = Arc::new(RedisStore::connect(&url).await.unwrap());
        let queue = JobQueue::connect(config, store).await.unwrap();
        queue.init().await.unwrap();
        queue.init().await.unwrap();

        let job = TransformJob::new("u1", "/in.mp3", EffectParams::defaults(EffectKind::Speedup));
        let job_id = queue.enqueue(&job).await.unwrap();
        assert_eq!(queue.poll(&job_id).await.unwrap(), JobPoll::Pending);

        let delivery = queue
            .consume("c1", Duration::from_millis(500))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivery.job, job);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let stolen = queue
            .claim_stale("c2", Duration::from_millis(10), 10)
            .await
            .unwrap();
        assert_eq!(stolen.len(), 1);

        assert!(queue
            .publish_result(&job_id, &JobOutcome::success("/out.mp3"))
            .await
            .unwrap());
        queue.ack(&stolen[0]).await.unwrap();
        assert!(queue.poll(&job_id).await.unwrap().is_terminal());
        assert_eq!(queue.len().await.unwrap(), 0);
    }
}
