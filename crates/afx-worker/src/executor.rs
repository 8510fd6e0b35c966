//! Job executor.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use afx_models::JobPoll;
use afx_queue::{Delivery, JobBroker};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::logging::JobLogger;
use crate::processor::AudioProcessor;

/// Pulls jobs one at a time and runs them to a published result.
pub struct JobExecutor {
    config: WorkerConfig,
    broker: Arc<dyn JobBroker>,
    processor: AudioProcessor,
    shutdown: watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    pub fn new(config: WorkerConfig, broker: Arc<dyn JobBroker>, processor: AudioProcessor) -> Self {
        let (shutdown, _) = watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            broker,
            processor,
            shutdown,
            consumer_name,
        }
    }

    pub fn consumer_name(&self) -> &str {
        &self.consumer_name
    }

    /// Stop taking new jobs; the job in progress finishes first.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Consume until shutdown.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(consumer = %self.consumer_name, "Starting job executor");

        let mut shutdown_rx = self.shutdown.subscribe();
        let mut last_claim: Option<Instant> = None;

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            if last_claim.map_or(true, |at| at.elapsed() >= self.config.claim_interval) {
                self.reclaim_stale().await;
                last_claim = Some(Instant::now());
            }

            // A read cancelled here stays pending and is reclaimed later.
            let next = tokio::select! {
                _ = shutdown_rx.changed() => continue,
                next = self.broker.consume(&self.consumer_name, self.config.consume_block) => next,
            };

            match next {
                Ok(Some(delivery)) => self.handle(delivery).await,
                Ok(None) => {}
                Err(e) => {
                    error!("Error consuming jobs: {}", e);
                    tokio::time::sleep(self.config.error_backoff).await;
                }
            }
        }

        info!(consumer = %self.consumer_name, "Job executor stopped");
        Ok(())
    }

    /// Run deliveries abandoned by crashed workers.
    async fn reclaim_stale(&self) {
        match self
            .broker
            .claim_stale(
                &self.consumer_name,
                self.config.claim_min_idle,
                self.config.claim_batch,
            )
            .await
        {
            Ok(deliveries) if !deliveries.is_empty() => {
                info!("Claimed {} stale jobs", deliveries.len());
                for delivery in deliveries {
                    self.handle(delivery).await;
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to claim stale jobs: {}", e),
        }
    }

    /// Execute one delivery, publish its outcome, then acknowledge it.
    ///
    /// A job that already has a result is acknowledged without running again.
    /// When publishing fails the delivery stays unacknowledged.
    async fn handle(&self, delivery: Delivery) {
        let job_id = delivery.job.job_id.clone();

        match self.broker.poll(&job_id).await {
            Ok(JobPoll::Finished(outcome)) => {
                info!(
                    job_id = %job_id,
                    status = outcome.as_str(),
                    "Job already finished, acknowledging redelivery"
                );
                self.ack(&delivery).await;
                return;
            }
            Ok(_) => {}
            Err(e) => warn!(job_id = %job_id, "Could not check previous result: {}", e),
        }

        debug!(job_id = %job_id, message_id = %delivery.message_id, "Executing job");
        let span = JobLogger::new(&delivery.job).create_span();
        let outcome = self.processor.execute(&delivery.job).instrument(span).await;

        match self.broker.publish_result(&job_id, &outcome).await {
            Ok(true) => {}
            Ok(false) => info!(job_id = %job_id, "Result was already published"),
            Err(e) => {
                error!(job_id = %job_id, "Failed to publish result: {}", e);
                return;
            }
        }

        self.ack(&delivery).await;
    }

    async fn ack(&self, delivery: &Delivery) {
        if let Err(e) = self.broker.ack(delivery).await {
            error!(job_id = %delivery.job.job_id, "Failed to ack job: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use afx_models::{EffectKind, EffectParams, JobOutcome};
    use afx_queue::{MemoryJobQueue, TransformJob};
    use afx_storage::HistorySink;

    use crate::test_support::{processor_fixture, ProcessorFixture, ScriptedTool};

    fn test_config() -> WorkerConfig {
        WorkerConfig {
            consume_block: Duration::from_millis(20),
            claim_interval: Duration::from_millis(50),
            claim_min_idle: Duration::from_secs(60),
            ..Default::default()
        }
    }

    fn executor(fx: &ProcessorFixture) -> (Arc<MemoryJobQueue>, Arc<JobExecutor>) {
        let queue = Arc::new(MemoryJobQueue::new(fx.store.clone(), Duration::from_secs(60)));
        let executor = Arc::new(JobExecutor::new(
            test_config(),
            queue.clone(),
            fx.processor.clone(),
        ));
        (queue, executor)
    }

    async fn wait_terminal(queue: &MemoryJobQueue, job_id: &afx_models::JobId) -> JobOutcome {
        for _ in 0..200 {
            if let JobPoll::Finished(outcome) = queue.poll(job_id).await.unwrap() {
                return outcome;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {job_id} never finished");
    }

    #[tokio::test]
    async fn test_runs_job_and_acks() {
        let fx = processor_fixture(ScriptedTool::succeeding());
        let (queue, executor) = executor(&fx);
        let runner = {
            let executor = executor.clone();
            tokio::spawn(async move { executor.run().await })
        };

        let input = fx.write_input("song_0123456789ab").await;
        let job = TransformJob::new("alice", input.to_string_lossy(), EffectParams::defaults(EffectKind::Speedup));
        let job_id = queue.enqueue(&job).await.unwrap();

        let outcome = wait_terminal(&queue, &job_id).await;
        assert!(outcome.is_success());

        executor.shutdown();
        tokio_test::assert_ok!(runner.await.unwrap());
        assert_eq!(queue.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_redelivered_finished_job_is_not_rerun() {
        let fx = processor_fixture(ScriptedTool::succeeding());
        let (queue, executor) = executor(&fx);

        let input = fx.write_input("song_0123456789ab").await;
        let job = TransformJob::new("alice", input.to_string_lossy(), EffectParams::defaults(EffectKind::Nightcore));
        queue.enqueue(&job).await.unwrap();

        let first = queue.consume("w1", Duration::from_millis(10)).await.unwrap().unwrap();
        executor.handle(first.clone()).await;
        assert_eq!(fx.tool.calls(), 1);

        // Same delivery handed out again, as after a crash between publish and ack.
        executor.handle(first).await;
        assert_eq!(fx.tool.calls(), 1);
        assert_eq!(fx.history.list("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_job_publishes_failure() {
        let fx = processor_fixture(ScriptedTool::failing("Conversion failed!"));
        let (queue, executor) = executor(&fx);

        let input = fx.write_input("song_0123456789ab").await;
        let job = TransformJob::new("alice", input.to_string_lossy(), EffectParams::defaults(EffectKind::AllEffects));
        let job_id = queue.enqueue(&job).await.unwrap();

        let delivery = queue.consume("w1", Duration::from_millis(10)).await.unwrap().unwrap();
        executor.handle(delivery).await;

        match queue.poll(&job_id).await.unwrap() {
            JobPoll::Finished(JobOutcome::Failure { detail }) => {
                assert!(detail.contains("Conversion failed!"))
            }
            other => panic!("unexpected poll: {other:?}"),
        }
        assert_eq!(queue.pending_len(), 0);
        assert!(fx.history.is_empty());
    }

    #[tokio::test]
    async fn test_reclaims_abandoned_delivery() {
        let fx = processor_fixture(ScriptedTool::succeeding());
        let queue = Arc::new(MemoryJobQueue::new(fx.store.clone(), Duration::from_secs(60)));
        let executor = Arc::new(JobExecutor::new(
            WorkerConfig {
                claim_min_idle: Duration::from_millis(10),
                ..test_config()
            },
            queue.clone(),
            fx.processor.clone(),
        ));

        let input = fx.write_input("song_0123456789ab").await;
        let job = TransformJob::new("alice", input.to_string_lossy(), EffectParams::defaults(EffectKind::Speedup));
        let job_id = queue.enqueue(&job).await.unwrap();

        // A worker that takes the job and dies.
        queue.consume("crashed", Duration::from_millis(10)).await.unwrap().unwrap();

        let runner = {
            let executor = executor.clone();
            tokio::spawn(async move { executor.run().await })
        };

        assert!(wait_terminal(&queue, &job_id).await.is_success());
        executor.shutdown();
        tokio_test::assert_ok!(runner.await.unwrap());
        assert_eq!(queue.pending_len(), 0);
    }
}
