//! Runs one transform job to a terminal outcome.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use afx_media::{filter_chain, output_filename, TransformTool};
use afx_models::{HistoryEntry, JobOutcome};
use afx_queue::TransformJob;
use afx_storage::{BlobStore, FileRefs, HistorySink};

use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;

/// Prefix of every failure detail.
pub const FAILURE_PREFIX: &str = "Error processing file";

/// Everything a job needs besides the job itself.
#[derive(Clone)]
pub struct AudioProcessor {
    tool: Arc<dyn TransformTool>,
    blobs: BlobStore,
    file_refs: FileRefs,
    history: Arc<dyn HistorySink>,
    output_ref_ttl: Duration,
}

impl AudioProcessor {
    pub fn new(
        tool: Arc<dyn TransformTool>,
        blobs: BlobStore,
        file_refs: FileRefs,
        history: Arc<dyn HistorySink>,
        output_ref_ttl: Duration,
    ) -> Self {
        Self {
            tool,
            blobs,
            file_refs,
            history,
            output_ref_ttl,
        }
    }

    /// Execute `job`: received, tool-invoked, then completed or errored.
    ///
    /// Every failure becomes a `Failure` outcome; nothing is retried here.
    pub async fn execute(&self, job: &TransformJob) -> JobOutcome {
        let logger = JobLogger::new(job);
        let started = std::time::Instant::now();

        let outcome = match self.run(job, &logger).await {
            Ok(output_path) => {
                let output_path = output_path.to_string_lossy().to_string();
                logger.log_completed(&output_path);
                JobOutcome::success(output_path)
            }
            Err(e) => {
                let detail = format!("{FAILURE_PREFIX}: {}", e.detail());
                logger.log_errored(&detail);
                JobOutcome::failure(detail)
            }
        };

        metrics::counter!(
            "afx_jobs_total",
            "function" => job.function.clone(),
            "status" => outcome.as_str()
        )
        .increment(1);
        metrics::histogram!("afx_job_duration_seconds", "function" => job.function.clone())
            .record(started.elapsed().as_secs_f64());

        outcome
    }

    async fn run(&self, job: &TransformJob, logger: &JobLogger) -> WorkerResult<PathBuf> {
        // received
        if let Some(argument) = job.missing_argument() {
            return Err(WorkerError::invalid_job(format!("missing argument {argument}")));
        }
        logger.log_received(&job.source_path);

        let input = Path::new(&job.source_path);
        let kind = job.params.kind();
        let output_name = output_filename(input, kind)?;
        let output_path = self.blobs.processed_path(&output_name);

        // tool-invoked
        logger.log_tool_invoked(&filter_chain(&job.params), &output_path.to_string_lossy());
        self.tool
            .transform(input, &output_path, &job.params)
            .await?;

        // completed
        self.file_refs
            .register(&job.user_id, &output_name, &output_path, self.output_ref_ttl)
            .await?;

        let original_filename = input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| job.source_path.clone());
        let entry = HistoryEntry::new(&job.user_id, original_filename, &output_name, &job.params);
        self.history.append(&entry).await?;

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{processor_fixture, ScriptedTool};
    use afx_models::{EffectKind, EffectParams};
    use afx_storage::{HistorySink, MemoryHistory};

    #[tokio::test]
    async fn test_success_writes_reference_and_history() {
        let fx = processor_fixture(ScriptedTool::succeeding());
        let input = fx.write_input("track_0123456789ab").await;
        let job = TransformJob::new(
            "alice",
            input.to_string_lossy(),
            EffectParams::Slowed {
                speed: 0.8,
                reverb_amount: 30.0,
                volume: 0.8,
            },
        );

        let outcome = fx.processor.execute(&job).await;

        let expected = fx.blobs.processed_path("track_0123456789ab_slowed_reverb.mp3");
        assert_eq!(outcome, JobOutcome::success(expected.to_string_lossy()));
        assert!(expected.exists());

        assert_eq!(
            fx.file_refs
                .resolve("alice", "track_0123456789ab_slowed_reverb.mp3")
                .await
                .unwrap(),
            Some(expected)
        );

        let history = fx.history.list("alice").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].original_filename, "track_0123456789ab.mp3");
        assert_eq!(history[0].effect_type, EffectKind::Slowed);
        assert_eq!(history[0].parameters["reverb_amount"], 30.0);
        assert_eq!(fx.tool.calls(), 1);
    }

    #[tokio::test]
    async fn test_tool_failure_leaves_no_history() {
        let fx = processor_fixture(ScriptedTool::failing("Invalid data found when processing input"));
        let input = fx.write_input("broken_0123456789ab").await;
        let job = TransformJob::new("alice", input.to_string_lossy(), EffectParams::defaults(EffectKind::Speedup));

        let outcome = fx.processor.execute(&job).await;

        match outcome {
            JobOutcome::Failure { detail } => {
                assert!(detail.starts_with("Error processing file: "));
                assert!(detail.contains("exit code 1"));
                assert!(detail.contains("Invalid data found"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(fx.history.is_empty());
        assert_eq!(
            fx.file_refs
                .resolve("alice", "broken_0123456789ab_speedup.mp3")
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_missing_argument_fails_before_tool() {
        let fx = processor_fixture(ScriptedTool::succeeding());
        let mut job = TransformJob::new("alice", "/in.mp3", EffectParams::defaults(EffectKind::Speedup));
        job.user_id.clear();

        let outcome = fx.processor.execute(&job).await;

        assert_eq!(
            outcome,
            JobOutcome::failure("Error processing file: Invalid job: missing argument user_id")
        );
        assert_eq!(fx.tool.calls(), 0);
    }

    #[tokio::test]
    async fn test_rerun_overwrites_same_artifact() {
        let fx = processor_fixture(ScriptedTool::succeeding());
        let input = fx.write_input("loop_0123456789ab").await;
        let job = TransformJob::new("alice", input.to_string_lossy(), EffectParams::defaults(EffectKind::Nightcore));

        let first = fx.processor.execute(&job).await;
        let second = fx.processor.execute(&job).await;
        assert_eq!(first, second);

        let history: &MemoryHistory = &fx.history;
        assert_eq!(history.len(), 2);
    }
}
