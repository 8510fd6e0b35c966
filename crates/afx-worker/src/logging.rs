//! Structured per-job logging.

use std::time::Instant;

use tracing::{error, info, warn, Span};

use afx_queue::TransformJob;

/// Logs one job's state transitions with its id, function and user attached.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    function: String,
    user_id: String,
    started: Instant,
}

impl JobLogger {
    pub fn new(job: &TransformJob) -> Self {
        Self {
            job_id: job.job_id.to_string(),
            function: job.function.clone(),
            user_id: job.user_id.clone(),
            started: Instant::now(),
        }
    }

    /// Job taken off the queue.
    pub fn log_received(&self, source_path: &str) {
        info!(
            job_id = %self.job_id,
            function = %self.function,
            user_id = %self.user_id,
            source = %source_path,
            "Job received"
        );
    }

    /// Transform tool about to run.
    pub fn log_tool_invoked(&self, filter_chain: &str, output: &str) {
        info!(
            job_id = %self.job_id,
            function = %self.function,
            filter_chain = %filter_chain,
            output = %output,
            "Invoking transform tool"
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            function = %self.function,
            "Job warning: {}", message
        );
    }

    pub fn log_completed(&self, output_path: &str) {
        info!(
            job_id = %self.job_id,
            function = %self.function,
            output = %output_path,
            elapsed_ms = self.elapsed_ms(),
            "Job completed"
        );
    }

    pub fn log_errored(&self, detail: &str) {
        error!(
            job_id = %self.job_id,
            function = %self.function,
            elapsed_ms = self.elapsed_ms(),
            "Job failed: {}", detail
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Span covering the whole execution.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            function = %self.function,
            user_id = %self.user_id
        )
    }
}
