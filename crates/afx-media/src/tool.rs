//! External transform tool seam.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use afx_models::EffectParams;

use crate::command::{effect_command, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::filter_chain;

/// Applies an effect to one input file, writing one output file.
#[async_trait]
pub trait TransformTool: Send + Sync {
    async fn transform(&self, input: &Path, output: &Path, params: &EffectParams) -> MediaResult<()>;
}

/// `ffmpeg`-backed transform.
#[derive(Debug, Clone)]
pub struct FfmpegTool {
    runner: FfmpegRunner,
}

impl FfmpegTool {
    pub fn new(timeout: Duration) -> Self {
        Self {
            runner: FfmpegRunner::new().with_timeout(timeout),
        }
    }

    /// Use a specific executable instead of `ffmpeg` from PATH.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.runner = self.runner.with_program(program);
        self
    }
}

#[async_trait]
impl TransformTool for FfmpegTool {
    async fn transform(&self, input: &Path, output: &Path, params: &EffectParams) -> MediaResult<()> {
        if !tokio::fs::try_exists(input).await.unwrap_or(false) {
            return Err(MediaError::FileNotFound(input.to_path_buf()));
        }

        let chain = filter_chain(params);
        let cmd = effect_command(input, output, &chain);
        let effect = params.kind().as_str();

        let started = Instant::now();
        let result = self
            .runner
            .run_with_progress(&cmd, |progress| {
                debug!(
                    out_time_ms = progress.out_time_ms,
                    speed = progress.speed,
                    complete = progress.is_complete,
                    "ffmpeg progress"
                );
            })
            .await;

        let status = if result.is_ok() { "success" } else { "failure" };
        metrics::histogram!("afx_ffmpeg_duration_seconds", "effect" => effect, "status" => status)
            .record(started.elapsed().as_secs_f64());

        result
    }
}
