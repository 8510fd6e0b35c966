//! FFmpeg CLI wrapper for audio effects.
//!
//! This crate provides:
//! - Filter chains for each effect kind
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2` and bounded stderr diagnostics
//! - A timeout-bounded runner and the [`TransformTool`] seam used by the worker

pub mod command;
pub mod error;
pub mod filters;
pub mod naming;
pub mod progress;
pub mod tool;

pub use command::{check_ffmpeg, effect_command, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use filters::{echo_delay_ms, filter_chain};
pub use naming::output_filename;
pub use progress::FfmpegProgress;
pub use tool::{FfmpegTool, TransformTool};
