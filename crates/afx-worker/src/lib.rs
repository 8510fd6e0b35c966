//! Audio effects worker.
//!
//! This crate provides:
//! - Job executor with stale-delivery reclaim and graceful shutdown
//! - Audio processor running the transform tool and recording results
//! - Structured per-job logging

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod processor;

#[cfg(test)]
mod test_support;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
pub use processor::AudioProcessor;
