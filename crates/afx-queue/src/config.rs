//! Queue configuration.

use std::time::Duration;

/// Default retention of job markers and results (24 hours).
pub const DEFAULT_RESULT_RETENTION_SECS: u64 = 86400;

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream name for jobs
    pub stream_name: String,
    /// Consumer group name
    pub consumer_group: String,
    /// How long job markers and results are kept
    pub result_retention: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "afx:jobs".to_string(),
            consumer_group: "afx:workers".to_string(),
            result_retention: Duration::from_secs(DEFAULT_RESULT_RETENTION_SECS),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            stream_name: std::env::var("QUEUE_STREAM").unwrap_or_else(|_| "afx:jobs".to_string()),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or_else(|_| "afx:workers".to_string()),
            result_retention: Duration::from_secs(
                std::env::var("QUEUE_RESULT_RETENTION_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_RESULT_RETENTION_SECS),
            ),
        }
    }
}
