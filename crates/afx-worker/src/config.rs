//! Worker configuration.

use std::net::SocketAddr;
use std::time::Duration;

use tracing::warn;

/// Default bound on one transform (10 minutes).
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 600;

/// Minimum gap between the tool timeout and the claim idle threshold.
pub const CLAIM_IDLE_MARGIN: Duration = Duration::from_secs(60);

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Kill the transform tool after this long
    pub tool_timeout: Duration,
    /// How long one read from the queue blocks
    pub consume_block: Duration,
    /// How often the worker scans for abandoned deliveries
    pub claim_interval: Duration,
    /// Minimum idle time before a delivery can be claimed (crash recovery)
    pub claim_min_idle: Duration,
    /// Maximum deliveries claimed per scan
    pub claim_batch: usize,
    /// Back-off after a failed queue read
    pub error_backoff: Duration,
    /// Prometheus listener, disabled when unset
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            consume_block: Duration::from_secs(1),
            claim_interval: Duration::from_secs(30),
            claim_min_idle: Duration::from_secs(900), // longer than the tool timeout
            claim_batch: 5,
            error_backoff: Duration::from_secs(5),
            metrics_addr: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config = Self {
            tool_timeout: env_duration("WORKER_TOOL_TIMEOUT_SECS", defaults.tool_timeout),
            consume_block: Duration::from_millis(
                std::env::var("WORKER_CONSUME_BLOCK_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
            claim_interval: env_duration("WORKER_CLAIM_INTERVAL_SECS", defaults.claim_interval),
            claim_min_idle: env_duration("WORKER_CLAIM_MIN_IDLE_SECS", defaults.claim_min_idle),
            claim_batch: std::env::var("WORKER_CLAIM_BATCH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.claim_batch),
            error_backoff: defaults.error_backoff,
            metrics_addr: std::env::var("WORKER_METRICS_ADDR")
                .ok()
                .and_then(|s| s.parse().ok()),
        };
        config.with_safe_claim_idle()
    }

    /// Raise `claim_min_idle` above the tool timeout so a job that is still
    /// running can never be claimed by another worker.
    pub fn with_safe_claim_idle(mut self) -> Self {
        let floor = self.tool_timeout + CLAIM_IDLE_MARGIN;
        if self.claim_min_idle < floor {
            warn!(
                claim_min_idle_secs = self.claim_min_idle.as_secs(),
                tool_timeout_secs = self.tool_timeout.as_secs(),
                "Claim idle threshold too close to tool timeout, raising it to {}s",
                floor.as_secs()
            );
            self.claim_min_idle = floor;
        }
        self
    }
}

fn env_duration(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(default)
}
