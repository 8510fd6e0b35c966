//! Storage configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default lifetime of an uploaded file's reference (1 hour).
pub const DEFAULT_UPLOAD_TTL_SECS: u64 = 3600;

/// Default lifetime of a redemption token (1 hour).
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

/// Default lifetime of a produced file's reference (1 hour).
pub const DEFAULT_OUTPUT_REF_TTL_SECS: u64 = 3600;

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Redis URL for the ephemeral store and history log
    pub redis_url: String,
    /// Root directory for blobs
    pub data_dir: PathBuf,
    /// File reference lifetime after upload
    pub upload_ttl: Duration,
    /// Redemption token lifetime
    pub token_ttl: Duration,
    /// File reference lifetime for produced files
    pub output_ref_ttl: Duration,
    /// Consume tokens on first redemption
    pub single_use_tokens: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            data_dir: PathBuf::from("./data"),
            upload_ttl: Duration::from_secs(DEFAULT_UPLOAD_TTL_SECS),
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
            output_ref_ttl: Duration::from_secs(DEFAULT_OUTPUT_REF_TTL_SECS),
            single_use_tokens: false,
        }
    }
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            data_dir: std::env::var("AFX_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            upload_ttl: Duration::from_secs(env_secs("UPLOAD_TTL_SECS", DEFAULT_UPLOAD_TTL_SECS)),
            token_ttl: Duration::from_secs(env_secs(
                "DOWNLOAD_TOKEN_TTL_SECS",
                DEFAULT_TOKEN_TTL_SECS,
            )),
            output_ref_ttl: Duration::from_secs(env_secs(
                "OUTPUT_REF_TTL_SECS",
                DEFAULT_OUTPUT_REF_TTL_SECS,
            )),
            single_use_tokens: std::env::var("DOWNLOAD_TOKEN_SINGLE_USE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }

    /// Directory holding uploaded inputs.
    pub fn originals_dir(&self) -> PathBuf {
        self.data_dir.join("originals")
    }

    /// Directory holding produced outputs.
    pub fn processed_dir(&self) -> PathBuf {
        self.data_dir.join("processed")
    }
}

fn env_secs(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = StorageConfig {
            data_dir: PathBuf::from("/srv/afx"),
            ..Default::default()
        };
        assert_eq!(config.originals_dir(), PathBuf::from("/srv/afx/originals"));
        assert_eq!(config.processed_dir(), PathBuf::from("/srv/afx/processed"));
        assert_eq!(config.token_ttl, Duration::from_secs(3600));
        assert!(!config.single_use_tokens);
    }
}
