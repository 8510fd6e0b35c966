//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Storage error: {0}")]
    Storage(#[from] afx_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] afx_media::MediaError),

    #[error("Queue error: {0}")]
    Queue(#[from] afx_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn invalid_job(msg: impl Into<String>) -> Self {
        Self::InvalidJob(msg.into())
    }

    /// Description recorded in a failed job's result.
    pub fn detail(&self) -> String {
        match self {
            WorkerError::Media(e) => e.diagnostics(),
            other => other.to_string(),
        }
    }
}
