//! Job identifiers and terminal outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a transform job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Terminal result of running one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Transform finished; the artifact lives at `output_path`.
    Success { output_path: String },
    /// Transform or bookkeeping failed.
    Failure { detail: String },
}

impl JobOutcome {
    pub fn success(output_path: impl Into<String>) -> Self {
        JobOutcome::Success {
            output_path: output_path.into(),
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        JobOutcome::Failure {
            detail: detail.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobOutcome::Success { .. } => "success",
            JobOutcome::Failure { .. } => "failure",
        }
    }
}

/// Observable state of a job as reported by the result backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPoll {
    /// Enqueued, not yet finished (covers in-progress).
    Pending,
    /// Terminal state reached.
    Finished(JobOutcome),
    /// No job with this id is known (or it has aged out).
    NotFound,
}

impl JobPoll {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobPoll::Pending => "pending",
            JobPoll::Finished(outcome) => outcome.as_str(),
            JobPoll::NotFound => "not_found",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPoll::Finished(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_is_unique() {
        let a = JobId::new();
        let b = JobId::new();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_outcome_serde() {
        let outcome = JobOutcome::success("/data/processed/song_speedup.mp3");
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(
            json,
            r#"{"status":"success","output_path":"/data/processed/song_speedup.mp3"}"#
        );

        let failed: JobOutcome =
            serde_json::from_str(r#"{"status":"failure","detail":"boom"}"#).unwrap();
        assert_eq!(failed, JobOutcome::failure("boom"));
        assert!(!failed.is_success());
    }

    #[test]
    fn test_poll_terminal() {
        assert!(!JobPoll::Pending.is_terminal());
        assert!(!JobPoll::NotFound.is_terminal());
        assert!(JobPoll::Finished(JobOutcome::failure("x")).is_terminal());
        assert_eq!(JobPoll::Finished(JobOutcome::success("p")).as_str(), "success");
    }
}
