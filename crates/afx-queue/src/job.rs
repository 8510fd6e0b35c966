//! Job descriptors carried on the stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use afx_models::{EffectParams, JobId};

/// One transform request: function name plus its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformJob {
    /// Job ID, generated at enqueue
    pub job_id: JobId,
    /// Worker function, e.g. `speedup_audio`
    pub function: String,
    /// Owning user
    pub user_id: String,
    /// Input file on the shared blob store
    pub source_path: String,
    /// Effect and its parameters
    pub params: EffectParams,
    pub created_at: DateTime<Utc>,
}

impl TransformJob {
    pub fn new(user_id: impl Into<String>, source_path: impl Into<String>, params: EffectParams) -> Self {
        Self {
            job_id: JobId::new(),
            function: params.kind().function_name().to_string(),
            user_id: user_id.into(),
            source_path: source_path.into(),
            params,
            created_at: Utc::now(),
        }
    }

    /// First missing or inconsistent argument, if any.
    pub fn missing_argument(&self) -> Option<&'static str> {
        if self.job_id.as_str().is_empty() {
            Some("job_id")
        } else if self.user_id.is_empty() {
            Some("user_id")
        } else if self.source_path.is_empty() {
            Some("source_path")
        } else if self.function != self.params.kind().function_name() {
            Some("function")
        } else {
            None
        }
    }
}

/// A job handed to a consumer, with the id used to acknowledge it.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub message_id: String,
    pub job: TransformJob,
}

#[cfg(test)]
mod tests {
    use super::*;
    use afx_models::EffectKind;

    #[test]
    fn test_job_serialization() {
        let job = TransformJob::new(
            "user123",
            "/data/originals/song_0123456789ab.mp3",
            EffectParams::defaults(EffectKind::Slowed),
        );
        assert_eq!(job.function, "slowed_reverb_audio");

        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"function\":\"slowed_reverb_audio\""));
        assert!(json.contains("\"effect_type\":\"slowed\""));

        let parsed: TransformJob = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, job);
    }

    #[test]
    fn test_missing_argument() {
        let mut job = TransformJob::new("u", "/in.mp3", EffectParams::defaults(EffectKind::Speedup));
        assert_eq!(job.missing_argument(), None);

        job.source_path.clear();
        assert_eq!(job.missing_argument(), Some("source_path"));

        let mut job = TransformJob::new("u", "/in.mp3", EffectParams::defaults(EffectKind::Speedup));
        job.function = "nightcore_audio".into();
        assert_eq!(job.missing_argument(), Some("function"));
    }
}
