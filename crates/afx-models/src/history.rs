//! Processing history records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EffectKind, EffectParams};

/// Immutable record of one successful transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Owning user id
    pub user_id: String,
    /// Name of the uploaded input file
    pub original_filename: String,
    /// Name of the produced file
    pub processed_filename: String,
    /// Effect applied
    pub effect_type: EffectKind,
    /// Parameters applied (only the fields relevant to `effect_type`)
    pub parameters: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(
        user_id: impl Into<String>,
        original_filename: impl Into<String>,
        processed_filename: impl Into<String>,
        params: &EffectParams,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            original_filename: original_filename.into(),
            processed_filename: processed_filename.into(),
            effect_type: params.kind(),
            parameters: params.to_json(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_from_params() {
        let params = EffectParams::Slowed {
            speed: 0.8,
            reverb_amount: 40.0,
            volume: 0.8,
        };
        let entry = HistoryEntry::new("u1", "song_ab12.mp3", "song_ab12_slowed_reverb.mp3", &params);

        assert_eq!(entry.effect_type, EffectKind::Slowed);
        assert_eq!(entry.parameters["reverb_amount"], 40.0);
        assert!(entry.parameters.get("effect_type").is_none());

        let json = serde_json::to_string(&entry).unwrap();
        let back: HistoryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
