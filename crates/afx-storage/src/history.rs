//! Append-only processing history.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::warn;

use afx_models::HistoryEntry;

use crate::error::StorageResult;
use crate::keys;

/// Sink for history entries written by the worker and read by the API.
#[async_trait]
pub trait HistorySink: Send + Sync {
    async fn append(&self, entry: &HistoryEntry) -> StorageResult<()>;

    /// Entries for `user_id`, oldest first.
    async fn list(&self, user_id: &str) -> StorageResult<Vec<HistoryEntry>>;

    /// Whether `user_id` has an entry whose produced file is `filename`.
    async fn owns_processed(&self, user_id: &str, filename: &str) -> StorageResult<bool> {
        Ok(self
            .list(user_id)
            .await?
            .iter()
            .any(|entry| entry.processed_filename == filename))
    }
}

/// History kept in one Redis list per user.
#[derive(Clone)]
pub struct RedisHistory {
    conn: MultiplexedConnection,
}

impl RedisHistory {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    pub async fn connect(redis_url: &str) -> StorageResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self::new(client.get_multiplexed_async_connection().await?))
    }
}

#[async_trait]
impl HistorySink for RedisHistory {
    async fn append(&self, entry: &HistoryEntry) -> StorageResult<()> {
        let payload = serde_json::to_string(entry)?;
        let mut conn = self.conn.clone();
        conn.rpush::<_, _, ()>(keys::history(&entry.user_id), payload)
            .await?;
        Ok(())
    }

    async fn list(&self, user_id: &str) -> StorageResult<Vec<HistoryEntry>> {
        let mut conn = self.conn.clone();
        let raw: Vec<String> = conn.lrange(keys::history(user_id), 0, -1).await?;

        let mut entries = Vec::with_capacity(raw.len());
        for item in raw {
            match serde_json::from_str::<HistoryEntry>(&item) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(user_id = %user_id, "Skipping malformed history entry: {}", e),
            }
        }
        Ok(entries)
    }
}

/// In-process history for tests and single-process development.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: Mutex<HashMap<String, Vec<HistoryEntry>>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries across users.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .map(|map| map.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl HistorySink for MemoryHistory {
    async fn append(&self, entry: &HistoryEntry) -> StorageResult<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(entry.user_id.clone())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn list(&self, user_id: &str) -> StorageResult<Vec<HistoryEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afx_models::{EffectKind, EffectParams};

    fn entry(user: &str, processed: &str) -> HistoryEntry {
        HistoryEntry::new(
            user,
            "song_0123456789ab.mp3",
            processed,
            &EffectParams::defaults(EffectKind::Speedup),
        )
    }

    #[tokio::test]
    async fn test_memory_history_per_user() {
        let history = MemoryHistory::new();
        history.append(&entry("alice", "a_speedup.mp3")).await.unwrap();
        history.append(&entry("alice", "b_speedup.mp3")).await.unwrap();
        history.append(&entry("bob", "c_speedup.mp3")).await.unwrap();

        let alice = history.list("alice").await.unwrap();
        assert_eq!(alice.len(), 2);
        assert_eq!(alice[0].processed_filename, "a_speedup.mp3");
        assert_eq!(history.len(), 3);
        assert!(history.list("carol").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ownership_check() {
        let history = MemoryHistory::new();
        history.append(&entry("alice", "a_speedup.mp3")).await.unwrap();

        assert!(history.owns_processed("alice", "a_speedup.mp3").await.unwrap());
        assert!(!history.owns_processed("bob", "a_speedup.mp3").await.unwrap());
        assert!(!history.owns_processed("alice", "other.mp3").await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis at REDIS_URL"]
    async fn test_redis_history_roundtrip() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
        let history = RedisHistory::connect(&url).await.unwrap();
        let user = format!("test-{}", uuid::Uuid::new_v4());

        history.append(&entry(&user, "a_speedup.mp3")).await.unwrap();
        let listed = history.list(&user).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(history.owns_processed(&user, "a_speedup.mp3").await.unwrap());
    }
}
