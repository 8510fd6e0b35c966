//! Ephemeral key-value store with per-key expiry.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::debug;

use crate::error::StorageResult;

/// String map with per-key TTL.
///
/// A read after expiry behaves exactly like a read of a key that was never set.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    /// Set `key`, replacing any previous value and deadline.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<()>;

    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Atomically read and delete `key`.
    async fn take(&self, key: &str) -> StorageResult<Option<String>>;

    /// Set `key` only when it holds no live value. Returns whether it was written.
    async fn put_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<bool>;

    /// Connectivity check for readiness probes.
    async fn ping(&self) -> StorageResult<()>;
}

fn ttl_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

/// Redis-backed store (`SET PX`, `GET`, `GETDEL`, `SET NX PX`).
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Connect to Redis.
    pub async fn connect(redis_url: &str) -> StorageResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        debug!("Connected ephemeral store to Redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl EphemeralStore for RedisStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn take(&self, key: &str) -> StorageResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GETDEL")
            .arg(key)
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn put_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<bool> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn ping(&self) -> StorageResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

/// In-process store with deadline-based expiry.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, (String, Instant)>> {
        // A poisoned map still holds consistent entries.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn live(entry: Option<&(String, Instant)>, now: Instant) -> Option<String> {
    entry
        .filter(|(_, deadline)| *deadline > now)
        .map(|(value, _)| value.clone())
}

#[async_trait]
impl EphemeralStore for MemoryStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<()> {
        let deadline = Instant::now() + ttl;
        self.entries()
            .insert(key.to_string(), (value.to_string(), deadline));
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let mut entries = self.entries();
        let now = Instant::now();
        let value = live(entries.get(key), now);
        if value.is_none() {
            entries.remove(key);
        }
        Ok(value)
    }

    async fn take(&self, key: &str) -> StorageResult<Option<String>> {
        let now = Instant::now();
        let removed = self.entries().remove(key);
        Ok(live(removed.as_ref(), now))
    }

    async fn put_if_absent(&self, key: &str, value: &str, ttl: Duration) -> StorageResult<bool> {
        let mut entries = self.entries();
        let now = Instant::now();
        if live(entries.get(key), now).is_some() {
            return Ok(false);
        }
        entries.insert(key.to_string(), (value.to_string(), now + ttl));
        Ok(true)
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}
