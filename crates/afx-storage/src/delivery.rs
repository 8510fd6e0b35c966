//! Short-lived redemption tokens for produced files.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::StorageResult;
use crate::keys;
use crate::kv::EphemeralStore;

/// A minted token and when it stops working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub expires_in_secs: u64,
}

/// Mints and redeems `token -> path` entries.
///
/// Tokens carry no user id: anyone holding one may redeem it until it expires.
/// With `single_use` the first redemption consumes it.
#[derive(Clone)]
pub struct DeliveryTokens {
    store: Arc<dyn EphemeralStore>,
    ttl: Duration,
    single_use: bool,
}

impl DeliveryTokens {
    pub fn new(store: Arc<dyn EphemeralStore>, ttl: Duration, single_use: bool) -> Self {
        Self {
            store,
            ttl,
            single_use,
        }
    }

    /// Mint a fresh unguessable token for `path`.
    pub async fn mint(&self, path: &Path) -> StorageResult<DeliveryToken> {
        let token = Uuid::new_v4().simple().to_string();
        self.store
            .put(&keys::download_token(&token), &path.to_string_lossy(), self.ttl)
            .await?;

        debug!(ttl_secs = self.ttl.as_secs(), "Minted download token");

        let expires_at = Utc::now()
            + chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
        Ok(DeliveryToken {
            token,
            expires_at,
            expires_in_secs: self.ttl.as_secs(),
        })
    }

    /// Path behind `token`, if it is still valid.
    pub async fn redeem(&self, token: &str) -> StorageResult<Option<PathBuf>> {
        let key = keys::download_token(token);
        let value = if self.single_use {
            self.store.take(&key).await?
        } else {
            self.store.get(&key).await?
        };
        Ok(value.map(PathBuf::from))
    }
}
