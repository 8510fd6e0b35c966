//! Application state.

use std::sync::Arc;

use afx_queue::{JobQueue, QueueConfig};
use afx_storage::{
    BlobStore, DeliveryTokens, EphemeralStore, FileRefs, RedisHistory, RedisStore, StorageConfig,
};

use crate::auth::JwtVerifier;
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::services::AudioService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub audio: AudioService,
    /// Checked by the readiness probe
    pub store: Arc<dyn EphemeralStore>,
    pub jwt: Arc<JwtVerifier>,
}

impl AppState {
    /// Connect the Redis-backed store, queue and history log.
    pub async fn new(
        config: ApiConfig,
        storage: StorageConfig,
        queue: QueueConfig,
    ) -> ApiResult<Self> {
        if config.jwt_secret.is_empty() {
            return Err(ApiError::internal("JWT_SECRET is not set"));
        }

        let blobs = BlobStore::from_config(&storage);
        blobs.ensure_dirs().await?;

        let store: Arc<dyn EphemeralStore> = Arc::new(RedisStore::connect(&storage.redis_url).await?);
        let history = Arc::new(RedisHistory::connect(&storage.redis_url).await?);

        let queue = JobQueue::connect(queue, store.clone()).await?;
        queue.init().await?;

        let audio = AudioService::new(
            blobs,
            FileRefs::new(store.clone()),
            DeliveryTokens::new(store.clone(), storage.token_ttl, storage.single_use_tokens),
            history,
            Arc::new(queue),
            storage.upload_ttl,
        );

        Ok(Self::from_parts(config, audio, store))
    }

    /// Assemble state from already-built components.
    pub fn from_parts(config: ApiConfig, audio: AudioService, store: Arc<dyn EphemeralStore>) -> Self {
        let jwt = Arc::new(JwtVerifier::new(&config.jwt_secret));
        Self {
            config,
            audio,
            store,
            jwt,
        }
    }
}
