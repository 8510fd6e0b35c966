//! User-scoped file references.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::StorageResult;
use crate::keys;
use crate::kv::EphemeralStore;

/// Maps `(user, logical file id)` to a storage path.
///
/// Keys embed the user id, so one user's id never resolves for another.
#[derive(Clone)]
pub struct FileRefs {
    store: Arc<dyn EphemeralStore>,
}

impl FileRefs {
    pub fn new(store: Arc<dyn EphemeralStore>) -> Self {
        Self { store }
    }

    /// Record (or replace) a reference with the given lifetime.
    pub async fn register(
        &self,
        user_id: &str,
        file_id: &str,
        path: &Path,
        ttl: Duration,
    ) -> StorageResult<()> {
        let key = keys::file_ref(user_id, file_id);
        self.store
            .put(&key, &path.to_string_lossy(), ttl)
            .await
    }

    /// Storage path registered under `user_id`, if still live.
    pub async fn resolve(&self, user_id: &str, file_id: &str) -> StorageResult<Option<PathBuf>> {
        let key = keys::file_ref(user_id, file_id);
        Ok(self.store.get(&key).await?.map(PathBuf::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    #[tokio::test]
    async fn test_references_are_user_scoped() {
        let refs = FileRefs::new(Arc::new(MemoryStore::new()));
        let path = Path::new("/data/originals/song_0123456789ab.mp3");

        refs.register("alice", "song_0123456789ab", path, Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(
            refs.resolve("alice", "song_0123456789ab").await.unwrap(),
            Some(path.to_path_buf())
        );
        assert_eq!(refs.resolve("bob", "song_0123456789ab").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reference_expires() {
        let refs = FileRefs::new(Arc::new(MemoryStore::new()));
        refs.register("alice", "f", Path::new("/tmp/f.mp3"), Duration::from_millis(20))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(refs.resolve("alice", "f").await.unwrap(), None);
    }
}
