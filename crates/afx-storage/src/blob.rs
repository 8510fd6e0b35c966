//! Local filesystem blob store.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tracing::debug;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};

/// Extension given to stored uploads.
pub const UPLOAD_EXTENSION: &str = "mp3";

/// Longest stem kept from a client-supplied file name.
const MAX_STEM_LEN: usize = 64;

/// Hex characters of randomness appended to a file id.
const FILE_ID_SUFFIX_LEN: usize = 12;

/// Uploaded inputs and produced outputs on local disk.
#[derive(Debug, Clone)]
pub struct BlobStore {
    originals_dir: PathBuf,
    processed_dir: PathBuf,
}

impl BlobStore {
    pub fn new(originals_dir: impl Into<PathBuf>, processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            originals_dir: originals_dir.into(),
            processed_dir: processed_dir.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.originals_dir(), config.processed_dir())
    }

    /// Create both directories if missing.
    pub async fn ensure_dirs(&self) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.originals_dir).await?;
        tokio::fs::create_dir_all(&self.processed_dir).await?;
        Ok(())
    }

    pub fn originals_dir(&self) -> &Path {
        &self.originals_dir
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }

    /// Path of an uploaded input.
    pub fn original_path(&self, file_id: &str) -> PathBuf {
        self.originals_dir
            .join(format!("{file_id}.{UPLOAD_EXTENSION}"))
    }

    /// Path of a produced output.
    pub fn processed_path(&self, filename: &str) -> PathBuf {
        self.processed_dir.join(filename)
    }

    /// Store upload bytes under `file_id`.
    pub async fn write_original(&self, file_id: &str, bytes: &[u8]) -> StorageResult<PathBuf> {
        let path = self.original_path(file_id);
        tokio::fs::write(&path, bytes).await?;
        debug!(file_id = %file_id, size = bytes.len(), "Stored upload");
        Ok(path)
    }

    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Open a stored file for streaming, returning it with its length.
    pub async fn open(&self, path: &Path) -> StorageResult<(File, u64)> {
        let file = match File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::not_found(path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let len = file.metadata().await?.len();
        Ok((file, len))
    }
}

/// Collision-resistant id for an upload: `<sanitized stem>_<12 hex chars>`.
pub fn new_file_id(original_name: &str) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}",
        sanitize_stem(original_name),
        &random[..FILE_ID_SUFFIX_LEN]
    )
}

/// Reduce a client file name to a safe stem of `[A-Za-z0-9_-]`.
pub fn sanitize_stem(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);
    let stem = match base.rfind('.') {
        Some(idx) if idx > 0 => &base[..idx],
        _ => base,
    };

    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_STEM_LEN)
        .collect();

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        "audio".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_stem() {
        assert_eq!(sanitize_stem("My Song.mp3"), "My_Song");
        assert_eq!(sanitize_stem("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_stem("C:\\music\\track.01.wav"), "track_01");
        assert_eq!(sanitize_stem(".mp3"), "mp3");
        assert_eq!(sanitize_stem("???.mp3"), "audio");
        assert_eq!(sanitize_stem(""), "audio");
    }

    #[test]
    fn test_file_id_shape() {
        let id = new_file_id("song.mp3");
        let (stem, suffix) = id.rsplit_once('_').unwrap();
        assert_eq!(stem, "song");
        assert_eq!(suffix.len(), 12);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(new_file_id("song.mp3"), id);
    }

    #[tokio::test]
    async fn test_write_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = BlobStore::new(dir.path().join("originals"), dir.path().join("processed"));
        blobs.ensure_dirs().await.unwrap();

        let path = blobs.write_original("song_0123456789ab", b"ID3data").await.unwrap();
        assert_eq!(path, dir.path().join("originals/song_0123456789ab.mp3"));
        assert!(blobs.exists(&path).await);

        let (_, len) = blobs.open(&path).await.unwrap();
        assert_eq!(len, 7);

        let missing = blobs.processed_path("nope.mp3");
        assert!(!blobs.exists(&missing).await);
        assert!(matches!(blobs.open(&missing).await, Err(StorageError::NotFound(_))));
    }
}
