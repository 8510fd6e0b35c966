//! Fixtures shared by the worker's unit tests.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use afx_media::{filter_chain, MediaError, MediaResult, TransformTool};
use afx_models::EffectParams;
use afx_storage::{BlobStore, FileRefs, MemoryHistory, MemoryStore};

use crate::processor::AudioProcessor;

/// Transform tool that writes the filter chain as output, or fails like ffmpeg exiting 1.
pub struct ScriptedTool {
    failure: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedTool {
    pub fn succeeding() -> Self {
        Self {
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(stderr: &str) -> Self {
        Self {
            failure: Some(stderr.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransformTool for ScriptedTool {
    async fn transform(
        &self,
        input: &std::path::Path,
        output: &std::path::Path,
        params: &EffectParams,
    ) -> MediaResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(stderr) = &self.failure {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(stderr.clone()),
                Some(1),
            ));
        }
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.to_path_buf()));
        }
        tokio::fs::write(output, filter_chain(params)).await?;
        Ok(())
    }
}

pub struct ProcessorFixture {
    pub _dir: TempDir,
    pub store: Arc<MemoryStore>,
    pub blobs: BlobStore,
    pub file_refs: FileRefs,
    pub history: Arc<MemoryHistory>,
    pub tool: Arc<ScriptedTool>,
    pub processor: AudioProcessor,
}

impl ProcessorFixture {
    /// Store an upload and return its path.
    pub async fn write_input(&self, file_id: &str) -> PathBuf {
        self.blobs.write_original(file_id, b"ID3fake").await.unwrap()
    }
}

pub fn processor_fixture(tool: ScriptedTool) -> ProcessorFixture {
    let dir = tempfile::tempdir().unwrap();
    let blobs = BlobStore::new(dir.path().join("originals"), dir.path().join("processed"));
    std::fs::create_dir_all(blobs.originals_dir()).unwrap();
    std::fs::create_dir_all(blobs.processed_dir()).unwrap();

    let store = Arc::new(MemoryStore::new());
    let file_refs = FileRefs::new(store.clone());
    let history = Arc::new(MemoryHistory::new());
    let tool = Arc::new(tool);

    let processor = AudioProcessor::new(
        tool.clone(),
        blobs.clone(),
        file_refs.clone(),
        history.clone(),
        Duration::from_secs(3600),
    );

    ProcessorFixture {
        _dir: dir,
        store,
        blobs,
        file_refs,
        history,
        tool,
        processor,
    }
}
