//! Submission, status and redemption over the store, queue and blob store.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::fs::File;
use tracing::{debug, info, warn};

use afx_models::{EffectRequest, HistoryEntry, JobId, JobOutcome, JobPoll, StatusView};
use afx_queue::{JobBroker, TransformJob};
use afx_storage::{new_file_id, BlobStore, DeliveryToken, DeliveryTokens, FileRefs, HistorySink};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::security::is_bare_filename;

/// An opened file ready to be streamed back.
#[derive(Debug)]
pub struct FileDownload {
    pub file: File,
    pub len: u64,
    /// Basename sent in `Content-Disposition`
    pub filename: String,
}

/// The audio job service behind every HTTP handler.
#[derive(Clone)]
pub struct AudioService {
    blobs: BlobStore,
    file_refs: FileRefs,
    tokens: DeliveryTokens,
    history: Arc<dyn HistorySink>,
    broker: Arc<dyn JobBroker>,
    upload_ttl: Duration,
}

impl AudioService {
    pub fn new(
        blobs: BlobStore,
        file_refs: FileRefs,
        tokens: DeliveryTokens,
        history: Arc<dyn HistorySink>,
        broker: Arc<dyn JobBroker>,
        upload_ttl: Duration,
    ) -> Self {
        Self {
            blobs,
            file_refs,
            tokens,
            history,
            broker,
            upload_ttl,
        }
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Store an upload and register it for `user_id`, returning its file id.
    pub async fn submit_upload(
        &self,
        user_id: &str,
        bytes: &[u8],
        original_name: &str,
    ) -> ApiResult<String> {
        if bytes.is_empty() {
            return Err(ApiError::bad_request("Uploaded file is empty"));
        }

        let file_id = new_file_id(original_name);
        let path = self.blobs.write_original(&file_id, bytes).await?;
        self.file_refs
            .register(user_id, &file_id, &path, self.upload_ttl)
            .await?;

        metrics::record_upload(bytes.len());
        info!(user_id = %user_id, file_id = %file_id, size = bytes.len(), "Upload stored");
        Ok(file_id)
    }

    /// Resolve the caller's file, validate the effect and enqueue the job.
    ///
    /// Nothing is enqueued when the file or the effect is invalid.
    pub async fn submit_job(
        &self,
        user_id: &str,
        file_id: &str,
        request: EffectRequest,
    ) -> ApiResult<JobId> {
        let source = self.resolve_file(user_id, file_id).await?;
        let params = request.resolve()?;

        let job = TransformJob::new(user_id, source.to_string_lossy(), params);
        let job_id = self.broker.enqueue(&job).await?;

        metrics::record_job_enqueued(&job.function);
        info!(
            user_id = %user_id,
            file_id = %file_id,
            job_id = %job_id,
            function = %job.function,
            "Job enqueued"
        );
        Ok(job_id)
    }

    /// Current view of a job, minting a download token once it succeeded.
    pub async fn check_status(&self, job_id: &JobId) -> ApiResult<StatusView> {
        match self.broker.poll(job_id).await? {
            JobPoll::NotFound => Err(ApiError::not_found("Task not found")),
            JobPoll::Pending => Ok(StatusView::Pending),
            JobPoll::Finished(JobOutcome::Failure { detail }) => {
                Ok(StatusView::Failed { error: detail })
            }
            JobPoll::Finished(JobOutcome::Success { output_path }) => {
                let path = PathBuf::from(output_path);
                let filename = basename(&path)?;
                let minted = self.tokens.mint(&path).await?;
                debug!(job_id = %job_id, filename = %filename, "Minted token for finished job");
                Ok(StatusView::Success {
                    token: minted.token,
                    filename,
                })
            }
        }
    }

    /// Open the file behind a download token.
    pub async fn resolve(&self, token: &str) -> ApiResult<FileDownload> {
        let path = self
            .tokens
            .redeem(token)
            .await?
            .ok_or_else(|| ApiError::not_found("Download link expired or invalid"))?;

        self.open(&path).await
    }

    /// Mint a download token for a file the user produced earlier.
    pub async fn make_link(&self, user_id: &str, filename: &str) -> ApiResult<DeliveryToken> {
        if !is_bare_filename(filename) {
            return Err(ApiError::bad_request("Invalid filename"));
        }

        if !self.history.owns_processed(user_id, filename).await? {
            warn!(user_id = %user_id, filename = %filename, "Download link refused, not in history");
            return Err(ApiError::forbidden("Not authorized to access this file"));
        }

        let path = self.blobs.processed_path(filename);
        if !self.blobs.exists(&path).await {
            return Err(ApiError::not_found("File not found"));
        }

        Ok(self.tokens.mint(&path).await?)
    }

    /// Open one of the caller's files by id.
    pub async fn download(&self, user_id: &str, file_id: &str) -> ApiResult<FileDownload> {
        let path = self.resolve_file(user_id, file_id).await?;
        self.open(&path).await
    }

    pub async fn history(&self, user_id: &str) -> ApiResult<Vec<HistoryEntry>> {
        Ok(self.history.list(user_id).await?)
    }

    async fn resolve_file(&self, user_id: &str, file_id: &str) -> ApiResult<PathBuf> {
        if !is_bare_filename(file_id) {
            return Err(ApiError::not_found("File not found"));
        }
        self.file_refs
            .resolve(user_id, file_id)
            .await?
            .ok_or_else(|| ApiError::not_found("File not found"))
    }

    async fn open(&self, path: &Path) -> ApiResult<FileDownload> {
        let filename = basename(path)?;
        let (file, len) = self.blobs.open(path).await?;
        Ok(FileDownload {
            file,
            len,
            filename,
        })
    }
}

fn basename(path: &Path) -> ApiResult<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| ApiError::internal(format!("path has no file name: {}", path.display())))
}
