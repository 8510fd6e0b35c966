//! Upload and job submission handlers.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use afx_models::EffectRequest;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Multipart field carrying the upload.
const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file_id: String,
}

/// `POST /files/` with a multipart `file` field.
pub async fn upload_file(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let mut multipart = multipart?;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e.body_text())))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e.body_text())))?;

        let file_id = state
            .audio
            .submit_upload(&user.user_id, &bytes, &original_name)
            .await?;
        return Ok(Json(UploadResponse { file_id }));
    }

    Err(ApiError::bad_request("Missing 'file' field"))
}

#[derive(Debug, Deserialize)]
pub struct ProcessQuery {
    pub file_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub task_id: String,
}

/// `POST /process?file_id=…` with the effect as JSON body.
pub async fn process_file(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<ProcessQuery>, QueryRejection>,
    body: Result<Json<EffectRequest>, JsonRejection>,
) -> ApiResult<Json<ProcessResponse>> {
    let Query(query) = query?;
    let Json(request) = body?;
    let job_id = state
        .audio
        .submit_job(&user.user_id, &query.file_id, request)
        .await?;

    Ok(Json(ProcessResponse {
        task_id: job_id.to_string(),
    }))
}
