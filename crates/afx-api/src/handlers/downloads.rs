//! File delivery handlers.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;

use afx_models::HistoryEntry;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::metrics;
use crate::services::FileDownload;
use crate::state::AppState;

const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// Stream a file as an attachment.
fn file_response(download: FileDownload) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", download.filename);
    let body = Body::from_stream(ReaderStream::new(download.file));

    (
        [
            (header::CONTENT_TYPE, AUDIO_CONTENT_TYPE.to_string()),
            (header::CONTENT_LENGTH, download.len.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

/// `GET /temp-download/:token`. The token is the only credential.
pub async fn temp_download(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Response> {
    let download = state.audio.resolve(&token).await?;
    metrics::record_download("token");
    Ok(file_response(download))
}

#[derive(Debug, Deserialize)]
pub struct LinkQuery {
    pub filename: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkResponse {
    pub token: String,
    pub expires_in: u64,
}

/// `GET /history-download-link?filename=…`
pub async fn history_download_link(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LinkQuery>,
) -> ApiResult<Json<LinkResponse>> {
    let minted = state.audio.make_link(&user.user_id, &query.filename).await?;
    Ok(Json(LinkResponse {
        token: minted.token,
        expires_in: minted.expires_in_secs,
    }))
}

/// `GET /download/:file_id`, scoped to the caller's own files.
pub async fn download_file(
    State(state): State<AppState>,
    user: AuthUser,
    Path(file_id): Path<String>,
) -> ApiResult<Response> {
    let download = state.audio.download(&user.user_id, &file_id).await?;
    metrics::record_download("direct");
    Ok(file_response(download))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryEntry>,
}

/// `GET /history`
pub async fn get_history(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<HistoryResponse>> {
    let history = state.audio.history(&user.user_id).await?;
    Ok(Json(HistoryResponse { history }))
}
