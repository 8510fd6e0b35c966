//! Job status handler.

use axum::extract::{Path, State};
use axum::Json;

use afx_models::{JobId, StatusView};

use crate::error::ApiResult;
use crate::state::AppState;

/// `GET /status/:task_id`. Unauthenticated; the id itself is unguessable.
pub async fn get_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<StatusView>> {
    let view = state.audio.check_status(&JobId::from_string(task_id)).await?;
    Ok(Json(view))
}
