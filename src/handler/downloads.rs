use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::database::AppState;
use crate::downloads;
use crate::error::{AppError, AppResult};
use crate::model::{DownloadItem, DownloadRequest};

pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<DownloadItem>>> {
    Ok(Json(downloads::list(&state.db)?))
}

/// `POST /api/downloads`
///
/// # Response
///
/// - **202 Accepted** - record queued (or already present), progress runs in
///   the background
/// - **404 Not Found** - the chapter does not exist
pub async fn enqueue(
    State(state): State<AppState>,
    Json(payload): Json<DownloadRequest>,
) -> AppResult<impl IntoResponse> {
    let item = downloads::enqueue(
        state.db.clone(),
        &payload.story_id,
        payload.chapter,
        state.config.download_tick,
    )?;
    Ok((StatusCode::ACCEPTED, Json(item)))
}

pub async fn remove(
    State(state): State<AppState>,
    Path((story_id, chapter)): Path<(String, u32)>,
) -> AppResult<impl IntoResponse> {
    if !downloads::remove(&state.db, &story_id, chapter)? {
        return Err(AppError::not_found(
            "download",
            format!("{}/{}", story_id, chapter),
        ));
    }
    Ok(StatusCode::NO_CONTENT)
}
