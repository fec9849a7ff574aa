//! Admin-only story, chapter and genre management

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;

use crate::admin;
use crate::database::AppState;
use crate::error::AppResult;
use crate::model::{
    CreateGenreRequest, CreateStoryRequest, DisplayList, NewChapterRequest, UpdateStoryRequest,
};
use crate::session::Session;

/// `POST /api/admin/stories`
///
/// # Response
///
/// - **201 Created** - the stored story, including its new id
/// - **400 Bad Request** - missing title, author, cover or genres
/// - **403 Forbidden** - caller is not an admin
pub async fn create_story(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<CreateStoryRequest>,
) -> AppResult<impl IntoResponse> {
    session.require_admin()?;
    let story = admin::create_story(&state.db, payload)?;
    Ok((StatusCode::CREATED, Json(story)))
}

/// `PATCH /api/admin/stories/{id}`
pub async fn update_story(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(story_id): Path<String>,
    Json(payload): Json<UpdateStoryRequest>,
) -> AppResult<impl IntoResponse> {
    session.require_admin()?;
    let story = admin::update_story(&state.db, &story_id, payload)?;
    Ok(Json(story))
}

/// `DELETE /api/admin/stories/{id}`
pub async fn delete_story(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(story_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    session.require_admin()?;
    admin::delete_story(&state.db, &story_id)?;
    Ok(Json(json!({
        "message": "Story deleted successfully",
        "deleted_id": story_id
    })))
}

/// `GET /api/admin/stories/{id}/display-lists`
pub async fn display_lists(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(story_id): Path<String>,
) -> AppResult<Json<Vec<DisplayList>>> {
    session.require_admin()?;
    Ok(Json(admin::display_lists_of(&state.db, &story_id)?))
}

/// `POST /api/admin/stories/{id}/chapters`
///
/// The chapter number is assigned by the store, never by the client.
pub async fn add_chapter(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(story_id): Path<String>,
    Json(payload): Json<NewChapterRequest>,
) -> AppResult<impl IntoResponse> {
    session.require_admin()?;
    let chapter = admin::add_chapter(&state.db, &story_id, payload)?;
    Ok((StatusCode::CREATED, Json(chapter)))
}

/// `POST /api/admin/genres`
pub async fn create_genre(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<CreateGenreRequest>,
) -> AppResult<impl IntoResponse> {
    session.require_admin()?;
    let genre = admin::create_genre(&state.db, &payload.name)?;
    Ok((StatusCode::CREATED, Json(genre)))
}
