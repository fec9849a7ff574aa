//! Likes, views, ratings, favorites, history, comments, feedback and profile

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;

use crate::database::AppState;
use crate::engagement;
use crate::error::{AppError, AppResult};
use crate::model::{
    Comment, CommentRequest, FeedbackRequest, HistoryRequest, LikeResponse, ProfileRequest,
    RatingRequest, RatingResponse, ReadHistory, Story, UserProfile,
};
use crate::session::{self, Session};

/// `POST /api/stories/{id}/like` toggles the caller's like
pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(story_id): Path<String>,
) -> AppResult<Json<LikeResponse>> {
    let user_id = session.require_user()?;
    Ok(Json(engagement::toggle_like(&state.db, user_id, &story_id)?))
}

pub async fn record_view(
    State(state): State<AppState>,
    Path(story_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let views = engagement::record_view(&state.db, &story_id)?;
    Ok(Json(json!({ "viewCount": views })))
}

pub async fn rate_story(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(story_id): Path<String>,
    Json(payload): Json<RatingRequest>,
) -> AppResult<Json<RatingResponse>> {
    let user_id = session.require_user()?;
    Ok(Json(engagement::rate_story(
        &state.db,
        user_id,
        &story_id,
        payload.score,
    )?))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(story_id): Path<String>,
) -> AppResult<Json<Vec<Comment>>> {
    Ok(Json(engagement::list_comments(&state.db, &story_id)?))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(story_id): Path<String>,
    Json(payload): Json<CommentRequest>,
) -> AppResult<impl IntoResponse> {
    let user_id = session.require_user()?;
    let comment = engagement::add_comment(
        &state.db,
        user_id,
        session.author_name(),
        &story_id,
        payload,
    )?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// `GET /api/me`
pub async fn me(Extension(session): Extension<Session>) -> Json<Session> {
    Json(session)
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<ProfileRequest>,
) -> AppResult<Json<UserProfile>> {
    let user_id = session.require_user()?;
    Ok(Json(session::upsert_profile(&state.db, user_id, payload)?))
}

pub async fn list_favorites(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> AppResult<Json<Vec<Story>>> {
    let user_id = session.require_user()?;
    Ok(Json(engagement::list_favorites(&state.db, user_id)?))
}

pub async fn add_favorite(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(story_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let user_id = session.require_user()?;
    let favorite = engagement::add_favorite(&state.db, user_id, &story_id)?;
    Ok(Json(favorite))
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(story_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let user_id = session.require_user()?;
    if !engagement::remove_favorite(&state.db, user_id, &story_id)? {
        return Err(AppError::not_found("favorite", &story_id));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_history(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> AppResult<Json<Vec<ReadHistory>>> {
    let user_id = session.require_user()?;
    Ok(Json(engagement::list_history(&state.db, user_id)?))
}

pub async fn record_history(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(story_id): Path<String>,
    Json(payload): Json<HistoryRequest>,
) -> AppResult<Json<ReadHistory>> {
    let user_id = session.require_user()?;
    Ok(Json(engagement::record_history(
        &state.db,
        user_id,
        &story_id,
        payload.chapter_id,
    )?))
}

pub async fn delete_history(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(story_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let user_id = session.require_user()?;
    if !engagement::delete_history(&state.db, user_id, &story_id)? {
        return Err(AppError::not_found("history entry", &story_id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/feedback`; signing in is optional
pub async fn submit_feedback(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<FeedbackRequest>,
) -> AppResult<impl IntoResponse> {
    let feedback = engagement::submit_feedback(&state.db, session.user_id.as_deref(), payload)?;
    Ok((StatusCode::CREATED, Json(feedback)))
}
