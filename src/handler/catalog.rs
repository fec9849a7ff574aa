//! Catalog browsing: home sections, stories, chapters and genres

use axum::{
    extract::{Path, State},
    Json,
};

use crate::catalog;
use crate::database::AppState;
use crate::error::{AppError, AppResult};
use crate::model::{Chapter, DisplayList, Genre, HomeFeed, Story, StoryDetail};

/// `GET /api/home`
///
/// Either every section loads or the request fails as a whole.
pub async fn home(State(state): State<AppState>) -> AppResult<Json<HomeFeed>> {
    Ok(Json(catalog::home_feed(state.db.clone()).await?))
}

/// `GET /api/sections/{list}`
pub async fn section(
    State(state): State<AppState>,
    Path(list): Path<String>,
) -> AppResult<Json<Vec<Story>>> {
    let list: DisplayList = list.parse().map_err(AppError::NotFound)?;
    Ok(Json(catalog::list_section(&state.db, list)?))
}

pub async fn list_stories(State(state): State<AppState>) -> AppResult<Json<Vec<Story>>> {
    Ok(Json(catalog::list_stories(&state.db)?))
}

pub async fn get_story(
    State(state): State<AppState>,
    Path(story_id): Path<String>,
) -> AppResult<Json<StoryDetail>> {
    Ok(Json(catalog::get_story_by_id(&state.db, &story_id)?))
}

pub async fn list_chapters(
    State(state): State<AppState>,
    Path(story_id): Path<String>,
) -> AppResult<Json<Vec<Chapter>>> {
    Ok(Json(catalog::list_chapters(&state.db, &story_id)?))
}

pub async fn get_chapter(
    State(state): State<AppState>,
    Path((story_id, number)): Path<(String, u32)>,
) -> AppResult<Json<Chapter>> {
    Ok(Json(catalog::get_chapter(&state.db, &story_id, number)?))
}

pub async fn list_genres(State(state): State<AppState>) -> AppResult<Json<Vec<Genre>>> {
    Ok(Json(catalog::list_genres(&state.db)?))
}

/// `GET /api/genres/{id}/stories`
pub async fn genre_stories(
    State(state): State<AppState>,
    Path(genre_id): Path<u64>,
) -> AppResult<Json<Vec<Story>>> {
    Ok(Json(catalog::stories_by_genre(&state.db, genre_id)?))
}
