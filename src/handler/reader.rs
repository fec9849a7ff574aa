//! Reader screen state, one session per signed-in user

use axum::{extract::State, Extension, Json};

use crate::catalog;
use crate::database::AppState;
use crate::engagement;
use crate::error::{AppError, AppResult};
use crate::reader::{
    MenuState, Navigation, OpenReaderRequest, PositionRequest, ReaderPreferences, ReaderSession,
    ReaderState,
};
use crate::session::Session;
use crate::settings;

/// `GET /api/reader`
pub async fn current(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> AppResult<Json<ReaderState>> {
    let user_id = session.require_user()?;
    Ok(Json(state.readers.require(user_id)?.snapshot()))
}

/// `POST /api/reader/open`
///
/// Starts a fresh session on the requested chapter, replacing any previous
/// one, and records the chapter in the read history.
pub async fn open(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<OpenReaderRequest>,
) -> AppResult<Json<ReaderState>> {
    let user_id = session.require_user()?;

    let story = catalog::find_story(&state.db, &payload.story_id)?
        .ok_or_else(|| AppError::not_found("story", &payload.story_id))?;
    catalog::get_chapter(&state.db, &story.id, payload.chapter_id)?;
    let dark_mode = settings::dark_mode(&state.db)?;

    let reader = ReaderSession::open(
        &story.id,
        payload.chapter_id,
        story.last_chapter_number,
        dark_mode,
    );
    state.readers.insert(user_id, reader.clone())?;
    engagement::record_history(&state.db, user_id, &story.id, payload.chapter_id)?;

    Ok(Json(reader.snapshot()))
}

/// `POST /api/reader/menu` toggles the overlay menu
pub async fn toggle_menu(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> AppResult<Json<MenuState>> {
    let user_id = session.require_user()?;
    Ok(Json(state.readers.require(user_id)?.toggle_menu()))
}

pub async fn preferences(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<ReaderPreferences>,
) -> AppResult<Json<ReaderState>> {
    let user_id = session.require_user()?;
    Ok(Json(state.readers.require(user_id)?.apply_preferences(payload)))
}

pub async fn position(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<PositionRequest>,
) -> AppResult<Json<ReaderState>> {
    let user_id = session.require_user()?;
    let reader = state.readers.require(user_id)?;
    Ok(Json(reader.set_position(payload.page, payload.scroll_offset)))
}

/// `POST /api/reader/next`
///
/// On the last chapter nothing happens and `moved` is `false`.
pub async fn next(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> AppResult<Json<Navigation>> {
    navigate(&state, &session, ReaderSession::next_chapter)
}

/// `POST /api/reader/previous`
///
/// On the first chapter nothing happens and `moved` is `false`.
pub async fn previous(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> AppResult<Json<Navigation>> {
    navigate(&state, &session, ReaderSession::previous_chapter)
}

fn navigate(
    state: &AppState,
    session: &Session,
    step: fn(&ReaderSession) -> Option<u32>,
) -> AppResult<Json<Navigation>> {
    let user_id = session.require_user()?;
    let reader = state.readers.require(user_id)?;

    let moved = match step(&reader) {
        Some(chapter_id) => {
            let snapshot = reader.snapshot();
            engagement::record_history(&state.db, user_id, &snapshot.story_id, chapter_id)?;
            true
        }
        None => false,
    };

    Ok(Json(Navigation {
        moved,
        state: reader.snapshot(),
    }))
}
