use axum::{extract::State, Json};

use crate::database::AppState;
use crate::error::AppResult;
use crate::model::DarkModeSetting;
use crate::settings;

/// `GET /api/settings/dark-mode`
pub async fn dark_mode(State(state): State<AppState>) -> AppResult<Json<DarkModeSetting>> {
    let enabled = settings::dark_mode(&state.db)?;
    Ok(Json(DarkModeSetting { enabled }))
}

/// `PUT /api/settings/dark-mode`
pub async fn set_dark_mode(
    State(state): State<AppState>,
    Json(payload): Json<DarkModeSetting>,
) -> AppResult<Json<DarkModeSetting>> {
    settings::set_dark_mode(&state.db, payload.enabled)?;
    Ok(Json(payload))
}
