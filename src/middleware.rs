use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::database::AppState;
use crate::session::{self, USER_HEADER};

/// Middleware to check for the shared API key
///
/// When `Config::api_key` is set, the request must carry an `Authorization`
/// header with exactly that value. Without a configured key the check is
/// skipped.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    if let Some(api_key) = state.config.api_key.as_deref() {
        let unauthorized_response = || {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "status": "error",
                    "message": "Invalid or missing authorization header"
                })),
            )
                .into_response()
        };

        match headers.get("Authorization").map(|value| value.to_str()) {
            Some(Ok(header_str)) if header_str == api_key => {}
            _ => return Err(unauthorized_response()),
        }
    }

    Ok(next.run(request).await)
}

/// Resolves the caller's session snapshot and attaches it to the request
///
/// The snapshot is rebuilt on every request from the `X-User-Id` header. An
/// id that cannot be stored (one containing ':') is rejected with 400.
pub async fn session_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let user_id = headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok());

    match session::resolve(&state.db, user_id) {
        Ok(session) => {
            request.extensions_mut().insert(session);
            Ok(next.run(request).await)
        }
        Err(err) => {
            tracing::warn!(%err, "session resolution failed");
            Err(err.into_response())
        }
    }
}
