//! HTTP request handlers
//!
//! Handlers stay thin: they extract the request, check the session where a
//! user or an admin is required, and delegate to the store modules.

pub mod admin;
pub mod catalog;
pub mod downloads;
pub mod engagement;
pub mod reader;
pub mod settings;

use axum::{response::IntoResponse, Json};
use serde_json::json;

/// Liveness probe
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
