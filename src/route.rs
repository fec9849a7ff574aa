//! Route definitions for the catalog API
//!
//! This module configures all HTTP routes and maps them to their handlers.

use axum::middleware;
use axum::routing::{delete, get, patch, post, put};
use axum::Router;

use crate::database::AppState;
use crate::handler::{self, admin, catalog, downloads, engagement, reader, settings};
use crate::middleware::{auth_middleware, session_middleware};

/// Creates and configures the application router with all routes
///
/// `GET /health` is public. Everything under `/api` passes the API key check
/// and then gets a session snapshot; admin routes additionally require the
/// caller to be an admin.
///
/// # Example Usage
///
/// ```no_run
/// # use mangashelf::config::Config;
/// # use mangashelf::database::{init_db, AppState};
/// # use mangashelf::route::create_app;
/// # let db = init_db("data.db").unwrap();
/// let state = AppState::new(db, Config::default());
/// let app = create_app(state);
/// // axum::serve(listener, app).await.unwrap();
/// ```
pub fn create_app(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/stories", post(admin::create_story))
        .route(
            "/stories/{id}",
            patch(admin::update_story).delete(admin::delete_story),
        )
        .route("/stories/{id}/display-lists", get(admin::display_lists))
        .route("/stories/{id}/chapters", post(admin::add_chapter))
        .route("/genres", post(admin::create_genre));

    let reader_routes = Router::new()
        .route("/", get(reader::current))
        .route("/open", post(reader::open))
        .route("/menu", post(reader::toggle_menu))
        .route("/preferences", put(reader::preferences))
        .route("/position", put(reader::position))
        .route("/next", post(reader::next))
        .route("/previous", post(reader::previous));

    let api_routes = Router::new()
        .route("/home", get(catalog::home))
        .route("/sections/{list}", get(catalog::section))
        .route("/stories", get(catalog::list_stories))
        .route("/stories/{id}", get(catalog::get_story))
        .route("/stories/{id}/chapters", get(catalog::list_chapters))
        .route("/stories/{id}/chapters/{number}", get(catalog::get_chapter))
        .route("/stories/{id}/like", post(engagement::toggle_like))
        .route("/stories/{id}/view", post(engagement::record_view))
        .route("/stories/{id}/rating", post(engagement::rate_story))
        .route(
            "/stories/{id}/comments",
            get(engagement::list_comments).post(engagement::add_comment),
        )
        .route("/genres", get(catalog::list_genres))
        .route("/genres/{id}/stories", get(catalog::genre_stories))
        .route("/me", get(engagement::me))
        .route("/me/profile", put(engagement::update_profile))
        .route("/me/favorites", get(engagement::list_favorites))
        .route(
            "/me/favorites/{story_id}",
            put(engagement::add_favorite).delete(engagement::remove_favorite),
        )
        .route("/me/history", get(engagement::list_history))
        .route(
            "/me/history/{story_id}",
            put(engagement::record_history).delete(engagement::delete_history),
        )
        .route("/feedback", post(engagement::submit_feedback))
        .route(
            "/settings/dark-mode",
            get(settings::dark_mode).put(settings::set_dark_mode),
        )
        .route("/downloads", get(downloads::list).post(downloads::enqueue))
        .route("/downloads/{story_id}/{chapter}", delete(downloads::remove))
        .nest("/reader", reader_routes)
        .nest("/admin", admin_routes)
        // Layers run bottom-up: the API key is checked before the session.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(handler::health))
        .nest("/api", api_routes)
        .with_state(state)
}
