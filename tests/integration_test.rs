//! Integration tests for the catalog API
//!
//! These tests drive the full router (routing, middleware, handlers and the
//! embedded database) the way the mobile client does.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use tower::ServiceExt;

use mangashelf::config::Config;
use mangashelf::database::{init_db, AppState};
use mangashelf::route::create_app;
use mangashelf::session::grant_admin;

const ADMIN: &str = "admin-1";
const READER: &str = "reader-1";

/// Creates a test application over a temporary database with one admin
fn setup_test_app() -> (axum::Router, NamedTempFile) {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = temp_db.path().to_str().unwrap();

    let db = init_db(db_path).expect("Failed to initialize test database");
    grant_admin(&db, ADMIN).unwrap();
    let state = AppState::new(db, Config::default());

    (create_app(state), temp_db)
}

/// Helper function to parse response body as JSON
async fn response_json(body: Body) -> Value {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Failed to parse JSON")
    };
    (status, value)
}

async fn create_genre(app: &axum::Router, name: &str) -> u64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/admin/genres",
        Some(ADMIN),
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_u64().unwrap()
}

async fn create_story(
    app: &axum::Router,
    title: &str,
    genre_ids: &[u64],
    lists: &[&str],
) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/admin/stories",
        Some(ADMIN),
        Some(json!({
            "title": title,
            "author": "Mina Park",
            "coverUrl": format!("https://cdn.example.com/{}.jpg", title),
            "description": "A climber wakes up in a tower.",
            "genreIds": genre_ids,
            "displayLists": lists,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _temp_db) = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_story_then_get_by_id() {
    let (app, _temp_db) = setup_test_app();
    let action = create_genre(&app, "Action").await;

    let id = create_story(&app, "Solo Climber", &[action], &[]).await;
    assert!(!id.is_empty());

    let (status, story) = send(&app, "GET", &format!("/api/stories/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(story["id"], id);
    assert_eq!(story["title"], "Solo Climber");
    assert_eq!(story["author"], "Mina Park");
    assert_eq!(story["coverUrl"], "https://cdn.example.com/Solo Climber.jpg");
    assert_eq!(story["status"], "ongoing");
    assert_eq!(story["genres"], json!(["Action"]));
    assert_eq!(story["genreIds"], json!([action]));
    assert_eq!(story["lastChapterNumber"], 0);
    assert_eq!(story["chapters"], json!([]));
}

#[tokio::test]
async fn test_create_story_validation() {
    let (app, _temp_db) = setup_test_app();
    let action = create_genre(&app, "Action").await;

    let cases = [
        json!({ "title": "", "author": "A", "coverUrl": "c", "genreIds": [action] }),
        json!({ "title": "T", "author": " ", "coverUrl": "c", "genreIds": [action] }),
        json!({ "title": "T", "author": "A", "coverUrl": "", "genreIds": [action] }),
        json!({ "title": "T", "author": "A", "coverUrl": "c", "genreIds": [] }),
        json!({ "title": "T", "author": "A", "coverUrl": "c", "genreIds": [999] }),
    ];

    for payload in cases {
        let (status, body) =
            send(&app, "POST", "/api/admin/stories", Some(ADMIN), Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    let (_, stories) = send(&app, "GET", "/api/stories", None, None).await;
    assert_eq!(stories, json!([]));
}

#[tokio::test]
async fn test_home_feed_sections() {
    let (app, _temp_db) = setup_test_app();
    let genre = create_genre(&app, "Fantasy").await;

    let first = create_story(&app, "First", &[genre], &["banners", "most_viewed"]).await;
    let second = create_story(&app, "Second", &[genre], &["banners", "completed_stories"]).await;
    create_story(&app, "Hidden", &[genre], &["trending_list"]).await;

    let (status, feed) = send(&app, "GET", "/api/home", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let ids = |section: &Value| -> Vec<String> {
        section
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_str().unwrap().to_string())
            .collect()
    };
    assert_eq!(ids(&feed["banners"]), vec![first.clone(), second.clone()]);
    assert_eq!(ids(&feed["mostViewed"]), vec![first]);
    assert_eq!(ids(&feed["completedStories"]), vec![second]);
    assert!(ids(&feed["newUpdates"]).is_empty());

    let (status, trending) = send(&app, "GET", "/api/sections/trending_list", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trending.as_array().unwrap().len(), 1);
    assert_eq!(trending[0]["title"], "Hidden");

    let (status, _) = send(&app, "GET", "/api/sections/top_rated", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_story_moves_between_display_lists() {
    let (app, _temp_db) = setup_test_app();
    let genre = create_genre(&app, "Drama").await;
    let id = create_story(&app, "Moving", &[genre], &["banners", "new_releases"]).await;

    let (status, story) = send(
        &app,
        "PATCH",
        &format!("/api/admin/stories/{}", id),
        Some(ADMIN),
        Some(json!({
            "status": "completed",
            "displayLists": ["trending_list", "new_releases"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(story["status"], "completed");
    assert_eq!(story["title"], "Moving");

    let (_, lists) = send(
        &app,
        "GET",
        &format!("/api/admin/stories/{}/display-lists", id),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(lists, json!(["trending_list", "new_releases"]));

    let (_, banners) = send(&app, "GET", "/api/sections/banners", None, None).await;
    assert_eq!(banners, json!([]));
}

#[tokio::test]
async fn test_add_chapters_and_read_them() {
    let (app, _temp_db) = setup_test_app();
    let genre = create_genre(&app, "Action").await;
    let id = create_story(&app, "Chaptered", &[genre], &[]).await;

    for expected in 1..=3u64 {
        let (status, chapter) = send(
            &app,
            "POST",
            &format!("/api/admin/stories/{}/chapters", id),
            Some(ADMIN),
            Some(json!({
                "title": "",
                "pages": [format!("https://cdn.example.com/{}/{}/1.jpg", id, expected)],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(chapter["number"], expected);
        assert_eq!(chapter["id"], expected);
        assert_eq!(chapter["title"], format!("Chapter {}", expected));
    }

    let (_, chapters) = send(
        &app,
        "GET",
        &format!("/api/stories/{}/chapters", id),
        None,
        None,
    )
    .await;
    let numbers: Vec<u64> = chapters
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["number"].as_u64().unwrap())
        .collect();
    assert_eq!(numbers, vec![1, 2, 3]);

    let (status, chapter) = send(
        &app,
        "GET",
        &format!("/api/stories/{}/chapters/2", id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chapter["pages"].as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/stories/{}/chapters/9", id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, story) = send(&app, "GET", &format!("/api/stories/{}", id), None, None).await;
    assert_eq!(story["lastChapterNumber"], 3);
}

#[tokio::test]
async fn test_add_chapter_requires_pages() {
    let (app, _temp_db) = setup_test_app();
    let genre = create_genre(&app, "Action").await;
    let id = create_story(&app, "Empty", &[genre], &[]).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/admin/stories/{}/chapters", id),
        Some(ADMIN),
        Some(json!({ "title": "Nothing", "pages": ["  "] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/stories/missing/chapters",
        Some(ADMIN),
        Some(json!({ "pages": ["https://cdn.example.com/p.jpg"] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stories_by_genre() {
    let (app, _temp_db) = setup_test_app();
    let action = create_genre(&app, "Action").await;
    let romance = create_genre(&app, "Romance").await;

    create_story(&app, "Fights", &[action], &[]).await;
    create_story(&app, "Both", &[action, romance], &[]).await;
    create_story(&app, "Letters", &[romance], &[]).await;

    let (_, genres) = send(&app, "GET", "/api/genres", None, None).await;
    assert_eq!(genres.as_array().unwrap().len(), 2);

    let (status, stories) = send(
        &app,
        "GET",
        &format!("/api/genres/{}/stories", romance),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let mut titles: Vec<&str> = stories
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["title"].as_str().unwrap())
        .collect();
    titles.sort();
    assert_eq!(titles, vec!["Both", "Letters"]);
}

#[tokio::test]
async fn test_duplicate_genre_conflicts() {
    let (app, _temp_db) = setup_test_app();
    create_genre(&app, "Horror").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/genres",
        Some(ADMIN),
        Some(json!({ "name": "horror" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_delete_story_removes_everything() {
    let (app, _temp_db) = setup_test_app();
    let genre = create_genre(&app, "Action").await;
    let id = create_story(&app, "Doomed", &[genre], &["banners"]).await;
    send(
        &app,
        "POST",
        &format!("/api/admin/stories/{}/chapters", id),
        Some(ADMIN),
        Some(json!({ "pages": ["https://cdn.example.com/p.jpg"] })),
    )
    .await;

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/admin/stories/{}", id),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted_id"], id);

    let (status, _) = send(&app, "GET", &format!("/api/stories/{}", id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, banners) = send(&app, "GET", "/api/sections/banners", None, None).await;
    assert_eq!(banners, json!([]));

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/admin/stories/{}", id),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reader_session_flow() {
    let (app, _temp_db) = setup_test_app();
    let genre = create_genre(&app, "Action").await;
    let id = create_story(&app, "Readable", &[genre], &[]).await;
    for _ in 0..2 {
        send(
            &app,
            "POST",
            &format!("/api/admin/stories/{}/chapters", id),
            Some(ADMIN),
            Some(json!({ "pages": ["https://cdn.example.com/p.jpg"] })),
        )
        .await;
    }
    send(
        &app,
        "PUT",
        "/api/settings/dark-mode",
        None,
        Some(json!({ "enabled": true })),
    )
    .await;

    let (status, _) = send(&app, "GET", "/api/reader", Some(READER), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, state) = send(
        &app,
        "POST",
        "/api/reader/open",
        Some(READER),
        Some(json!({ "storyId": id, "chapterId": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state["chapterId"], 1);
    assert_eq!(state["totalChapters"], 2);
    assert_eq!(state["darkMode"], true);
    assert_eq!(state["menu"], "visible");

    let (_, menu) = send(&app, "POST", "/api/reader/menu", Some(READER), None).await;
    assert_eq!(menu, "hidden");

    let (_, state) = send(
        &app,
        "PUT",
        "/api/reader/preferences",
        Some(READER),
        Some(json!({ "mode": "horizontal", "font": "serif" })),
    )
    .await;
    assert_eq!(state["mode"], "horizontal");
    assert_eq!(state["font"], "serif");
    assert_eq!(state["menu"], "hidden");

    let (_, nav) = send(&app, "POST", "/api/reader/next", Some(READER), None).await;
    assert_eq!(nav["moved"], true);
    assert_eq!(nav["state"]["chapterId"], 2);

    let (_, nav) = send(&app, "POST", "/api/reader/next", Some(READER), None).await;
    assert_eq!(nav["moved"], false);
    assert_eq!(nav["state"]["chapterId"], 2);

    let (_, history) = send(&app, "GET", "/api/me/history", Some(READER), None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["chapterId"], 2);
}

#[tokio::test]
async fn test_story_engagement_routes() {
    let (app, _temp_db) = setup_test_app();
    let genre = create_genre(&app, "Romance").await;
    let id = create_story(&app, "Engaged", &[genre], &[]).await;

    let (status, body) = send(&app, "POST", &format!("/api/stories/{}/view", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["viewCount"], 1);

    let (status, _) = send(&app, "POST", "/api/stories/nope/view", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let rating_uri = format!("/api/stories/{}/rating", id);
    let (status, _) = send(&app, "POST", &rating_uri, None, Some(json!({ "score": 4 }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, rating) =
        send(&app, "POST", &rating_uri, Some(READER), Some(json!({ "score": 4 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rating["rating"], 4.0);
    assert_eq!(rating["ratingCount"], 1);

    let (status, body) =
        send(&app, "POST", &rating_uri, Some(READER), Some(json!({ "score": 9 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    let comments_uri = format!("/api/stories/{}/comments", id);
    let (status, comment) = send(
        &app,
        "POST",
        &comments_uri,
        Some(READER),
        Some(json!({ "content": "Great art" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["userName"], READER);

    let (status, body) = send(
        &app,
        "POST",
        &comments_uri,
        Some(READER),
        Some(json!({ "content": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, comments) = send(&app, "GET", &comments_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comments.as_array().unwrap().len(), 1);
    assert_eq!(comments[0]["content"], "Great art");
}

#[tokio::test]
async fn test_favorites_and_history_routes() {
    let (app, _temp_db) = setup_test_app();
    let genre = create_genre(&app, "Comedy").await;
    let id = create_story(&app, "Kept", &[genre], &[]).await;
    send(
        &app,
        "POST",
        &format!("/api/admin/stories/{}/chapters", id),
        Some(ADMIN),
        Some(json!({ "pages": ["https://cdn.example.com/kept/1.jpg"] })),
    )
    .await;

    let favorite_uri = format!("/api/me/favorites/{}", id);
    let (status, _) = send(&app, "PUT", &favorite_uri, Some(READER), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "PUT", "/api/me/favorites/nope", Some(READER), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, favorites) = send(&app, "GET", "/api/me/favorites", Some(READER), None).await;
    assert_eq!(favorites.as_array().unwrap().len(), 1);
    assert_eq!(favorites[0]["id"], id);

    let (status, _) = send(&app, "DELETE", &favorite_uri, Some(READER), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(&app, "DELETE", &favorite_uri, Some(READER), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");

    let history_uri = format!("/api/me/history/{}", id);
    let (status, entry) = send(
        &app,
        "PUT",
        &history_uri,
        Some(READER),
        Some(json!({ "chapterId": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["chapterId"], 1);

    let (status, _) = send(
        &app,
        "PUT",
        &history_uri,
        Some(READER),
        Some(json!({ "chapterId": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", &history_uri, Some(READER), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &history_uri, Some(READER), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, history) = send(&app, "GET", "/api/me/history", Some(READER), None).await;
    assert_eq!(history, json!([]));
}

#[tokio::test]
async fn test_user_id_with_key_separator_is_rejected() {
    let (app, _temp_db) = setup_test_app();
    let genre = create_genre(&app, "Horror").await;
    let id = create_story(&app, "Shared", &[genre], &[]).await;

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/me/favorites/{}", id),
        Some("reader-1:other"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, favorites) = send(&app, "GET", "/api/me/favorites", Some(READER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(favorites, json!([]));
}

#[tokio::test]
async fn test_download_routes() {
    let (app, _temp_db) = setup_test_app();
    let genre = create_genre(&app, "Sports").await;
    let id = create_story(&app, "Offline", &[genre], &[]).await;
    send(
        &app,
        "POST",
        &format!("/api/admin/stories/{}/chapters", id),
        Some(ADMIN),
        Some(json!({ "pages": ["https://cdn.example.com/offline/1.jpg"] })),
    )
    .await;

    let (status, item) = send(
        &app,
        "POST",
        "/api/downloads",
        None,
        Some(json!({ "storyId": id, "chapter": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(item["storyId"], id);
    assert_eq!(item["chapter"], 1);

    let (status, _) = send(
        &app,
        "POST",
        "/api/downloads",
        None,
        Some(json!({ "storyId": id, "chapter": 9 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, items) = send(&app, "GET", "/api/downloads", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(items.as_array().unwrap().len(), 1);

    let remove_uri = format!("/api/downloads/{}/1", id);
    let (status, _) = send(&app, "DELETE", &remove_uri, None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(&app, "DELETE", &remove_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");

    let (_, items) = send(&app, "GET", "/api/downloads", None, None).await;
    assert_eq!(items, json!([]));
}
