mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use common::{seed_sqlite, USERS_AND_LOGS};
use vectora_backend::api;
use vectora_backend::config::AppConfig;
use vectora_backend::search::{IndexBuilder, QueryEngine};
use vectora_backend::state::AppState;

async fn app_for(url: &str, index: &Path) -> (Router, Arc<AppState>) {
    IndexBuilder::new().build_from_url(url, index).await.unwrap();
    let engine = QueryEngine::open(index).unwrap();

    let mut config = AppConfig::default();
    config.index.path = index.to_string_lossy().to_string();
    let state = Arc::new(AppState::new(config, Some(url.to_string()), engine));
    (api::router(state.clone()), state)
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_health_tables_and_tools() {
    let dir = tempfile::tempdir().unwrap();
    let url = seed_sqlite(&dir.path().join("source.db"), USERS_AND_LOGS).await;
    let (app, _) = app_for(&url, &dir.path().join("index")).await;

    let (status, body) = send(&app, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, "GET", "/tables").await;
    assert_eq!(status, StatusCode::OK);
    let tables = body["tables"].as_array().unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0]["table"], "users");
    assert_eq!(tables[0]["row_count"], 2);
    assert_eq!(tables[0]["has_created_at"], false);

    let (status, body) = send(&app, "GET", "/tools").await;
    assert_eq!(status, StatusCode::OK);
    let tool = &body["tools"][0];
    assert_eq!(tool["table"], "users");
    assert_eq!(tool["search_tool"]["name"], "search_users");
    assert_eq!(tool["lookup_tool"]["name"], "get_users_by_id");
    assert_eq!(tool["endpoints"]["search"], "/search?table=users");
    assert_eq!(tool["endpoints"]["lookup"], "/users/{id}");
}

#[tokio::test]
async fn test_search_and_lookup_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let url = seed_sqlite(&dir.path().join("source.db"), USERS_AND_LOGS).await;
    let (app, _) = app_for(&url, &dir.path().join("index")).await;

    let (status, body) = send(&app, "GET", "/search?q=a&table=users&limit=abc").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["limit"], 50);
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["id"], "1");
    assert_eq!(body["results"][0]["fields"]["name"], "a");

    let (status, body) = send(&app, "GET", "/search?table=users&limit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, "GET", "/search?query=nosuchfield%3Aabc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Search failed");
    assert!(body["message"].is_string());

    let (status, body) = send(&app, "GET", "/users/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["table"], "users");
    assert_eq!(body["fields"]["name"], "b");
    assert!(body["created_at"].is_null());

    let (status, body) = send(&app, "GET", "/users/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");
}

#[tokio::test]
async fn test_rebuild_swaps_engine() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source.db");
    let url = seed_sqlite(&source, USERS_AND_LOGS).await;
    let (app, state) = app_for(&url, &dir.path().join("index")).await;

    let (_, body) = send(&app, "GET", "/admin/index/status").await;
    assert_eq!(body["code"], 200);
    assert_eq!(body["data"]["status"], "idle");

    seed_sqlite(
        &source,
        &[
            "CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT)",
            "INSERT INTO posts VALUES (1, 'hello')",
        ],
    )
    .await;

    let (status, body) = send(&app, "POST", "/admin/index/rebuild").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);

    let mut waited = 0;
    while state.index_state.is_running() && waited < 100 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        waited += 1;
    }
    assert!(!state.index_state.is_running());

    let (_, body) = send(&app, "GET", "/admin/index/status").await;
    assert_eq!(body["data"]["status"], "idle");
    assert_eq!(body["data"]["tables_indexed"], 2);
    assert_eq!(body["data"]["rows_indexed"], 3);

    let (status, body) = send(&app, "GET", "/posts/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fields"]["title"], "hello");
}

#[tokio::test]
async fn test_rebuild_rejected_while_running() {
    let dir = tempfile::tempdir().unwrap();
    let url = seed_sqlite(&dir.path().join("source.db"), USERS_AND_LOGS).await;
    let (app, state) = app_for(&url, &dir.path().join("index")).await;

    assert!(state.index_state.try_start());
    let (status, body) = send(&app, "POST", "/admin/index/rebuild").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 409);
    state.index_state.finish(None);
}
