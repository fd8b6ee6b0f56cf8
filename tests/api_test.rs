mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use bucket_unzip::{AppState, create_app};
use common::{MemoryBlobStore, build_zip, test_config};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn setup(store: Arc<MemoryBlobStore>, scratch: &TempDir) -> axum::Router {
    create_app(AppState::new(store, test_config(scratch.path())))
}

fn store_with_archive() -> Arc<MemoryBlobStore> {
    let store = Arc::new(MemoryBlobStore::new());
    store.insert("A1", build_zip(&[("a.txt", b"a"), ("b.json", b"{}")]));
    store
}

async fn post(app: axum::Router, body: impl Into<Body>) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_direct_payload() {
    let scratch = TempDir::new().unwrap();
    let store = store_with_archive();
    let app = setup(store.clone(), &scratch);

    let (status, body) = post(
        app,
        json!({ "archiveId": "A1", "context": "tenant-a" }).to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["files"].as_array().unwrap().len(), 2);
    assert!(body.get("failed").is_none());
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_body_string_payload() {
    let scratch = TempDir::new().unwrap();
    let app = setup(store_with_archive(), &scratch);

    let inner = json!({ "archiveId": "A1", "context": "tenant-a" }).to_string();
    let (status, body) = post(app, json!({ "body": inner }).to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_body_raw_payload_with_legacy_names() {
    let scratch = TempDir::new().unwrap();
    let app = setup(store_with_archive(), &scratch);

    let inner = json!({ "fileId": "A1", "projectSlug": "tenant-a" }).to_string();
    let (status, body) = post(app, json!({ "bodyRaw": inner }).to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["files"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_entries_are_reported() {
    let scratch = TempDir::new().unwrap();
    let store = Arc::new(MemoryBlobStore::new().failing_on("b.json"));
    store.insert("A1", build_zip(&[("a.txt", b"a"), ("b.json", b"{}")]));
    let app = setup(store, &scratch);

    let (status, body) = post(
        app,
        json!({ "archiveId": "A1", "context": "tenant-a" }).to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["files"].as_array().unwrap().len(), 1);
    assert_eq!(body["failed"][0]["name"], "b.json");
}

#[tokio::test]
async fn test_missing_fields_fail_without_store_calls() {
    let scratch = TempDir::new().unwrap();
    let store = store_with_archive();
    let app = setup(store.clone(), &scratch);

    let (status, body) = post(app, json!({ "context": "tenant-a" }).to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("Missing archiveId or context")
    );
    assert!(body.get("files").is_none());
    assert_eq!(store.download_count(), 0);
    assert_eq!(store.upload_count(), 0);
}

#[tokio::test]
async fn test_empty_body_is_a_missing_fields_failure() {
    let scratch = TempDir::new().unwrap();
    let app = setup(store_with_archive(), &scratch);

    let (status, body) = post(app, Body::empty()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_malformed_json_yields_failure_envelope() {
    let scratch = TempDir::new().unwrap();
    let app = setup(store_with_archive(), &scratch);

    let (status, body) = post(app, "{ this is not json").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_unknown_archive_is_a_failure() {
    let scratch = TempDir::new().unwrap();
    let app = setup(Arc::new(MemoryBlobStore::new()), &scratch);

    let (status, body) = post(
        app,
        json!({ "archiveId": "missing", "context": "tenant-a" }).to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("missing"));
}

#[tokio::test]
async fn test_health_check() {
    let scratch = TempDir::new().unwrap();
    let app = setup(Arc::new(MemoryBlobStore::new()), &scratch);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "connected");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
