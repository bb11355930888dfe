//! API integration tests.
//!
//! These drive the full router, including the auth middleware, against a mock
//! database. Mock query results are consumed in the order the request issues
//! its queries: the bearer-token lookup always comes first.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::DefaultBodyLimit,
    http::{Request, StatusCode, header},
    middleware,
};
use chrono::Utc;
use civic_api::{
    middleware::{AppState, auth_middleware},
    router as api_router,
};
use civic_common::LocalStorage;
use civic_db::entities::{
    issue::{self, IssueStatus},
    issue_photo, user,
};
use sea_orm::{DatabaseBackend, MockDatabase, Value};
use serde_json::Value as Json;
use tower::ServiceExt;

const BOUNDARY: &str = "civic-test-boundary";
const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

fn test_user(id: &str, is_admin: bool) -> user::Model {
    user::Model {
        id: id.to_string(),
        username: format!("{id}-name"),
        token: Some(format!("{id}-token")),
        is_admin,
        created_at: Utc::now().into(),
    }
}

fn test_issue(id: &str, user_id: &str, status: IssueStatus) -> issue::Model {
    let now = Utc::now();
    issue::Model {
        id: id.to_string(),
        user_id: user_id.to_string(),
        title: "Pothole on Main St".to_string(),
        description: "Large pothole near the bus stop".to_string(),
        category: "roads".to_string(),
        location: "Main St".to_string(),
        status,
        admin_notes: None,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

/// Create the test router with the same layers the server installs.
fn create_test_router(db: MockDatabase, storage_dir: &std::path::Path) -> Router {
    let storage = Arc::new(LocalStorage::new(
        storage_dir.to_path_buf(),
        "/storage".to_string(),
    ));
    let state = AppState::new(Arc::new(db.into_connection()), storage);

    api_router()
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(DefaultBodyLimit::max(64 * 1024 * 1024))
        .with_state(state)
}

fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, filename, data) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(token: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .uri("/issues")
        .method("POST")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Json {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

const VALID_FIELDS: [(&str, &str); 4] = [
    ("title", "Broken streetlight"),
    ("description", "Out for a week"),
    ("category", "lighting"),
    ("location", "Elm St"),
];

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_router(MockDatabase::new(DatabaseBackend::Postgres), dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/nonexistent/endpoint")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_dashboard_without_token_is_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_router(MockDatabase::new(DatabaseBackend::Postgres), dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/dashboard")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_unknown_token_is_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<user::Model>::new()]);
    let app = create_test_router(db, dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/issues")
                .header(header::AUTHORIZATION, "Bearer bogus")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_forbid_standard_users() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[test_user("u1", false)]]);
    let app = create_test_router(db, dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/admin/issues")
                .header(header::AUTHORIZATION, "Bearer u1-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_create_issue_returns_created() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[test_user("u1", false)]])
        .append_query_results([[test_issue("i1", "u1", IssueStatus::Pending)]]);
    let app = create_test_router(db, dir.path());

    let response = app
        .oneshot(multipart_request("u1-token", multipart_body(&VALID_FIELDS, &[])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Issue submitted!");
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["owner"]["id"], "u1");
    assert_eq!(body["data"]["photos"], serde_json::json!([]));
}

#[tokio::test]
async fn test_create_issue_missing_title_is_unprocessable() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[test_user("u1", false)]]);
    let app = create_test_router(db, dir.path());

    let fields = [
        ("title", "   "),
        ("description", "Out for a week"),
        ("category", "lighting"),
        ("location", "Elm St"),
    ];
    let response = app
        .oneshot(multipart_request("u1-token", multipart_body(&fields, &[])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(
        body["error"]["fields"]["title"][0],
        "The title field is required."
    );
}

#[tokio::test]
async fn test_create_issue_rejects_oversized_photo() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[test_user("u1", false)]]);
    let app = create_test_router(db, dir.path());

    let mut photo = PNG_HEADER.to_vec();
    photo.resize(6 * 1024 * 1024, 0);
    let body = multipart_body(&VALID_FIELDS, &[("photos[]", "big.png", photo.as_slice())]);

    let response = app
        .oneshot(multipart_request("u1-token", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert!(body["error"]["fields"]["photos.0"].is_array());
    assert!(!dir.path().join("issue-photos").exists());
}

#[tokio::test]
async fn test_show_issue_of_other_user_is_forbidden() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[test_user("u1", false)]])
        .append_query_results([[test_issue("i1", "u2", IssueStatus::Pending)]]);
    let app = create_test_router(db, dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/issues/i1")
                .header(header::AUTHORIZATION, "Bearer u1-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_community_progress_is_public() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[maplit::btreemap! {
            "num_items" => Value::BigInt(Some(1)),
        }]])
        .append_query_results([[test_issue("i1", "u1", IssueStatus::Resolved)]])
        .append_query_results([[test_user("u1", false)]])
        .append_query_results([[maplit::btreemap! {
            "category" => Value::from("roads".to_string()),
        }]])
        .append_query_results([[maplit::btreemap! {
            "status" => Value::from("resolved".to_string()),
            "count" => Value::BigInt(Some(1)),
        }]])
        .append_query_results([Vec::<std::collections::BTreeMap<&str, Value>>::new()]);
    let app = create_test_router(db, dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/community-progress?category=all&search=&page=0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["pagination"]["current_page"], 1);
    assert_eq!(body["data"]["pagination"]["per_page"], 12);
    assert_eq!(body["data"]["filters"]["category"], "all");
    assert_eq!(body["data"]["issues"][0]["status"], "resolved");
    assert_eq!(body["data"]["stats"]["avg_resolution_days"], 0.0);
}

#[tokio::test]
async fn test_admin_update_with_invalid_status_is_unprocessable() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[test_user("admin", true)]])
        .append_query_results([[test_issue("i1", "u1", IssueStatus::Pending)]]);
    let app = create_test_router(db, dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/admin/issues/i1")
                .method("PATCH")
                .header(header::AUTHORIZATION, "Bearer admin-token")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"status":"closed"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(
        body["error"]["fields"]["status"][0],
        "The selected status is invalid."
    );
}

#[tokio::test]
async fn test_admin_update_with_non_string_status_is_unprocessable() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[test_user("admin", true)]])
        .append_query_results([[test_issue("i1", "u1", IssueStatus::Pending)]]);
    let app = create_test_router(db, dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/admin/issues/i1")
                .method("PATCH")
                .header(header::AUTHORIZATION, "Bearer admin-token")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"status":5}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(
        body["error"]["fields"]["status"][0],
        "The selected status is invalid."
    );
}

#[tokio::test]
async fn test_admin_update_with_malformed_json_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[test_user("admin", true)]]);
    let app = create_test_router(db, dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/admin/issues/i1")
                .method("PATCH")
                .header(header::AUTHORIZATION, "Bearer admin-token")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"status":"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_admin_update_resolves_issue() {
    let dir = tempfile::tempdir().unwrap();
    let mut updated = test_issue("i1", "u1", IssueStatus::Resolved);
    updated.admin_notes = Some("fixed pothole".to_string());

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[test_user("admin", true)]])
        .append_query_results([[test_issue("i1", "u1", IssueStatus::Pending)]])
        .append_query_results([[updated]])
        .append_query_results([[test_user("u1", false)]])
        .append_query_results([Vec::<issue_photo::Model>::new()]);
    let app = create_test_router(db, dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/admin/issues/i1")
                .method("PATCH")
                .header(header::AUTHORIZATION, "Bearer admin-token")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"status":"resolved","admin_notes":"fixed pothole"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Issue updated successfully!");
    assert_eq!(body["data"]["status"], "resolved");
    assert_eq!(body["data"]["admin_notes"], "fixed pothole");
    assert_eq!(body["data"]["owner"]["username"], "u1-name");
}
