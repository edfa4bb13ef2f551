//! REST API integration tests
//!
//! Requests go through the full router, auth layer included, with
//! `tower::ServiceExt::oneshot`.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use taskmesh::shared::acl::Resource;
use taskmesh::shared::permission::PermissionSet;

use crate::common::*;

async fn send(router: Router, method: Method, uri: &str, user: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, auth_header(&generate_test_token(user)));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_health_needs_no_token() {
    let app = TestApp::new();
    let (status, body) = send(app.router(), Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_protected_routes_reject_missing_or_bad_tokens() {
    let app = TestApp::new();
    let (status, _) = send(app.router(), Method::GET, "/api/tasks", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/tasks")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/tasks")
        .header(header::AUTHORIZATION, "Basic YWxpY2U6c2VjcmV0")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::new();
    let (status, body) = send(app.router(), Method::GET, "/api/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn test_task_crud_over_http() {
    let app = TestApp::new();

    let (status, created) = send(
        app.router(),
        Method::POST,
        "/api/tasks",
        Some("alice"),
        Some(json!({ "title": "Repair the tractor", "priority": "High" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["version"], 1);
    assert_eq!(created["owner_id"], "alice");
    assert_eq!(created["vector_clock"], json!({ "alice": 1 }));
    let id = created["id"].as_str().unwrap().to_string();

    let (status, listed) = send(app.router(), Method::GET, "/api/tasks", Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let uri = format!("/api/tasks/{}", id);
    let (status, updated) = send(
        app.router(),
        Method::PUT,
        &uri,
        Some("alice"),
        Some(json!({ "status": "InProgress" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["version"], 2);
    assert_eq!(updated["status"], "InProgress");

    let (status, events) = send(app.router(), Method::GET, &format!("{}/events", uri), Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(events.as_array().map(Vec::len), Some(2));

    let (status, _) = send(app.router(), Method::DELETE, &uri, Some("alice"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(app.router(), Method::GET, &uri, Some("alice"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_client_supplied_task_id() {
    let app = TestApp::new();
    let body = json!({ "id": "tablet-7", "title": "Log rainfall" });

    let (status, created) = send(app.router(), Method::POST, "/api/tasks", Some("alice"), Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], "tablet-7");

    let (status, error) = send(app.router(), Method::POST, "/api/tasks", Some("alice"), Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["status"], 409);
}

#[tokio::test]
async fn test_permission_errors_render_as_json() {
    let app = TestApp::new();
    let task = app.create_task("alice", "Check the well").await;
    app.grant_user("alice", &Resource::task(&task.id), "bob", PermissionSet::VIEWER)
        .await;

    let uri = format!("/api/tasks/{}", task.id);
    let (status, _) = send(app.router(), Method::GET, &uri, Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, error) = send(
        app.router(),
        Method::PUT,
        &uri,
        Some("bob"),
        Some(json!({ "title": "Fill the well" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error["status"], 403);
    assert!(error["error"].as_str().is_some());
}

#[tokio::test]
async fn test_acl_endpoints() {
    let app = TestApp::new();
    let task = app.create_task("alice", "Count the sheep").await;

    let (status, entry) = send(
        app.router(),
        Method::POST,
        "/api/acl",
        Some("alice"),
        Some(json!({
            "resource_id": task.id,
            "resource_type": "TASK",
            "grantee_type": "USER",
            "grantee_id": "bob",
            "permissions": "editor"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["permissions"], 3);

    let (status, shared) = send(
        app.router(),
        Method::POST,
        "/api/share",
        Some("alice"),
        Some(json!({
            "resource_id": task.id,
            "resource_type": "TASK",
            "share_with": [{ "type": "TEAM", "id": "growers", "role": "viewer" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(shared.as_array().map(Vec::len), Some(1));

    let list_uri = format!("/api/acl/{}?resource_type=TASK", task.id);
    let (status, grants) = send(app.router(), Method::GET, &list_uri, Some("alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(grants.as_array().map(Vec::len), Some(2));

    let (status, with_bob) = send(app.router(), Method::GET, "/api/shared-with-me", Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(with_bob[0]["resource_id"], task.id.as_str());

    let (status, by_alice) = send(
        app.router(),
        Method::GET,
        "/api/shared-by-me?resource_type=TASK",
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_alice.as_array().map(Vec::len), Some(1));

    let revoke_uri = format!("/api/acl/{}?resource_type=TASK&grantee_type=USER&grantee_id=bob", task.id);
    for _ in 0..2 {
        let (status, _) = send(app.router(), Method::DELETE, &revoke_uri, Some("alice"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
    assert_eq!(app.store.ace_count().await, 1);
}

#[tokio::test]
async fn test_unknown_resource_type_is_not_found() {
    let app = TestApp::new();
    let (status, error) = send(
        app.router(),
        Method::GET,
        "/api/acl/anything?resource_type=WIDGET",
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["status"], 404);

    let (status, _) = send(
        app.router(),
        Method::GET,
        "/api/shared-with-me?resource_type=WIDGET",
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sync_endpoint() {
    let app = TestApp::new();
    let (status, response) = send(
        app.router(),
        Method::POST,
        "/api/tasks/sync",
        Some("alice"),
        Some(json!({
            "last_pulled_version": 0,
            "changes": [
                { "type": "CREATE", "resource_id": "offline-1", "payload": { "title": "Buy feed" } },
                { "type": "DELETE", "resource_id": "someone-elses" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["synced_count"], 1);
    assert_eq!(response["new_resources"][0]["id"], "offline-1");
}

#[tokio::test]
async fn test_websocket_route_requires_upgrade() {
    let app = TestApp::new();
    let (status, _) = send(app.router(), Method::GET, "/api/tasks/ws", Some("alice"), None).await;
    assert!(status.is_client_error());
    assert_ne!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(app.router(), Method::GET, "/api/tasks/ws", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
