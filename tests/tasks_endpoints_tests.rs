use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use taskboard_server::auth::{AuthState, encode_jwt};
use taskboard_server::db::Db;
use taskboard_server::task::TaskState;
use taskboard_server::web::create_app;
use tower::ServiceExt;

mod common;

const JWT_SECRET: &str = "endpoint-test-secret";

/// Builds the full application router over a fresh in-memory database.
async fn setup_app() -> anyhow::Result<Router> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    let db = common::setup_db().await?;
    let auth_state = Arc::new(AuthState {
        jwt_secret: JWT_SECRET.to_string(),
    });
    let task_state = Arc::new(TaskState {
        db: Db::from_connection(db),
    });
    Ok(create_app(auth_state, task_state))
}

/// Sends one request, optionally authenticated as `user`, with an optional
/// JSON body. Returns the status and the parsed response body (Null when
/// the body is empty).
async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        let token = encode_jwt(user, JWT_SECRET).await.unwrap();
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Creates a task through the API and returns its id.
async fn create_task(app: &Router, user: &str, title: &str, description: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/tasks",
        Some(user),
        Some(json!({ "title": title, "description": description })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().expect("created task has an id")
}

#[tokio::test]
async fn health_endpoint_is_public() {
    let app = setup_app().await.expect("Failed to setup test app");

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
}

#[tokio::test]
async fn task_endpoints_require_authentication() {
    let app = setup_app().await.expect("Failed to setup test app");

    for (method, uri) in [
        (Method::GET, "/tasks"),
        (Method::POST, "/tasks"),
        (Method::PUT, "/tasks/1"),
        (Method::DELETE, "/tasks/1"),
    ] {
        let (status, body) = send(&app, method.clone(), uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(body["error"], "UNAUTHORIZED");
    }
}

#[tokio::test]
async fn create_returns_201_with_the_created_task() {
    let app = setup_app().await.expect("Failed to setup test app");

    let (status, body) = send(
        &app,
        Method::POST,
        "/tasks",
        Some("alice"),
        Some(json!({ "title": "Buy milk", "description": "Semi-skimmed" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["title"], "Buy milk");
    assert_eq!(body["description"], "Semi-skimmed");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["ownerId"], "alice");
    assert!(body["createdAt"].is_string());
    assert!(body["updatedAt"].is_string());
}

#[tokio::test]
async fn create_without_required_fields_returns_400() {
    let app = setup_app().await.expect("Failed to setup test app");

    let (status, body) = send(
        &app,
        Method::POST,
        "/tasks",
        Some("alice"),
        Some(json!({ "description": "No title here" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(body["message"], "Title is required");

    let (_, body) = send(&app, Method::GET, "/tasks", Some("alice"), None).await;
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn list_returns_the_page_envelope() {
    let app = setup_app().await.expect("Failed to setup test app");
    for i in 1..=3 {
        create_task(&app, "alice", &format!("Task {i}"), "details").await;
    }

    let (status, body) = send(
        &app,
        Method::GET,
        "/tasks?page=1&limit=2",
        Some("alice"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tasks"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["limit"], 2);
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["pages"], 2);
}

#[tokio::test]
async fn list_filters_by_status_and_search() {
    let app = setup_app().await.expect("Failed to setup test app");
    create_task(&app, "alice", "Buy milk", "From the corner shop").await;
    let done_id = create_task(&app, "alice", "Walk dog", "Around the block").await;
    send(
        &app,
        Method::PUT,
        &format!("/tasks/{done_id}"),
        Some("alice"),
        Some(json!({
            "title": "Walk dog",
            "description": "Around the block",
            "status": "done"
        })),
    )
    .await;

    let (_, body) = send(&app, Method::GET, "/tasks?status=done", Some("alice"), None).await;
    let tasks = body["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["title"], "Walk dog");

    let (_, body) = send(&app, Method::GET, "/tasks?status=all", Some("alice"), None).await;
    assert_eq!(body["tasks"].as_array().unwrap().len(), 2);

    let (_, body) = send(&app, Method::GET, "/tasks?search=MILK", Some("alice"), None).await;
    let tasks = body["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["title"], "Buy milk");
}

#[tokio::test]
async fn unknown_status_query_value_returns_400() {
    let app = setup_app().await.expect("Failed to setup test app");
    create_task(&app, "alice", "Buy milk", "Semi-skimmed").await;

    let (status, body) = send(&app, Method::GET, "/tasks?status=bogus", Some("alice"), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn unknown_status_in_request_body_returns_400_envelope() {
    let app = setup_app().await.expect("Failed to setup test app");
    let id = create_task(&app, "alice", "Buy milk", "Semi-skimmed").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/tasks",
        Some("alice"),
        Some(json!({ "title": "Buy milk", "description": "x", "status": "bogus" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/tasks/{id}"),
        Some("alice"),
        Some(json!({ "title": "Buy milk", "description": "x", "status": "bogus" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    // The malformed update left the task untouched.
    let (_, body) = send(&app, Method::GET, &format!("/tasks/{id}"), Some("alice"), None).await;
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn tasks_are_invisible_across_owners() {
    let app = setup_app().await.expect("Failed to setup test app");
    let id = create_task(&app, "alice", "Buy milk", "Semi-skimmed").await;

    let (status, _) = send(&app, Method::GET, "/tasks", Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/tasks/{id}"),
        Some("bob"),
        Some(json!({
            "title": "Stolen",
            "description": "Changed",
            "status": "done"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/tasks/{id}"),
        Some("bob"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The owner still sees the task untouched.
    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/tasks/{id}"),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Buy milk");
}

#[tokio::test]
async fn update_returns_the_updated_task() {
    let app = setup_app().await.expect("Failed to setup test app");
    let id = create_task(&app, "alice", "Buy milk", "Semi-skimmed").await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/tasks/{id}"),
        Some("alice"),
        Some(json!({
            "title": "Buy oat milk",
            "description": "The barista kind",
            "status": "done"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Buy oat milk");
    assert_eq!(body["status"], "done");
}

#[tokio::test]
async fn delete_returns_204_then_404() {
    let app = setup_app().await.expect("Failed to setup test app");
    let id = create_task(&app, "alice", "Buy milk", "Semi-skimmed").await;

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/tasks/{id}"),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/tasks/{id}"),
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}
