#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use livequiz_api::{config::Config, create_router, services::AppState};

pub fn create_test_app() -> Router {
    // Initialize tracing for tests
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let config = Config {
        bind_addr: "127.0.0.1:0".to_string(),
        metrics_auth: "admin:test".to_string(),
        default_wait_time: 0,
    };
    create_router(Arc::new(AppState::new(config)))
}

/// Fire one request and return (status, parsed body). Bodies that are not
/// JSON (CSV export, empty 204s) come back as a JSON string.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
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
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, parsed)
}

pub fn as_user(user_id: &str) -> Vec<(&str, &str)> {
    vec![("x-user-id", user_id)]
}

pub const HOST: &str = "teacher-1";

/// Two planned questions: a short-answer and a true/false.
pub fn planned_questions() -> Value {
    json!([
        {
            "name": "Capital of France",
            "kind": "short_answer",
            "text": "Name the capital of France.",
            "answers": ["Paris"],
            "time": 30
        },
        {
            "name": "Water boils at 100C",
            "kind": "true_false",
            "text": "At sea level, water boils at 100 degrees Celsius.",
            "answers": ["True"],
            "time": 0
        }
    ])
}

pub async fn create_session(app: &Router, body: Value) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/sessions",
        &[("x-user-id", HOST)],
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    body["session_id"].as_str().unwrap().to_string()
}

/// Session with the standard planned questions, quiz started, slot 1 open.
pub async fn running_session(app: &Router, student_ids: &[&str]) -> String {
    let session_id = create_session(
        app,
        json!({ "name": "Lecture 5 recap", "questions": planned_questions() }),
    )
    .await;

    for student in student_ids {
        let (status, body) = send(
            app,
            "POST",
            &format!("/api/v1/sessions/{}/join", session_id),
            &[("x-user-id", student)],
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "join failed: {}", body);
    }

    let (status, _) = send(
        app,
        "POST",
        &format!("/api/v1/sessions/{}/start", session_id),
        &[("x-user-id", HOST)],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        app,
        "POST",
        &format!("/api/v1/sessions/{}/questions", session_id),
        &[("x-user-id", HOST)],
        Some(json!({ "method": "next" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "start question failed: {}", body);
    assert_eq!(body["slot"], 1);

    session_id
}

pub async fn submit_answer(app: &Router, session_id: &str, student: &str, slot: u32, answer: &[&str]) {
    let (status, body) = send(
        app,
        "POST",
        &format!("/api/v1/sessions/{}/responses", session_id),
        &[("x-user-id", student)],
        Some(json!({ "slot": slot, "answer": answer })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "submit failed: {}", body);
}

pub async fn end_question(app: &Router, session_id: &str) {
    let (status, _) = send(
        app,
        "POST",
        &format!("/api/v1/sessions/{}/end", session_id),
        &[("x-user-id", HOST)],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
