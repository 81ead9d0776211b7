use axum::http::StatusCode;
use serde_json::json;

mod common;

use common::{
    as_user, create_session, create_test_app, end_question, planned_questions, send,
    submit_answer, HOST,
};

async fn session_with_answers(app: &axum::Router, anonymity: &str) -> String {
    let session_id = create_session(
        app,
        json!({
            "name": "Lecture 5 recap",
            "anonymity": anonymity,
            "questions": planned_questions()
        }),
    )
    .await;

    for student in ["alice", "bob"] {
        send(
            app,
            "POST",
            &format!("/api/v1/sessions/{}/join", session_id),
            &as_user(student),
            None,
        )
        .await;
    }
    send(
        app,
        "POST",
        &format!("/api/v1/sessions/{}/start", session_id),
        &as_user(HOST),
        None,
    )
    .await;
    send(
        app,
        "POST",
        &format!("/api/v1/sessions/{}/questions", session_id),
        &as_user(HOST),
        Some(json!({ "method": "next" })),
    )
    .await;
    submit_answer(app, &session_id, "alice", 1, &["Paris"]).await;
    submit_answer(app, &session_id, "bob", 1, &["Lyon"]).await;
    end_question(app, &session_id).await;
    session_id
}

#[tokio::test]
async fn test_export_layout() {
    let app = create_test_app();
    let session_id = session_with_answers(&app, "identified").await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/sessions/{}/export", session_id),
        &as_user(HOST),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let csv = body.as_str().unwrap();

    let mut lines = csv.split("\r\n");
    assert_eq!(lines.next(), Some("sep=\t"));
    assert_eq!(
        lines.next(),
        Some("Participant\tCapital of France (short_answer)")
    );
    let rows: Vec<&str> = lines.filter(|l| !l.is_empty()).collect();
    assert_eq!(rows.len(), 2);
    assert!(rows.contains(&"alice\tParis"));
    assert!(rows.contains(&"bob\tLyon"));
}

#[tokio::test]
async fn test_export_hides_names_when_answers_anonymous() {
    let app = create_test_app();
    let session_id = session_with_answers(&app, "anonymous_answers").await;

    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/v1/sessions/{}/export", session_id),
        &as_user(HOST),
        None,
    )
    .await;
    let csv = body.as_str().unwrap();
    assert!(!csv.contains("alice"));
    assert!(csv.contains("Anonymous\tParis"));
}

#[tokio::test]
async fn test_export_requires_host() {
    let app = create_test_app();
    let session_id = session_with_answers(&app, "identified").await;

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/v1/sessions/{}/export", session_id),
        &as_user("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_attendance_lists_counts() {
    let app = create_test_app();
    let session_id = session_with_answers(&app, "identified").await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/sessions/{}/attendance", session_id),
        &as_user(HOST),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    for entry in entries {
        assert_eq!(entry["count"], 1);
        assert!(entry["name"] == "alice" || entry["name"] == "bob");
    }
}

#[tokio::test]
async fn test_attendance_anonymized_when_fully_anonymous() {
    let app = create_test_app();
    let session_id = session_with_answers(&app, "fully_anonymous").await;

    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/v1/sessions/{}/attendance", session_id),
        &as_user(HOST),
        None,
    )
    .await;
    for entry in body.as_array().unwrap() {
        assert_eq!(entry["name"], "Anonymous");
    }
}

#[tokio::test]
async fn test_close_scrubs_identities_per_policy() {
    let app = create_test_app();
    let session_id = session_with_answers(&app, "anonymous_answers").await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/sessions/{}/close", session_id),
        &as_user(HOST),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Export after close still works, with answers detached from names
    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/sessions/{}/export", session_id),
        &as_user(HOST),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let csv = body.as_str().unwrap();
    assert!(!csv.contains("alice") && !csv.contains("bob"));

    // Attendance names survive: only answers were anonymous
    let (_, attendance) = send(
        &app,
        "GET",
        &format!("/api/v1/sessions/{}/attendance", session_id),
        &as_user(HOST),
        None,
    )
    .await;
    let names: Vec<&str> = attendance
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"alice") && names.contains(&"bob"));
}
