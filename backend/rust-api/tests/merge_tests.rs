use axum::http::StatusCode;
use serde_json::{json, Value};

mod common;

use common::{as_user, create_test_app, end_question, running_session, send, submit_answer, HOST};

async fn results(app: &axum::Router, session_id: &str, slot: u32) -> Value {
    let (status, body) = send(
        app,
        "GET",
        &format!("/api/v1/sessions/{}/results?slot={}", session_id, slot),
        &[],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "results failed: {}", body);
    body
}

async fn merge(app: &axum::Router, session_id: &str, slot: u32, from: &str, into: &str) {
    let (status, body) = send(
        app,
        "POST",
        &format!("/api/v1/sessions/{}/merge", session_id),
        &as_user(HOST),
        Some(json!({ "slot": slot, "from": from, "into": into })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT, "merge failed: {}", body);
}

async fn undo(app: &axum::Router, session_id: &str, slot: u32) {
    let (status, _) = send(
        app,
        "POST",
        &format!("/api/v1/sessions/{}/merge/undo", session_id),
        &as_user(HOST),
        Some(json!({ "slot": slot })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_merge_collapses_equivalent_answers() {
    let app = create_test_app();
    let session_id = running_session(&app, &["alice", "bob", "carol"]).await;

    submit_answer(&app, &session_id, "alice", 1, &["gravity"]).await;
    submit_answer(&app, &session_id, "bob", 1, &["Gravity"]).await;
    submit_answer(&app, &session_id, "carol", 1, &["gravitation"]).await;
    end_question(&app, &session_id).await;

    let before = results(&app, &session_id, 1).await;
    assert_eq!(before["tally"].as_array().unwrap().len(), 3);
    assert_eq!(before["merge_count"], 0);

    merge(&app, &session_id, 1, "Gravity", "gravity").await;
    merge(&app, &session_id, 1, "gravitation", "gravity").await;

    let after = results(&app, &session_id, 1).await;
    assert_eq!(after["tally"].as_array().unwrap().len(), 1);
    assert_eq!(after["tally"][0]["response"], "gravity");
    assert_eq!(after["tally"][0]["count"], 3);
    assert_eq!(after["merge_count"], 2);
    // Respondent count is unaffected by view rewriting
    assert_eq!(after["responded"], 3);
}

#[tokio::test]
async fn test_undo_walks_back_in_reverse_order() {
    let app = create_test_app();
    let session_id = running_session(&app, &["alice", "bob", "carol"]).await;

    submit_answer(&app, &session_id, "alice", 1, &["gravity"]).await;
    submit_answer(&app, &session_id, "bob", 1, &["Gravity"]).await;
    submit_answer(&app, &session_id, "carol", 1, &["gravitation"]).await;
    end_question(&app, &session_id).await;

    merge(&app, &session_id, 1, "Gravity", "gravity").await;
    merge(&app, &session_id, 1, "gravitation", "gravity").await;

    undo(&app, &session_id, 1).await;
    let partial = results(&app, &session_id, 1).await;
    assert_eq!(partial["tally"].as_array().unwrap().len(), 2);
    assert_eq!(partial["merge_count"], 1);

    undo(&app, &session_id, 1).await;
    let restored = results(&app, &session_id, 1).await;
    assert_eq!(restored["tally"].as_array().unwrap().len(), 3);
    assert_eq!(restored["merge_count"], 0);

    // Undo with an empty log is a quiet no-op
    undo(&app, &session_id, 1).await;
    let unchanged = results(&app, &session_id, 1).await;
    assert_eq!(unchanged["tally"], restored["tally"]);
}

#[tokio::test]
async fn test_merge_chain_follows_latest_target() {
    let app = create_test_app();
    let session_id = running_session(&app, &["alice", "bob"]).await;

    submit_answer(&app, &session_id, "alice", 1, &["a"]).await;
    submit_answer(&app, &session_id, "bob", 1, &["b"]).await;
    end_question(&app, &session_id).await;

    merge(&app, &session_id, 1, "a", "b").await;
    merge(&app, &session_id, 1, "b", "c").await;

    let body = results(&app, &session_id, 1).await;
    assert_eq!(body["tally"].as_array().unwrap().len(), 1);
    assert_eq!(body["tally"][0]["response"], "c");
    assert_eq!(body["tally"][0]["count"], 2);
}

#[tokio::test]
async fn test_merge_is_scoped_to_its_slot() {
    let app = create_test_app();
    let session_id = running_session(&app, &["alice"]).await;

    submit_answer(&app, &session_id, "alice", 1, &["gravity"]).await;
    end_question(&app, &session_id).await;
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/sessions/{}/questions", session_id),
        &as_user(HOST),
        Some(json!({ "method": "next" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    submit_answer(&app, &session_id, "alice", 2, &["gravity"]).await;
    end_question(&app, &session_id).await;

    merge(&app, &session_id, 1, "gravity", "g").await;

    let slot1 = results(&app, &session_id, 1).await;
    assert_eq!(slot1["tally"][0]["response"], "g");
    let slot2 = results(&app, &session_id, 2).await;
    assert_eq!(slot2["tally"][0]["response"], "gravity");
}

#[tokio::test]
async fn test_merge_requires_host() {
    let app = create_test_app();
    let session_id = running_session(&app, &["alice"]).await;
    submit_answer(&app, &session_id, "alice", 1, &["x"]).await;
    end_question(&app, &session_id).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/sessions/{}/merge", session_id),
        &as_user("alice"),
        Some(json!({ "slot": 1, "from": "x", "into": "y" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_merge_into_itself_rejected() {
    let app = create_test_app();
    let session_id = running_session(&app, &["alice"]).await;
    end_question(&app, &session_id).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/sessions/{}/merge", session_id),
        &as_user(HOST),
        Some(json!({ "slot": 1, "from": "same", "into": "same" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_keywords_ranked_by_frequency() {
    let app = create_test_app();
    let session_id = running_session(&app, &["alice", "bob", "carol"]).await;

    submit_answer(&app, &session_id, "alice", 1, &["gravity pulls things down"]).await;
    submit_answer(&app, &session_id, "bob", 1, &["Gravity is the force"]).await;
    submit_answer(&app, &session_id, "carol", 1, &["gravity wins"]).await;
    end_question(&app, &session_id).await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/sessions/{}/keywords?slot=1&top_k=2", session_id),
        &[],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let words = body.as_array().unwrap();
    assert_eq!(words.len(), 2);
    // "gravity" appears three times once case-folded, everything else once
    assert_eq!(words[0]["word"], "gravity");
    assert_eq!(words[0]["weight"], 100.0);
}

#[tokio::test]
async fn test_merge_and_undo_rejected_after_close() {
    let app = create_test_app();
    let session_id = running_session(&app, &["alice", "bob"]).await;

    submit_answer(&app, &session_id, "alice", 1, &["Paris"]).await;
    submit_answer(&app, &session_id, "bob", 1, &["paris"]).await;
    end_question(&app, &session_id).await;
    merge(&app, &session_id, 1, "paris", "Paris").await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/sessions/{}/close", session_id),
        &as_user(HOST),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/sessions/{}/merge", session_id),
        &as_user(HOST),
        Some(json!({ "slot": 1, "from": "PARIS", "into": "Paris" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/sessions/{}/merge/undo", session_id),
        &as_user(HOST),
        Some(json!({ "slot": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Rules recorded before close still drive reads
    let body = results(&app, &session_id, 1).await;
    assert_eq!(body["merge_count"], 1);
    assert_eq!(body["tally"].as_array().unwrap().len(), 1);
}
