//! Route-level tests driving the router through `tower::ServiceExt::oneshot`,
//! covering the seed end-to-end scenarios: local start/diff, comment CRUD,
//! adopt/dismiss, external ingestion, and cancellation.

use crate::test_support::{fixture_repo, one_suggestion_script, test_state};
use crate::{AppState, router};
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn send(state: &AppState, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(v) => Body::from(v.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let response = router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}

#[tokio::test]
async fn healthz_reports_ok() {
    let state = test_state("fake", &one_suggestion_script("a.rs"));
    let (status, body) = send(&state, Method::GET, "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn local_start_then_diff_round_trips_the_captured_snapshot() {
    let state = test_state("fake", &one_suggestion_script("a.rs"));
    let repo = fixture_repo();
    let (status, body) =
        send(&state, Method::POST, "/api/local/start", Some(json!({"path": repo.path().to_string_lossy()}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["success"].as_bool().unwrap());
    let review_id = body["sessionId"].as_i64().unwrap();

    let (status, diff_body) = send(&state, Method::GET, &format!("/api/local/{review_id}/diff"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(diff_body["diff"].as_str().unwrap().contains("println"));
}

#[tokio::test]
async fn user_comment_crud_create_update_delete() {
    let state = test_state("fake", &one_suggestion_script("a.rs"));
    let review = state.store.upsert_local_review("/tmp/repo", "sha1", None).await.unwrap();

    let (status, created) = send(
        &state,
        Method::POST,
        &format!("/api/local/{}/user-comments", review.id),
        Some(json!({"file": "a.rs", "lineStart": 3, "commentType": "comment", "body": "looks off"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let comment_id = created["id"].as_i64().unwrap();

    let (status, updated) = send(
        &state,
        Method::PUT,
        &format!("/api/local/{}/user-comments/{comment_id}", review.id),
        Some(json!({"body": "actually fine"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["body"], "actually fine");

    let (status, deleted) =
        send(&state, Method::DELETE, &format!("/api/local/{}/user-comments/{comment_id}", review.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(deleted["dismissedSuggestionId"].is_null());

    let (_, list_body) =
        send(&state, Method::GET, &format!("/api/local/{}/user-comments", review.id), None).await;
    assert!(list_body["comments"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn adopt_then_dismiss_reuses_the_same_comment_row() {
    let state = test_state("fake", &one_suggestion_script("a.rs"));
    let review = state.store.upsert_local_review("/tmp/repo", "sha1", None).await.unwrap();
    let run = state
        .store
        .create_run(pr_store::NewRun {
            id: "01ARZTESTRUNID0000000001",
            review_id: review.id,
            provider: Some("fake"),
            model: Some("m"),
            tier: None,
            head_sha: "sha1",
            custom_instructions: None,
            repo_instructions: None,
            request_instructions: None,
            parent_run_id: None,
            config_type: pr_core::model::ConfigType::Single,
            levels_config: json!({}),
            terminal_status: Some(pr_core::model::RunStatus::Completed),
        })
        .await
        .unwrap();
    let suggestion_id = state
        .store
        .bulk_insert_suggestions(
            review.id,
            &run.id,
            Some(1),
            Some("fake:m"),
            &[pr_provider::RawSuggestion {
                file: "a.rs".into(),
                line_start: Some(1),
                line_end: Some(1),
                side: pr_core::model::Side::Right,
                is_file_level: false,
                comment_type: "bug".into(),
                title: "t".into(),
                body: "d".into(),
                confidence: Some(0.5),
                reasoning: None,
            }],
            true,
        )
        .await
        .unwrap()[0];

    let (status, adopted) = send(
        &state,
        Method::POST,
        &format!("/api/local/{}/suggestions/{suggestion_id}/adopt", review.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let adopted_id = adopted["id"].as_i64().unwrap();

    let (status, dismissed) = send(
        &state,
        Method::DELETE,
        &format!("/api/local/{}/user-comments/{adopted_id}", review.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dismissed["dismissedSuggestionId"].as_i64(), Some(suggestion_id));
}

#[tokio::test]
async fn external_ingestion_resolves_target_review_and_records_a_terminal_run() {
    let state = test_state("fake", &one_suggestion_script("a.rs"));
    let (status, body) = send(
        &state,
        Method::POST,
        "/api/analyses/results",
        Some(json!({
            "path": "/tmp/ci-repo",
            "headSha": "deadbeef",
            "suggestions": [
                {"file": "a.rs", "line_start": 1, "type": "bug", "title": "t", "description": "d"}
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["totalSuggestions"], 1);

    let (status, repeat) = send(
        &state,
        Method::POST,
        "/api/analyses/results",
        Some(json!({"path": "/tmp/ci-repo", "headSha": "deadbeef", "suggestions": []})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(repeat["reviewId"], body["reviewId"]);
    assert_ne!(repeat["runId"], body["runId"]);
}

#[tokio::test]
async fn external_ingestion_rejects_an_ambiguous_target() {
    let state = test_state("fake", &one_suggestion_script("a.rs"));
    let (status, _) = send(
        &state,
        Method::POST,
        "/api/analyses/results",
        Some(json!({"path": "/tmp/x", "suggestions": []})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn analyze_then_cancel_marks_the_run_cancelled() {
    let state = test_state("fake", "sleep 5");
    let repo = fixture_repo();
    let (_, started) =
        send(&state, Method::POST, "/api/local/start", Some(json!({"path": repo.path().to_string_lossy()}))).await;
    let review_id = started["sessionId"].as_i64().unwrap();

    let (status, analyzed) = send(
        &state,
        Method::POST,
        &format!("/api/local/{review_id}/analyze"),
        Some(json!({"provider": "fake", "model": "m", "enabledLevels": [1]})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let run_id = analyzed["analysisId"].as_str().unwrap().to_string();

    assert!(state.orchestrator.cancel(&run_id).await);
    for _ in 0..200 {
        let run = state.store.get_run(&run_id).await.unwrap();
        if run.status == pr_core::model::RunStatus::Cancelled {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("run never reached cancelled status");
}
