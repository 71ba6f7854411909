//! Local-review session endpoints: start a session against a filesystem
//! path, list/fetch sessions, pull the cached diff, and check/refresh
//! staleness against the working tree's current HEAD.

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::PathBuf;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBody {
    pub path: String,
}

pub async fn start(State(state): State<AppState>, Json(body): Json<StartBody>) -> ApiResult<Json<Value>> {
    let outcome = state.local.start(&PathBuf::from(&body.path)).await?;
    Ok(Json(json!({
        "success": true,
        "sessionId": outcome.review.id,
        "reviewUrl": format!("/api/local/{}", outcome.review.id),
        "repository": outcome.repository,
        "branch": outcome.branch,
        "stats": outcome.stats,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionsQuery {
    pub limit: Option<u32>,
    pub before: Option<DateTime<Utc>>,
}

pub async fn list_sessions(State(state): State<AppState>, Query(q): Query<SessionsQuery>) -> ApiResult<Json<Value>> {
    let limit = q.limit.unwrap_or(20).clamp(1, 100);
    let (sessions, has_more) = state.store.list_local_reviews(q.before, limit).await?;
    Ok(Json(json!({"success": true, "sessions": sessions, "hasMore": has_more})))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(review_id): Path<i64>,
) -> ApiResult<Json<pr_core::model::Review>> {
    Ok(Json(state.store.get_review(review_id).await?))
}

pub async fn get_diff(State(state): State<AppState>, Path(review_id): Path<i64>) -> ApiResult<Json<Value>> {
    let (diff, stats) = state.local.get_diff(review_id).await?;
    Ok(Json(json!({"diff": diff, "stats": stats, "generated_files": Vec::<String>::new()})))
}

pub async fn refresh(State(state): State<AppState>, Path(review_id): Path<i64>) -> ApiResult<Json<Value>> {
    let outcome = state.local.refresh(review_id).await?;
    Ok(Json(json!({
        "stats": outcome.stats,
        "sessionChanged": outcome.session_changed,
        "newSessionId": outcome.new_review.as_ref().map(|r| r.id),
        "originalHeadSha": outcome.original_head_sha,
        "newHeadSha": outcome.new_head_sha,
    })))
}

pub async fn check_stale(State(state): State<AppState>, Path(review_id): Path<i64>) -> Json<Value> {
    use pr_local::Staleness;
    let body = match state.local.check_staleness(review_id).await {
        Staleness::Fresh => json!({"isStale": false}),
        Staleness::DiffChanged => json!({"isStale": true}),
        Staleness::HeadChanged { original_head_sha, new_head_sha } => {
            json!({"isStale": true, "originalHeadSha": original_head_sha, "newHeadSha": new_head_sha})
        }
        Staleness::Unknown { error } => json!({"isStale": Value::Null, "error": error}),
    };
    Json(body)
}
