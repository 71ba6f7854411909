//! User-comment CRUD, plus the dismiss/restore/bulk-delete and
//! adopt-suggestion endpoints that share the same `comments` table as AI
//! suggestions.

use axum::Json;
use axum::extract::{Path, Query, State};
use pr_core::model::Side;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub include_dismissed: bool,
}

pub async fn list(
    State(state): State<AppState>,
    Path(review_id): Path<i64>,
    Query(q): Query<ListQuery>,
) -> ApiResult<Json<Value>> {
    let comments = state.store.list_comments(review_id, q.include_dismissed).await?;
    Ok(Json(json!({"comments": comments})))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
    pub file: String,
    pub line_start: Option<i64>,
    pub line_end: Option<i64>,
    #[serde(default)]
    pub side: Option<Side>,
    #[serde(default = "default_comment_type")]
    pub comment_type: String,
    pub body: String,
}

fn default_comment_type() -> String {
    "comment".into()
}

pub async fn create(
    State(state): State<AppState>,
    Path(review_id): Path<i64>,
    Json(body): Json<CreateBody>,
) -> ApiResult<Json<Value>> {
    let comment = state
        .store
        .create_user_comment(
            review_id,
            &body.file,
            body.line_start,
            body.line_end,
            body.side.unwrap_or(Side::Right),
            &body.comment_type,
            &body.body,
        )
        .await?;
    Ok(Json(serde_json::to_value(comment).unwrap_or(Value::Null)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBody {
    pub body: String,
}

pub async fn update(
    State(state): State<AppState>,
    Path((_review_id, comment_id)): Path<(i64, i64)>,
    Json(body): Json<UpdateBody>,
) -> ApiResult<Json<Value>> {
    let comment = state.store.update_comment_body(comment_id, &body.body).await?;
    Ok(Json(serde_json::to_value(comment).unwrap_or(Value::Null)))
}

pub async fn delete_one(
    State(state): State<AppState>,
    Path((_review_id, comment_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Value>> {
    let dismissed = state.store.soft_delete_comment(comment_id).await?;
    Ok(Json(json!({"dismissedSuggestionId": dismissed})))
}

pub async fn delete_bulk(State(state): State<AppState>, Path(review_id): Path<i64>) -> ApiResult<Json<Value>> {
    let dismissed = state.store.bulk_soft_delete_by_review(review_id).await?;
    Ok(Json(json!({"deletedCount": dismissed.len(), "dismissedSuggestionIds": dismissed})))
}

pub async fn restore(
    State(state): State<AppState>,
    Path((_review_id, comment_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Value>> {
    let comment = state.store.restore_comment(comment_id).await?;
    Ok(Json(serde_json::to_value(comment).unwrap_or(Value::Null)))
}

pub async fn adopt(
    State(state): State<AppState>,
    Path((_review_id, suggestion_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Value>> {
    let comment = state.store.adopt_suggestion(suggestion_id).await?;
    Ok(Json(serde_json::to_value(comment).unwrap_or(Value::Null)))
}
