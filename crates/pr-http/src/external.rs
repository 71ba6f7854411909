//! Ingests analysis results produced outside the orchestrator (e.g. a CI
//! job running its own review pass). Resolves the target review by exactly
//! one of `(path, headSha)` or `(repo, prNumber)`, records a terminal run in
//! one insert, and broadcasts the same terminal shape a normal run would.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use pr_core::AppError;
use pr_core::ids::new_run_id;
use pr_core::model::{ConfigType, RunStatus, Side};
use pr_progress::{external_ingestion_frame, review_topic};
use pr_provider::RawSuggestion;
use pr_store::NewRun;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Wire shape for one suggestion in an external-ingestion body: literal
/// `type`/`description` keys and snake_case `line_start`/`line_end`, matching
/// the shape a provider's own stdout event uses rather than this crate's
/// otherwise-camelCase HTTP bodies.
#[derive(Deserialize)]
pub struct ExternalSuggestion {
    pub file: String,
    #[serde(default)]
    pub line: Option<i64>,
    #[serde(default)]
    pub line_start: Option<i64>,
    #[serde(default)]
    pub line_end: Option<i64>,
    #[serde(default)]
    pub old_or_new: Option<String>,
    #[serde(rename = "type")]
    pub comment_type: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl From<ExternalSuggestion> for RawSuggestion {
    fn from(s: ExternalSuggestion) -> Self {
        let line_start = s.line_start.or(s.line);
        let line_end = s.line_end.or(line_start);
        RawSuggestion {
            file: s.file,
            is_file_level: line_start.is_none(),
            line_start,
            line_end,
            side: Side::from_old_or_new(s.old_or_new.as_deref()),
            comment_type: s.comment_type,
            title: s.title,
            body: s.description,
            confidence: s.confidence,
            reasoning: s.reasoning,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalResultsBody {
    pub path: Option<String>,
    pub head_sha: Option<String>,
    pub repo: Option<String>,
    pub pr_number: Option<i64>,
    #[serde(default)]
    pub provider: Option<String>,
    pub suggestions: Vec<ExternalSuggestion>,
}

pub async fn ingest(
    State(state): State<AppState>,
    Json(body): Json<ExternalResultsBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let review = match (&body.path, &body.head_sha, &body.repo, body.pr_number) {
        (Some(path), Some(head_sha), None, None) => {
            state.store.upsert_local_review(path, head_sha, None).await?
        }
        (None, None, Some(repo), Some(pr_number)) => state.store.upsert_pr_review(repo, pr_number).await?,
        _ => {
            return Err(ApiError(AppError::InvalidInput(
                "exactly one of (path, headSha) or (repo, prNumber) is required".into(),
            )));
        }
    };
    let suggestions: Vec<RawSuggestion> = body.suggestions.into_iter().map(RawSuggestion::from).collect();

    let run_id = new_run_id();
    let run = state
        .store
        .create_run(NewRun {
            id: &run_id,
            review_id: review.id,
            provider: body.provider.as_deref(),
            model: None,
            tier: None,
            head_sha: review.local_head_sha.as_deref().unwrap_or(""),
            custom_instructions: None,
            repo_instructions: None,
            request_instructions: None,
            parent_run_id: None,
            config_type: ConfigType::Single,
            levels_config: json!({}),
            terminal_status: Some(RunStatus::Completed),
        })
        .await?;

    if !suggestions.is_empty() {
        state
            .store
            .bulk_insert_suggestions(review.id, &run.id, None, None, &suggestions, false)
            .await?;
        state
            .store
            .update_run_status(&run.id, RunStatus::Completed, None, Some(suggestions.len() as i64), None)
            .await?;
    }

    state
        .bus
        .publish(&review_topic(review.id), external_ingestion_frame(&run.id, suggestions.len() as i64), true)
        .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "runId": run.id,
            "reviewId": review.id,
            "totalSuggestions": suggestions.len(),
            "status": "completed",
        })),
    ))
}
