//! Starts and inspects AI analysis runs: single/advanced plans built
//! straight from the request body, council plans resolved from either an
//! inline config or a saved [`pr_core::model::Council`].

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use pr_core::AppError;
use pr_core::model::{ConfigType, Level, Tier, Voice, VoicePlan};
use pr_orchestrator::StartAnalysis;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

async fn repo_root(state: &AppState, review_id: i64) -> Result<(PathBuf, String), AppError> {
    let review = state.store.get_review(review_id).await?;
    let path = review
        .local_path
        .ok_or_else(|| AppError::InvalidInput("review has no local working tree to analyze".into()))?;
    Ok((PathBuf::from(path), review.local_head_sha.unwrap_or_default()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeBody {
    pub provider: String,
    pub model: String,
    pub tier: Option<String>,
    pub custom_instructions: Option<String>,
    #[serde(default = "default_levels")]
    pub enabled_levels: Vec<u32>,
    #[serde(default)]
    pub skip_level3: bool,
}

fn default_levels() -> Vec<u32> {
    vec![1, 2, 3]
}

pub async fn analyze(
    State(state): State<AppState>,
    Path(review_id): Path<i64>,
    Json(body): Json<AnalyzeBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let tier = body
        .tier
        .as_deref()
        .map(Tier::from_str)
        .transpose()
        .map_err(AppError::InvalidInput)?;
    let voice = Voice {
        provider: body.provider,
        model: body.model,
        tier,
        custom_instructions: None,
    };
    let mut level_numbers = body.enabled_levels;
    if body.skip_level3 {
        level_numbers.retain(|l| *l != 3);
    }
    if level_numbers.is_empty() {
        return Err(ApiError(AppError::InvalidInput("no levels enabled".into())));
    }
    let levels: Vec<Level> =
        level_numbers.into_iter().map(|n| Level { level: n, enabled: true, voices: vec![voice.clone()] }).collect();
    let config_type = if levels.len() == 1 { ConfigType::Single } else { ConfigType::Advanced };

    start(state, review_id, VoicePlan { config_type, levels }, body.custom_instructions).await
}

#[derive(Deserialize)]
struct LevelsConfig {
    levels: Vec<Level>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouncilAnalyzeBody {
    pub council_id: Option<String>,
    pub council_config: Option<Value>,
    pub config_type: String,
    pub custom_instructions: Option<String>,
}

pub async fn analyze_council(
    State(state): State<AppState>,
    Path(review_id): Path<i64>,
    Json(body): Json<CouncilAnalyzeBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let config_type = match body.config_type.as_str() {
        "advanced" => ConfigType::Advanced,
        "council" => ConfigType::Council,
        other => return Err(ApiError(AppError::InvalidInput(format!("unknown configType '{other}'")))),
    };

    let config_value = if let Some(id) = &body.council_id {
        let council = state.store.get_council(id).await?;
        state.store.touch_council(id).await?;
        council.config
    } else if let Some(config) = body.council_config {
        config
    } else {
        return Err(ApiError(AppError::InvalidInput("one of councilId or councilConfig is required".into())));
    };

    let parsed: LevelsConfig = serde_json::from_value(config_value)
        .map_err(|e| ApiError(AppError::InvalidInput(format!("invalid council config: {e}"))))?;

    start(state, review_id, VoicePlan { config_type, levels: parsed.levels }, body.custom_instructions).await
}

async fn start(
    state: AppState,
    review_id: i64,
    plan: VoicePlan,
    custom_instructions: Option<String>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let (root, head_sha) = repo_root(&state, review_id).await?;
    let (diff_text, _stats) = state.local.get_diff(review_id).await?;
    let run = state
        .orchestrator
        .start_analysis(StartAnalysis {
            review_id,
            head_sha,
            repo_root: root,
            diff_text,
            plan,
            custom_instructions,
            repo_instructions: None,
            request_instructions: None,
        })
        .await?;
    Ok((StatusCode::ACCEPTED, Json(json!({"analysisId": run.id}))))
}

pub async fn analysis_status(State(state): State<AppState>, Path(review_id): Path<i64>) -> ApiResult<Json<Value>> {
    let Some(run_id) = state.orchestrator.running_run_id(review_id).await else {
        return Ok(Json(json!({"running": false})));
    };
    let run = state.store.get_run(&run_id).await?;
    Ok(Json(json!({
        "running": true,
        "analysisId": run.id,
        "status": {
            "isCouncil": run.config_type == ConfigType::Council,
            "councilConfig": run.levels_config,
            "configType": run.config_type.as_str(),
        },
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsQuery {
    pub levels: Option<String>,
    pub run_id: Option<String>,
}

pub async fn suggestions(
    State(state): State<AppState>,
    Path(review_id): Path<i64>,
    Query(q): Query<SuggestionsQuery>,
) -> ApiResult<Json<Value>> {
    use pr_core::model::CommentSource;
    use std::collections::HashMap;

    let wanted_levels: Option<Vec<i64>> =
        q.levels.map(|s| s.split(',').filter_map(|n| n.trim().parse().ok()).collect());

    let mut ai: Vec<_> =
        state.store.list_comments(review_id, false).await?.into_iter().filter(|c| c.source == CommentSource::Ai).collect();

    if let Some(run_id) = &q.run_id {
        ai.retain(|c| c.ai_run_id.as_deref() == Some(run_id.as_str()));
    }
    if let Some(levels) = &wanted_levels {
        ai.retain(|c| c.ai_level.is_some_and(|l| levels.contains(&l)));
    }

    if q.run_id.is_none() {
        let mut has_final: HashMap<String, bool> = HashMap::new();
        for c in &ai {
            if let Some(id) = &c.ai_run_id {
                let entry = has_final.entry(id.clone()).or_insert(false);
                *entry |= !c.is_raw;
            }
        }
        ai.retain(|c| {
            let Some(id) = &c.ai_run_id else { return true };
            !has_final.get(id).copied().unwrap_or(false) || !c.is_raw
        });
    }

    Ok(Json(json!({"suggestions": ai})))
}

pub async fn has_ai_suggestions(
    State(state): State<AppState>,
    Path(review_id): Path<i64>,
    Query(q): Query<SuggestionsQuery>,
) -> ApiResult<Json<Value>> {
    let run = match &q.run_id {
        Some(id) => Some(state.store.get_run(id).await?),
        None => state.store.latest_run_for_review(review_id).await?,
    };
    let Some(run) = run else {
        return Ok(Json(json!({"analysisHasRun": false, "hasSuggestions": false})));
    };
    Ok(Json(json!({
        "analysisHasRun": true,
        "hasSuggestions": run.total_suggestions > 0,
        "summary": run.summary,
        "stats": {"totalSuggestions": run.total_suggestions, "filesAnalyzed": run.files_analyzed},
    })))
}
