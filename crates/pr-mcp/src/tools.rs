//! The four machine-protocol tools: read-only windows onto a review's
//! prompt, comments, runs, and suggestions. Each tool's `content` payload
//! is a JSON-encoded string, not a typed result, so errors can be carried
//! inside the text payload (`{"error": "..."}`) the way the protocol
//! requires instead of as a JSON-RPC error.

use anyhow::{Result, anyhow};
use pr_core::model::{CommentSource, Tier};
use pr_core::recipe::{BasicRecipe, PromptRecipe, RecipeInput};
use pr_local::LocalReviewManager;
use pr_store::Store;
use serde::Deserialize;
use serde_json::Value;

pub fn tool_defs() -> Vec<crate::protocol::McpToolDef> {
    use crate::protocol::McpToolDef;
    vec![
        McpToolDef {
            name: "get_analysis_prompt",
            description: "Compose the prompt that would be sent to a review voice for a review's current diff",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "reviewId": {"type": "integer"},
                    "provider": {"type": "string"},
                    "model": {"type": "string"},
                    "tier": {"type": "string"},
                    "customInstructions": {"type": "string"}
                },
                "required": ["reviewId", "provider", "model"]
            }),
        },
        McpToolDef {
            name: "get_user_comments",
            description: "List the user-authored comments on a review",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "reviewId": {"type": "integer"},
                    "includeDismissed": {"type": "boolean"}
                },
                "required": ["reviewId"]
            }),
        },
        McpToolDef {
            name: "get_ai_analysis_runs",
            description: "List the analysis runs recorded for a review",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {"reviewId": {"type": "integer"}},
                "required": ["reviewId"]
            }),
        },
        McpToolDef {
            name: "get_ai_suggestions",
            description: "List AI suggestions for a review, optionally scoped to one run",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "reviewId": {"type": "integer"},
                    "runId": {"type": "string"}
                },
                "required": ["reviewId"]
            }),
        },
    ]
}

#[derive(Deserialize)]
struct AnalysisPromptArgs {
    #[serde(rename = "reviewId")]
    review_id: i64,
    provider: String,
    model: String,
    tier: Option<String>,
    #[serde(rename = "customInstructions")]
    custom_instructions: Option<String>,
}

#[derive(Deserialize)]
struct UserCommentsArgs {
    #[serde(rename = "reviewId")]
    review_id: i64,
    #[serde(rename = "includeDismissed", default)]
    include_dismissed: bool,
}

#[derive(Deserialize)]
struct RunsArgs {
    #[serde(rename = "reviewId")]
    review_id: i64,
}

#[derive(Deserialize)]
struct SuggestionsArgs {
    #[serde(rename = "reviewId")]
    review_id: i64,
    #[serde(rename = "runId")]
    run_id: Option<String>,
}

/// Runs one tool by name and returns its `content` text payload — always a
/// JSON string, `{"error": "..."}` on failure rather than a thrown error,
/// per the protocol's "errors live in the text payload" rule.
pub async fn call(store: &Store, local: &LocalReviewManager, name: &str, arguments: Value) -> Value {
    let outcome = match name {
        "get_analysis_prompt" => get_analysis_prompt(store, local, arguments).await,
        "get_user_comments" => get_user_comments(store, arguments).await,
        "get_ai_analysis_runs" => get_ai_analysis_runs(store, arguments).await,
        "get_ai_suggestions" => get_ai_suggestions(store, arguments).await,
        other => Err(anyhow!("unknown tool: {other}")),
    };

    let text = match outcome {
        Ok(value) => value.to_string(),
        Err(e) => serde_json::json!({"error": e.to_string()}).to_string(),
    };
    serde_json::json!({"content": [{"type": "text", "text": text}]})
}

async fn get_analysis_prompt(store: &Store, local: &LocalReviewManager, arguments: Value) -> Result<Value> {
    let args: AnalysisPromptArgs = serde_json::from_value(arguments)?;
    let review = store.get_review(args.review_id).await?;
    let (diff_text, _stats) = local.get_diff(args.review_id).await?;
    let tier = args.tier.as_deref().map(|t| t.parse::<Tier>()).transpose().map_err(|e| anyhow!(e))?;
    let voice = pr_core::model::Voice {
        provider: args.provider,
        model: args.model,
        tier,
        custom_instructions: args.custom_instructions.clone(),
    };
    let prompt = BasicRecipe.compose(&RecipeInput {
        voice: &voice,
        diff_text: &diff_text,
        custom_instructions: args.custom_instructions.as_deref(),
        repo_instructions: None,
        request_instructions: None,
        prior_levels_digest: None,
    });
    Ok(serde_json::json!({"reviewId": review.id, "prompt": prompt}))
}

async fn get_user_comments(store: &Store, arguments: Value) -> Result<Value> {
    let args: UserCommentsArgs = serde_json::from_value(arguments)?;
    let comments: Vec<_> = store
        .list_comments(args.review_id, args.include_dismissed)
        .await?
        .into_iter()
        .filter(|c| c.source == CommentSource::User)
        .collect();
    Ok(serde_json::json!({"comments": comments}))
}

async fn get_ai_analysis_runs(store: &Store, arguments: Value) -> Result<Value> {
    let args: RunsArgs = serde_json::from_value(arguments)?;
    let runs = store.list_runs_for_review(args.review_id).await?;
    Ok(serde_json::json!({"runs": runs}))
}

async fn get_ai_suggestions(store: &Store, arguments: Value) -> Result<Value> {
    let args: SuggestionsArgs = serde_json::from_value(arguments)?;
    let suggestions: Vec<_> = store
        .list_comments(args.review_id, true)
        .await?
        .into_iter()
        .filter(|c| c.source == CommentSource::Ai)
        .filter(|c| args.run_id.as_deref().is_none_or(|id| c.ai_run_id.as_deref() == Some(id)))
        .collect();
    Ok(serde_json::json!({"suggestions": suggestions}))
}
