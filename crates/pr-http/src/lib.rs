//! The HTTP surface: local-review session management, comment CRUD, AI
//! analysis (single/advanced/council), the review-keyed progress stream,
//! external-result ingestion, and the machine protocol route. Every route
//! is a thin translation to/from `pr-store`/`pr-local`/`pr-orchestrator` —
//! this crate owns no domain logic of its own.

mod analysis;
mod comments;
mod error;
mod external;
mod health;
mod local;
mod mcp_route;
mod sse;
mod state;
#[cfg(test)]
mod test_support;
#[cfg(test)]
mod tests;

use axum::Router;
use axum::routing::{get, post, put};

pub use state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/api/local/start", post(local::start))
        .route("/api/local/sessions", get(local::list_sessions))
        .route("/api/local/{reviewId}", get(local::get_session))
        .route("/api/local/{reviewId}/diff", get(local::get_diff))
        .route("/api/local/{reviewId}/refresh", post(local::refresh))
        .route("/api/local/{reviewId}/check-stale", get(local::check_stale))
        .route(
            "/api/local/{reviewId}/user-comments",
            get(comments::list).post(comments::create).delete(comments::delete_bulk),
        )
        .route(
            "/api/local/{reviewId}/user-comments/{commentId}",
            put(comments::update).delete(comments::delete_one),
        )
        .route("/api/local/{reviewId}/user-comments/{commentId}/restore", post(comments::restore))
        .route("/api/local/{reviewId}/suggestions/{suggestionId}/adopt", post(comments::adopt))
        .route("/api/local/{reviewId}/analyze", post(analysis::analyze))
        .route("/api/local/{reviewId}/analyze/council", post(analysis::analyze_council))
        .route("/api/local/{reviewId}/analysis-status", get(analysis::analysis_status))
        .route("/api/local/{reviewId}/suggestions", get(analysis::suggestions))
        .route("/api/local/{reviewId}/has-ai-suggestions", get(analysis::has_ai_suggestions))
        .route("/api/local/{reviewId}/ai-suggestions/status", get(sse::ai_suggestions_status))
        .route("/api/analyses/results", post(external::ingest))
        .route("/mcp", post(mcp_route::mcp))
        .with_state(state)
}
