//! `POST /mcp`: parses one JSON-RPC request, dispatches it to `pr-mcp`, and
//! frames the single response as an event-stream body, matching the
//! always-SSE-even-for-one-shot contract the rest of the progress surface
//! uses.

use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use pr_mcp::{JsonRpcRequest, handle_request, sse_frame};

use crate::state::AppState;

pub async fn mcp(State(state): State<AppState>, body: axum::body::Bytes) -> Response {
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            let resp = pr_mcp::JsonRpcResponse::parse_error(e.to_string());
            return framed(sse_frame(&resp));
        }
    };
    let response = handle_request(&state.store, &state.local, request).await;
    framed(sse_frame(&response))
}

fn framed(body: String) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
