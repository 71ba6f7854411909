//! Request dispatch: `initialize`, `tools/list`, `tools/call`, `shutdown`,
//! everything else `-32601 Method not found` — the same small method
//! table a stdio MCP server would run, adapted to answer one HTTP request
//! at a time instead of looping over stdin.

use crate::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::tools;
use pr_local::LocalReviewManager;
use pr_store::Store;
use serde_json::Value;
use tracing::debug;

pub async fn handle_request(store: &Store, local: &LocalReviewManager, request: JsonRpcRequest) -> JsonRpcResponse {
    let id = request.id.clone();

    match request.method.as_str() {
        "initialize" => JsonRpcResponse::ok(
            id,
            serde_json::json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "pair-review", "version": env!("CARGO_PKG_VERSION")},
            }),
        ),
        "tools/list" => JsonRpcResponse::ok(id, serde_json::json!({"tools": tools::tool_defs()})),
        "tools/call" => handle_tool_call(store, local, id, request.params).await,
        "shutdown" => JsonRpcResponse::ok(id, serde_json::json!({})),
        other => JsonRpcResponse::method_not_found(id, other),
    }
}

async fn handle_tool_call(store: &Store, local: &LocalReviewManager, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
    let Some(params) = params else {
        return JsonRpcResponse::invalid_params(id, "missing params for tools/call");
    };
    let Some(name) = params.get("name").and_then(|v| v.as_str()) else {
        return JsonRpcResponse::invalid_params(id, "missing tool name");
    };
    let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
    debug!(tool = name, "dispatching tools/call");
    let result = tools::call(store, local, name, arguments).await;
    JsonRpcResponse::ok(id, result)
}
