//! JSON-RPC 2.0 envelope and event-stream framing for the machine
//! protocol endpoint. The wire shapes mirror a stdio MCP server's request/
//! response pair; `sse_frame` is the one addition this transport needs —
//! every response, including one-shot ones, goes out as a `data: {...}`
//! line.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[allow(dead_code)]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub id: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn ok(id: Option<Value>, result: Value) -> Self {
        Self { jsonrpc: "2.0".into(), result: Some(result), error: None, id }
    }

    pub fn method_not_found(id: Option<Value>, method: &str) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError { code: -32601, message: format!("Method not found: {method}") }),
            id,
        }
    }

    pub fn invalid_params(id: Option<Value>, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError { code: -32602, message: message.into() }),
            id,
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError { code: -32700, message: message.into() }),
            id: None,
        }
    }
}

/// Frames a response as a one-shot server-sent-event: `data: {json}\n\n`.
pub fn sse_frame(response: &JsonRpcResponse) -> String {
    let body = serde_json::to_string(response).unwrap_or_else(|_| "{}".into());
    format!("data: {body}\n\n")
}

#[derive(Serialize)]
pub struct McpToolDef {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_frame_wraps_the_response_as_one_data_line() {
        let resp = JsonRpcResponse::ok(Some(Value::from(1)), serde_json::json!({"ok": true}));
        let framed = sse_frame(&resp);
        assert!(framed.starts_with("data: "));
        assert!(framed.ends_with("\n\n"));
        assert!(framed.contains("\"ok\":true"));
    }

    #[test]
    fn method_not_found_uses_the_jsonrpc_reserved_code() {
        let resp = JsonRpcResponse::method_not_found(None, "bogus");
        assert_eq!(resp.error.unwrap().code, -32601);
    }
}
