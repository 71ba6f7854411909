//! The machine protocol surface: a JSON-RPC 2.0 dialect (`initialize`,
//! `tools/list`, `tools/call`) answering a fixed set of read-only tools
//! over a review's comments, runs, and suggestions. Framing (event-stream
//! vs. plain JSON) and the HTTP route itself belong to `pr-http`; this
//! crate only knows how to answer one parsed request.

mod dispatch;
mod protocol;
mod tools;

pub use dispatch::handle_request;
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpToolDef, sse_frame};
pub use tools::tool_defs;
