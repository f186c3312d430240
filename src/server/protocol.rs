//! JSON-RPC 2.0 / MCP message types used on the stdio boundary.

use crate::tools::ToolDefinition;
use crate::types::ToolResult;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// MCP protocol revisions this server can speak, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

// Standard JSON-RPC error codes.
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;

/// Any inbound message: request (has `id`) or notification (no `id`).
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
}

impl IncomingMessage {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// `initialize` params, as far as this server cares.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default)]
    pub protocol_version: Option<String>,
}

/// Pick the protocol revision to answer `initialize` with.
pub fn negotiate_version(requested: Option<&str>) -> &'static str {
    requested
        .and_then(|r| SUPPORTED_PROTOCOL_VERSIONS.iter().find(|v| **v == r))
        .copied()
        .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0])
}

pub fn initialize_result(version: &str, server_name: &str, server_version: &str) -> Value {
    json!({
        "protocolVersion": version,
        "capabilities": {
            "tools": { "listChanged": false }
        },
        "serverInfo": {
            "name": server_name,
            "version": server_version,
        }
    })
}

pub fn tools_list_result(tools: &[ToolDefinition]) -> Value {
    json!({ "tools": tools })
}

/// `tools/call` params.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// `notifications/cancelled` params.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledParams {
    pub request_id: Value,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Render a tool result as an MCP `CallToolResult`.
///
/// Failures are tool results with `isError: true`, not JSON-RPC errors.
pub fn call_tool_result(result: &ToolResult) -> Value {
    match result {
        ToolResult::Success { payload } => {
            let text = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
            let mut out = json!({
                "content": [{ "type": "text", "text": text }],
                "isError": false,
            });
            if payload.is_object() {
                out["structuredContent"] = payload.clone();
            }
            out
        }
        ToolResult::Failure { kind, message } => json!({
            "content": [{ "type": "text", "text": format!("[{kind}] {message}") }],
            "structuredContent": { "error": { "kind": kind, "message": message } },
            "isError": true,
        }),
    }
}

/// Map key for an in-flight request id.
pub fn request_key(id: &Value) -> String {
    id.to_string()
}
