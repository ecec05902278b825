//! Stdio tool server: newline-delimited JSON-RPC 2.0 on stdin/stdout.
//!
//! One message per line in each direction. Requests are answered in arrival
//! order; notifications (messages without an `id`) get no answer. Nothing
//! but protocol messages is ever written to the output stream.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

use halopub_core::{ToolHandlers, tool_definitions};
use halopub_shared::{HaloPubError, Result};

/// Name reported in the `initialize` handshake.
pub(crate) const SERVER_NAME: &str = "halo-blog-publisher";

/// Protocol revision answered when the client does not ask for one.
pub(crate) const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Incoming request or notification.
#[derive(Debug, Deserialize)]
struct RpcMessage {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Debug, Serialize, PartialEq)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl RpcResponse {
    fn reply(id: Value, outcome: std::result::Result<Value, RpcError>) -> Self {
        let (result, error) = match outcome {
            Ok(value) => (Some(value), None),
            Err(e) => (None, Some(e)),
        };
        Self {
            jsonrpc: "2.0",
            id,
            result,
            error,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

pub(crate) struct Server {
    handlers: ToolHandlers,
}

impl Server {
    pub(crate) fn new(handlers: ToolHandlers) -> Self {
        Self { handlers }
    }

    /// Answer every line from `input` on `output` until `input` closes.
    pub(crate) async fn serve<R, W>(&self, input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(server = SERVER_NAME, "tool server listening on stdio");
        let mut lines = input.lines();

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| HaloPubError::Protocol(format!("failed to read input: {e}")))?
        {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(reply) = self.handle_line(&line).await {
                output
                    .write_all(format!("{reply}\n").as_bytes())
                    .await
                    .map_err(|e| HaloPubError::Protocol(format!("failed to write reply: {e}")))?;
                output
                    .flush()
                    .await
                    .map_err(|e| HaloPubError::Protocol(format!("failed to flush reply: {e}")))?;
            }
        }

        info!("input closed, shutting down");
        Ok(())
    }

    /// Process one input line; `None` when nothing should be written back.
    async fn handle_line(&self, line: &str) -> Option<String> {
        let response = match serde_json::from_str::<Value>(line) {
            Err(e) => {
                warn!(error = %e, "unparsable message");
                RpcResponse::reply(Value::Null, Err(RpcError::new(PARSE_ERROR, format!("Parse error: {e}"))))
            }
            Ok(raw) => {
                let id = raw.get("id").cloned().unwrap_or(Value::Null);
                match serde_json::from_value::<RpcMessage>(raw) {
                    Err(e) => RpcResponse::reply(
                        id,
                        Err(RpcError::new(INVALID_REQUEST, format!("Invalid request: {e}"))),
                    ),
                    Ok(RpcMessage { id: None, method, .. }) => {
                        debug!(%method, "notification received");
                        return None;
                    }
                    Ok(RpcMessage {
                        id: Some(id),
                        method,
                        params,
                    }) => RpcResponse::reply(id, self.dispatch(&method, params).await),
                }
            }
        };

        match serde_json::to_string(&response) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(error = %e, "failed to encode reply");
                None
            }
        }
    }

    #[instrument(skip(self, params))]
    async fn dispatch(&self, method: &str, params: Value) -> std::result::Result<Value, RpcError> {
        match method {
            "initialize" => {
                let version = params
                    .get("protocolVersion")
                    .and_then(Value::as_str)
                    .unwrap_or(PROTOCOL_VERSION);
                Ok(json!({
                    "protocolVersion": version,
                    "capabilities": {"tools": {}},
                    "serverInfo": {"name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION")}
                }))
            }
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({"tools": tool_definitions()})),
            "tools/call" => {
                let call: CallParams = serde_json::from_value(params)
                    .map_err(|e| RpcError::new(INVALID_PARAMS, format!("Invalid params: {e}")))?;
                match self.handlers.call(&call.name, call.arguments).await {
                    Ok(result) => Ok(json!({
                        "content": [{"type": "text", "text": result.text}],
                        "isError": result.is_error
                    })),
                    Err(e @ HaloPubError::Validation { .. }) => {
                        Err(RpcError::new(INVALID_PARAMS, e.to_string()))
                    }
                    Err(e) => Err(RpcError::new(INTERNAL_ERROR, e.to_string())),
                }
            }
            other => Err(RpcError::new(METHOD_NOT_FOUND, format!("Method not found: {other}"))),
        }
    }
}
