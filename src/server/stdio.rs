//! MCP server over newline-delimited JSON-RPC on stdin/stdout.
//!
//! stdout carries protocol messages only; all logging goes to stderr.
//! Each `tools/call` runs on its own task so slow controller calls do not
//! block other requests. Responses are serialized through a single writer.

use crate::server::protocol::{self, IncomingMessage, JsonRpcResponse};
use crate::tools::Dispatcher;
use crate::types::ToolInvocation;
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Tool-serving MCP endpoint.
#[derive(Clone)]
pub struct McpServer {
    dispatcher: Dispatcher,
    name: String,
    version: String,
    in_flight: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl McpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Serve on the process's stdin/stdout until stdin closes.
    pub async fn serve_stdio(&self) -> Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await?;
        Ok(())
    }

    /// Serve messages read from `reader`, writing responses to `writer`.
    ///
    /// Returns the writer once input is exhausted and every in-flight call
    /// has answered.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<W>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let writer_task = tokio::spawn(write_loop(writer, rx));
        let mut calls = JoinSet::new();

        info!("MCP server ready ({} tools)", self.dispatcher.registry().len());

        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            self.handle_line(line, &tx, &mut calls).await;

            // Reap finished calls so the set does not grow unbounded.
            while calls.try_join_next().is_some() {}
        }

        debug!("Input closed; waiting for {} in-flight calls", calls.len());
        while let Some(joined) = calls.join_next().await {
            if let Err(e) = joined {
                warn!("Tool call task failed: {}", e);
            }
        }

        drop(tx);
        let writer = writer_task
            .await
            .context("Writer task panicked")?
            .context("Failed to write response")?;
        info!("MCP server stopped");
        Ok(writer)
    }

    async fn handle_line(
        &self,
        line: &str,
        tx: &mpsc::UnboundedSender<String>,
        calls: &mut JoinSet<()>,
    ) {
        let raw: Value = match serde_json::from_str(line) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Unparseable message: {}", e);
                send(
                    tx,
                    JsonRpcResponse::error(Value::Null, protocol::PARSE_ERROR, format!("Parse error: {e}")),
                );
                return;
            }
        };

        // Batches and bare scalars are valid JSON but not requests.
        if !raw.is_object() {
            send(
                tx,
                JsonRpcResponse::error(Value::Null, protocol::INVALID_REQUEST, "Expected a single request object"),
            );
            return;
        }
        let raw_id = raw.get("id").cloned();
        let msg: IncomingMessage = match serde_json::from_value(raw) {
            Ok(msg) => msg,
            Err(e) => {
                send(
                    tx,
                    JsonRpcResponse::error(
                        raw_id.unwrap_or(Value::Null),
                        protocol::INVALID_REQUEST,
                        format!("Invalid request: {e}"),
                    ),
                );
                return;
            }
        };

        if msg.jsonrpc.as_deref() != Some("2.0") {
            if let Some(id) = msg.id {
                send(
                    tx,
                    JsonRpcResponse::error(id, protocol::INVALID_REQUEST, "jsonrpc must be \"2.0\""),
                );
            }
            return;
        }

        let Some(method) = msg.method.clone() else {
            // Responses to server-initiated requests; none are ever sent.
            if let Some(id) = msg.id {
                debug!("Ignoring message without method (id {})", id);
            }
            return;
        };

        if msg.is_notification() {
            self.handle_notification(&method, msg.params).await;
            return;
        }
        let id = msg.id.unwrap_or(Value::Null);
        self.handle_request(id, &method, msg.params, tx, calls).await;
    }

    async fn handle_notification(&self, method: &str, params: Option<Value>) {
        match method {
            "notifications/initialized" => info!("Client initialized"),
            "notifications/cancelled" => {
                let params: protocol::CancelledParams =
                    match params.map(serde_json::from_value).transpose() {
                        Ok(Some(p)) => p,
                        _ => {
                            warn!("Malformed cancellation notification");
                            return;
                        }
                    };
                let key = protocol::request_key(&params.request_id);
                match self.in_flight.lock().await.get(&key) {
                    Some(token) => {
                        info!(
                            "Cancelling request {} ({})",
                            key,
                            params.reason.as_deref().unwrap_or("no reason given")
                        );
                        token.cancel();
                    }
                    None => debug!("Cancellation for unknown or finished request {}", key),
                }
            }
            other => debug!("Ignoring notification {}", other),
        }
    }

    async fn handle_request(
        &self,
        id: Value,
        method: &str,
        params: Option<Value>,
        tx: &mpsc::UnboundedSender<String>,
        calls: &mut JoinSet<()>,
    ) {
        match method {
            "initialize" => {
                let params: protocol::InitializeParams = params
                    .and_then(|p| serde_json::from_value(p).ok())
                    .unwrap_or_default();
                let version = protocol::negotiate_version(params.protocol_version.as_deref());
                info!("Initialize (protocol {})", version);
                send(
                    tx,
                    JsonRpcResponse::result(
                        id,
                        protocol::initialize_result(version, &self.name, &self.version),
                    ),
                );
            }
            "ping" => send(tx, JsonRpcResponse::result(id, serde_json::json!({}))),
            "tools/list" => {
                let defs = self.dispatcher.registry().definitions();
                send(tx, JsonRpcResponse::result(id, protocol::tools_list_result(&defs)));
            }
            "tools/call" => {
                let params: protocol::ToolCallParams =
                    match params.map(serde_json::from_value).transpose() {
                        Ok(Some(p)) => p,
                        Ok(None) => {
                            send(
                                tx,
                                JsonRpcResponse::error(id, protocol::INVALID_PARAMS, "Missing params"),
                            );
                            return;
                        }
                        Err(e) => {
                            send(
                                tx,
                                JsonRpcResponse::error(
                                    id,
                                    protocol::INVALID_PARAMS,
                                    format!("Invalid tools/call params: {e}"),
                                ),
                            );
                            return;
                        }
                    };
                self.spawn_call(id, params, tx.clone(), calls).await;
            }
            other => {
                debug!("Unknown method {}", other);
                send(
                    tx,
                    JsonRpcResponse::error(
                        id,
                        protocol::METHOD_NOT_FOUND,
                        format!("Method not found: {other}"),
                    ),
                );
            }
        }
    }

    async fn spawn_call(
        &self,
        id: Value,
        params: protocol::ToolCallParams,
        tx: mpsc::UnboundedSender<String>,
        calls: &mut JoinSet<()>,
    ) {
        let key = protocol::request_key(&id);
        let cancel = CancellationToken::new();
        {
            let mut in_flight = self.in_flight.lock().await;
            if in_flight.contains_key(&key) {
                warn!("Rejecting tools/call with in-flight id {}", key);
                send(
                    &tx,
                    JsonRpcResponse::error(
                        id,
                        protocol::INVALID_REQUEST,
                        format!("Request id {key} is already in flight"),
                    ),
                );
                return;
            }
            in_flight.insert(key.clone(), cancel.clone());
        }

        let dispatcher = self.dispatcher.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let invocation = ToolInvocation::new(
            params.name,
            params.arguments.unwrap_or(Value::Null),
        );

        calls.spawn(async move {
            let result = dispatcher.dispatch_with_cancel(invocation, cancel).await;
            in_flight.lock().await.remove(&key);
            send(
                &tx,
                JsonRpcResponse::result(id, protocol::call_tool_result(&result)),
            );
        });
    }
}

fn send(tx: &mpsc::UnboundedSender<String>, response: JsonRpcResponse) {
    match serde_json::to_string(&response) {
        Ok(line) => {
            if tx.send(line).is_err() {
                warn!("Response dropped: writer is gone");
            }
        }
        Err(e) => warn!("Failed to serialize response: {}", e),
    }
}

async fn write_loop<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<String>) -> std::io::Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(writer)
}
