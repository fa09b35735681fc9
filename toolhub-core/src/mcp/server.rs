//! MCP Server Implementation
//!
//! Handles MCP requests and dispatches `tools/call` into the tool registry.
//! Tool calls run concurrently; everything else is answered inline.

use super::protocol::*;
use super::transport::{Incoming, Transport};
use crate::tools::{ExecutionResult, ToolError, ToolRegistry};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::{self, JoinSet};

/// MCP Server configuration
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    /// Server name
    pub name: String,
    /// Server version
    pub version: String,
}

impl Default for McpServerConfig {
    fn default() -> Self {
        Self {
            name: "toolhub-mcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// MCP Server state
#[derive(Clone)]
pub struct McpServer {
    config: McpServerConfig,
    tools: Arc<ToolRegistry>,
    initialized: Arc<AtomicBool>,
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer")
            .field("config", &self.config)
            .field("tools", &self.tools.len())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl McpServer {
    /// Create a new MCP server builder
    pub fn builder(tools: Arc<ToolRegistry>) -> McpServerBuilder {
        McpServerBuilder::new(tools)
    }

    /// Create a server with the default identity
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self::builder(tools).build()
    }

    pub fn config(&self) -> &McpServerConfig {
        &self.config
    }

    /// Get a reference to the tool registry
    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Whether a client has completed `initialize`
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Handle an incoming JSON-RPC request.
    ///
    /// Returns `None` for notifications.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id.clone() else {
            tracing::debug!(method = %request.method, "notification received");
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, request.params).await,
            method => {
                tracing::debug!(method, "unsupported method");
                JsonRpcResponse::error(id, JsonRpcError::method_not_found())
            }
        };
        Some(response)
    }

    /// Handle initialize request
    fn handle_initialize(&self, id: RequestId) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: self.config.name.clone(),
                version: self.config.version.clone(),
            },
        };

        self.initialized.store(true, Ordering::Release);
        tracing::info!(server = %self.config.name, "client initialized");

        to_response(id, &result)
    }

    /// Handle tools/list request
    fn handle_tools_list(&self, id: RequestId) -> JsonRpcResponse {
        let tools = self
            .tools
            .list()
            .into_iter()
            .map(|summary| McpTool {
                name: summary.name,
                description: summary.description,
                input_schema: summary.schema,
            })
            .collect();

        to_response(id, &ToolsListResult { tools })
    }

    /// Handle tools/call request
    async fn handle_tools_call(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(format!("Invalid tool call params: {}", e)),
                    );
                }
            },
            None => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params("Missing tool call params"),
                );
            }
        };

        let outcome = self.tools.invoke(&params.name, params.arguments).await;
        if let Err(e) = &outcome {
            tracing::info!(tool = %params.name, code = e.code(), "tool call failed: {}", e.message);
        }

        to_response(id, &call_result(outcome))
    }

    /// Serve requests from `transport` until it closes.
    ///
    /// Each tool call runs on its own task; responses are written as they
    /// complete, so they may arrive out of request order.
    pub async fn run<T: Transport>(&self, transport: &mut T) -> crate::error::Result<()> {
        let mut inflight: JoinSet<Option<JsonRpcResponse>> = JoinSet::new();
        // request ids by task, so a panicked handler can still be answered
        let mut pending: HashMap<task::Id, Option<RequestId>> = HashMap::new();

        loop {
            tokio::select! {
                incoming = transport.receive() => match incoming? {
                    Some(Incoming::Request(request)) => {
                        let server = self.clone();
                        let id = request.id.clone();
                        let handle = inflight.spawn(async move { server.handle_request(request).await });
                        pending.insert(handle.id(), id);
                    }
                    Some(Incoming::Malformed(error)) => {
                        tracing::warn!("discarding malformed request: {}", error);
                        transport
                            .send(JsonRpcResponse::error(RequestId::Null, JsonRpcError::parse_error()))
                            .await?;
                    }
                    None => break,
                },
                Some(done) = inflight.join_next_with_id(), if !inflight.is_empty() => {
                    send_completed(transport, &mut pending, done).await?;
                }
            }
        }

        while let Some(done) = inflight.join_next_with_id().await {
            send_completed(transport, &mut pending, done).await?;
        }

        tracing::info!("transport closed, server stopping");
        Ok(())
    }
}

async fn send_completed<T: Transport>(
    transport: &mut T,
    pending: &mut HashMap<task::Id, Option<RequestId>>,
    done: Result<(task::Id, Option<JsonRpcResponse>), task::JoinError>,
) -> crate::error::Result<()> {
    match done {
        Ok((task_id, response)) => {
            pending.remove(&task_id);
            match response {
                Some(response) => transport.send(response).await,
                None => Ok(()),
            }
        }
        Err(e) => {
            tracing::error!("request handler failed: {}", e);
            match pending.remove(&e.id()).flatten() {
                Some(id) => {
                    let error = JsonRpcError::internal_error("Unexpected error while handling request");
                    transport.send(JsonRpcResponse::error(id, error)).await
                }
                None => Ok(()),
            }
        }
    }
}

/// Map an invocation outcome onto the tool-call result shape
pub fn call_result(outcome: Result<ExecutionResult, ToolError>) -> ToolCallResult {
    match outcome {
        Ok(result) => {
            let is_error = !result.is_success();
            let call = ToolCallResult::text(result.output, is_error);
            if result.truncated {
                call.with_metadata(json!({ "truncated": true }))
            } else {
                call
            }
        }
        Err(e) => ToolCallResult::text(e.to_string(), true),
    }
}

fn to_response<T: serde::Serialize>(id: RequestId, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(
            id,
            JsonRpcError::internal_error(format!("Failed to serialize result: {}", e)),
        ),
    }
}

/// Builder for MCP server
#[derive(Debug)]
pub struct McpServerBuilder {
    config: McpServerConfig,
    tools: Arc<ToolRegistry>,
}

impl McpServerBuilder {
    /// Create a new builder over a tool catalog
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self {
            config: McpServerConfig::default(),
            tools,
        }
    }

    /// Set server name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set server version
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.config.version = version.into();
        self
    }

    /// Build the server
    pub fn build(self) -> McpServer {
        McpServer {
            config: self.config,
            tools: self.tools,
            initialized: Arc::new(AtomicBool::new(false)),
        }
    }
}
