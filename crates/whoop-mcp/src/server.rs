//! JSON-RPC dispatch and the stdio serve loop.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{McpError, Result};
use crate::protocol::{
    CallToolParams, InitializeParams, InitializeResult, JSONRPC_VERSION, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ListResourcesResult, ListToolsResult, MCP_PROTOCOL_VERSION,
    ReadResourceParams, ReadResourceResult, ResourcesCapability, ServerCapabilities, ServerInfo,
    ToolsCapability,
};
use crate::resources::ResourceRegistry;
use crate::tool::{ToolContext, ToolRegistry};
use crate::transport::{MessageReader, MessageWriter};

/// An MCP server over a tool and a resource registry.
#[derive(Debug)]
pub struct McpServer {
    info: ServerInfo,
    instructions: Option<String>,
    tools: ToolRegistry,
    resources: ResourceRegistry,
}

impl McpServer {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            info: ServerInfo {
                name: name.into(),
                version: version.into(),
            },
            instructions: None,
            tools: ToolRegistry::new(),
            resources: ResourceRegistry::new(),
        }
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_resources(mut self, resources: ResourceRegistry) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dispatch
    // ─────────────────────────────────────────────────────────────────────────

    /// Handle one raw message. `None` when no reply is due.
    pub async fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        match parse_message(raw) {
            Ok(value) => self.handle_value(value, &ToolContext::new()).await,
            Err(reply) => Some(reply),
        }
    }

    /// Handle a decoded message, running tools under `ctx`.
    pub async fn handle_value(&self, value: Value, ctx: &ToolContext) -> Option<JsonRpcResponse> {
        let Value::Object(object) = &value else {
            return Some(JsonRpcResponse::failure(
                Value::Null,
                JsonRpcError::invalid_request("Expected a single JSON-RPC object"),
            ));
        };

        // Replies to server-initiated requests; this server never sends any.
        if !object.contains_key("method")
            && (object.contains_key("result") || object.contains_key("error"))
        {
            tracing::debug!("Ignoring JSON-RPC response from client");
            return None;
        }

        let id = object.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::failure(
                    id,
                    JsonRpcError::invalid_request(format!("Invalid request: {}", e)),
                ));
            }
        };

        self.handle_request(request, ctx).await
    }

    /// Handle a parsed request or notification.
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        ctx: &ToolContext,
    ) -> Option<JsonRpcResponse> {
        if request.jsonrpc != JSONRPC_VERSION {
            return request.id.map(|id| {
                JsonRpcResponse::failure(
                    id,
                    JsonRpcError::invalid_request(format!(
                        "Unsupported jsonrpc version: {}",
                        request.jsonrpc
                    )),
                )
            });
        }

        let Some(id) = request.id else {
            self.handle_notification(&request.method);
            return None;
        };

        tracing::debug!(method = %request.method, "Handling request");
        let response = match self.dispatch(&request.method, request.params, ctx).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => {
                tracing::debug!(method = %request.method, error = %e, "Request failed");
                JsonRpcResponse::failure(id, e.to_rpc_error())
            }
        };
        Some(response)
    }

    fn handle_notification(&self, method: &str) {
        match method {
            "notifications/initialized" => tracing::info!("Client initialized"),
            "notifications/cancelled" => tracing::debug!("Client cancelled a request"),
            other => tracing::debug!(method = %other, "Ignoring notification"),
        }
    }

    async fn dispatch(
        &self,
        method: &str,
        params: Option<Value>,
        ctx: &ToolContext,
    ) -> Result<Value> {
        match method {
            "initialize" => {
                let params: InitializeParams = match params {
                    Some(p) => parse_params(Some(p))?,
                    None => InitializeParams::default(),
                };
                if let Some(client) = &params.client_info {
                    tracing::info!(
                        client = %client.name,
                        version = client.version.as_deref().unwrap_or("unknown"),
                        protocol = params.protocol_version.as_deref().unwrap_or("unknown"),
                        "Client connected"
                    );
                }
                to_value(&self.initialize_result())
            }
            "ping" => Ok(json!({})),
            "tools/list" => to_value(&ListToolsResult {
                tools: self.tools.definitions(),
            }),
            "tools/call" => {
                let params: CallToolParams = parse_params(params)?;
                let result = self
                    .tools
                    .call(&params.name, params.arguments, ctx)
                    .await?;
                to_value(&result)
            }
            "resources/list" => to_value(&ListResourcesResult {
                resources: self.resources.list(),
            }),
            "resources/read" => {
                let params: ReadResourceParams = parse_params(params)?;
                to_value(&ReadResourceResult {
                    contents: vec![self.resources.read(&params.uri)?],
                })
            }
            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }

    fn initialize_result(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
                resources: (!self.resources.is_empty()).then(ResourcesCapability::default),
            },
            server_info: self.info.clone(),
            instructions: self.instructions.clone(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Serve loop
    // ─────────────────────────────────────────────────────────────────────────

    /// Serve on the process's stdin/stdout until stdin closes.
    ///
    /// Nothing else may write to stdout while this runs.
    pub async fn serve_stdio(self: Arc<Self>, shutdown: CancellationToken) -> Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout(), shutdown).await
    }

    /// Serve until the input ends or `shutdown` fires.
    ///
    /// Requests are handled concurrently so a long-running tool does not
    /// block `ping`. Each request runs under its own cancellation token,
    /// fired by `notifications/cancelled` or by `shutdown`; a cancelled
    /// request gets no reply. When the loop ends `shutdown` is cancelled
    /// and the remaining replies are written before returning.
    pub async fn serve<R, W>(
        self: Arc<Self>,
        reader: R,
        writer: W,
        shutdown: CancellationToken,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin,
    {
        let mut writer = MessageWriter::new(writer);
        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
        let (msg_tx, mut msg_rx) = mpsc::channel(16);
        let mut in_flight = InFlight::default();

        let reader_task = tokio::spawn(async move {
            let mut reader = MessageReader::new(reader);
            loop {
                let next = reader.read_message().await;
                let done = !matches!(next, Ok(Some(_)));
                if msg_tx.send(next).await.is_err() || done {
                    break;
                }
            }
        });

        tracing::info!(
            server = %self.info.name,
            version = %self.info.version,
            "MCP server ready"
        );

        let outcome = loop {
            tokio::select! {
                _ = shutdown.cancelled() => break Ok(()),
                Some(reply) = reply_rx.recv() => {
                    if !in_flight.finish(&reply.id) {
                        continue;
                    }
                    if let Err(e) = writer.write_message(&reply).await {
                        break Err(e);
                    }
                }
                next = msg_rx.recv() => match next {
                    Some(Ok(Some(message))) => {
                        writer.set_framing(message.framing);
                        let value = match parse_message(&message.body) {
                            Ok(value) => value,
                            Err(reply) => {
                                let _ = reply_tx.send(reply);
                                continue;
                            }
                        };

                        if let Some(cancelled) = cancelled_request(&value) {
                            in_flight.cancel(cancelled);
                        }
                        let ctx = match request_id(&value) {
                            Some(id) => ToolContext::with_cancellation(
                                in_flight.start(id, &shutdown),
                            ),
                            None => ToolContext::new(),
                        };

                        let server = self.clone();
                        let reply_tx = reply_tx.clone();
                        tokio::spawn(async move {
                            if let Some(reply) = server.handle_value(value, &ctx).await {
                                let _ = reply_tx.send(reply);
                            }
                        });
                    }
                    Some(Ok(None)) | None => {
                        tracing::info!("Input closed, shutting down");
                        break Ok(());
                    }
                    Some(Err(e)) => break Err(e),
                }
            }
        };

        shutdown.cancel();
        reader_task.abort();
        drop(reply_tx);

        while let Some(reply) = reply_rx.recv().await {
            if in_flight.finish(&reply.id) {
                writer.write_message(&reply).await?;
            }
        }
        outcome
    }
}

/// Cancellation tokens of requests still being handled, keyed by JSON-RPC id.
#[derive(Debug, Default)]
struct InFlight {
    running: HashMap<String, CancellationToken>,
    cancelled: HashSet<String>,
}

impl InFlight {
    fn start(&mut self, id: &Value, shutdown: &CancellationToken) -> CancellationToken {
        let token = shutdown.child_token();
        self.running.insert(id.to_string(), token.clone());
        token
    }

    fn cancel(&mut self, id: &Value) {
        let key = id.to_string();
        match self.running.remove(&key) {
            Some(token) => {
                tracing::info!(request_id = %key, "Cancelling request");
                token.cancel();
                self.cancelled.insert(key);
            }
            None => tracing::debug!(request_id = %key, "Cancel for unknown or finished request"),
        }
    }

    /// Forget a finished request. `false` when its reply must be dropped.
    fn finish(&mut self, id: &Value) -> bool {
        let key = id.to_string();
        self.running.remove(&key);
        !self.cancelled.remove(&key)
    }
}

fn parse_message(raw: &str) -> std::result::Result<Value, JsonRpcResponse> {
    serde_json::from_str(raw).map_err(|e| {
        tracing::warn!(error = %e, "Unparseable message");
        JsonRpcResponse::failure(
            Value::Null,
            JsonRpcError::parse_error(format!("Parse error: {}", e)),
        )
    })
}

/// The id of a request that expects a reply.
fn request_id(value: &Value) -> Option<&Value> {
    value.get("method")?;
    value.get("id").filter(|id| !id.is_null())
}

/// The `requestId` named by a `notifications/cancelled` message.
fn cancelled_request(value: &Value) -> Option<&Value> {
    if value.get("method")?.as_str()? != "notifications/cancelled" {
        return None;
    }
    value.get("params")?.get("requestId")
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T> {
    let params = params.ok_or_else(|| McpError::invalid_params("missing params"))?;
    serde_json::from_value(params).map_err(|e| McpError::invalid_params(e.to_string()))
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::OAuthConfigResource;

    fn server() -> McpServer {
        let mut resources = ResourceRegistry::new();
        resources.register(OAuthConfigResource);
        McpServer::new("whoop-mcp", "0.1.0").with_resources(resources)
    }

    async fn call(server: &McpServer, raw: &str) -> JsonRpcResponse {
        server.handle_message(raw).await.unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let resp = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test","version":"1"}}}"#,
        )
        .await;
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "whoop-mcp");
        assert!(result["capabilities"]["tools"].is_object());
        assert!(result["capabilities"]["resources"].is_object());
    }

    #[tokio::test]
    async fn test_ping_echoes_string_id() {
        let resp = call(&server(), r#"{"jsonrpc":"2.0","id":"a-1","method":"ping"}"#).await;
        assert_eq!(resp.id, json!("a-1"));
        assert_eq!(resp.result, Some(json!({})));
    }

    #[tokio::test]
    async fn test_notification_gets_no_reply() {
        let server = server();
        assert!(
            server
                .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .await
                .is_none()
        );
        assert!(
            server
                .handle_message(r#"{"jsonrpc":"2.0","method":"unknown/notification"}"#)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_parse_error() {
        let resp = call(&server(), "{not json").await;
        assert_eq!(resp.id, Value::Null);
        assert_eq!(resp.error.unwrap().code, JsonRpcError::PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_invalid_request() {
        let resp = call(&server(), r#"[{"jsonrpc":"2.0","id":1,"method":"ping"}]"#).await;
        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_REQUEST);

        let resp = call(&server(), r#"{"jsonrpc":"1.0","id":3,"method":"ping"}"#).await;
        assert_eq!(resp.id, json!(3));
        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_method_not_found() {
        let resp = call(&server(), r#"{"jsonrpc":"2.0","id":2,"method":"prompts/list"}"#).await;
        assert_eq!(resp.error.unwrap().code, JsonRpcError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tools_call_invalid_params() {
        let resp = call(&server(), r#"{"jsonrpc":"2.0","id":4,"method":"tools/call"}"#).await;
        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_PARAMS);

        let resp = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"nope"}}"#,
        )
        .await;
        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_resources_read() {
        let resp = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":6,"method":"resources/read","params":{"uri":"oauth://config"}}"#,
        )
        .await;
        let result = resp.result.unwrap();
        assert_eq!(result["contents"][0]["uri"], "oauth://config");
        assert_eq!(result["contents"][0]["mimeType"], "application/json");
    }

    #[tokio::test]
    async fn test_client_responses_are_ignored() {
        assert!(
            server()
                .handle_message(r#"{"jsonrpc":"2.0","id":9,"result":{}}"#)
                .await
                .is_none()
        );
    }

    #[test]
    fn test_cancelled_request_id() {
        let cancel = json!({
            "jsonrpc": "2.0",
            "method": "notifications/cancelled",
            "params": {"requestId": "abc"}
        });
        assert_eq!(cancelled_request(&cancel), Some(&json!("abc")));
        assert_eq!(request_id(&cancel), None);

        let ping = json!({"jsonrpc": "2.0", "id": 4, "method": "ping"});
        assert_eq!(cancelled_request(&ping), None);
        assert_eq!(request_id(&ping), Some(&json!(4)));

        let reply = json!({"jsonrpc": "2.0", "id": 4, "result": {}});
        assert_eq!(request_id(&reply), None);
    }

    #[test]
    fn test_in_flight_cancel_fires_token_and_drops_reply() {
        let shutdown = CancellationToken::new();
        let mut in_flight = InFlight::default();

        let first = in_flight.start(&json!(1), &shutdown);
        let second = in_flight.start(&json!("1"), &shutdown);

        in_flight.cancel(&json!(1));
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled(), "numeric and string ids are distinct");

        assert!(!in_flight.finish(&json!(1)));
        assert!(in_flight.finish(&json!("1")));
        // Only the first reply after a cancel is dropped.
        assert!(in_flight.finish(&json!(1)));
    }

    #[test]
    fn test_in_flight_follows_shutdown() {
        let shutdown = CancellationToken::new();
        let mut in_flight = InFlight::default();
        let token = in_flight.start(&json!(9), &shutdown);
        shutdown.cancel();
        assert!(token.is_cancelled());
        assert!(in_flight.finish(&json!(9)));
    }
}
