//! MCP server setup and lifecycle.
//!
//! Implements a JSON-RPC 2.0 MCP server over newline-delimited stdio.
//!
//! Each request line runs on its own task, so a slow tool call never blocks
//! the next request. Responses funnel through one writer task and are
//! written one line at a time.
//!
//! ## Shutdown
//!
//! - stdin EOF: in-flight requests finish and their responses are written.
//! - SIGINT / SIGTERM: in-flight requests are aborted.
//!
//! Either way the rate-limit sweep is stopped and the tokenizer released.

use super::pipeline::ToolPipeline;
use super::resources::ResourceHandler;
use super::tools::ToolContext;
use crate::client::{ObsidianClient, VaultBackend};
use crate::config::ServerConfig;
use crate::services::{RateLimiter, SWEEP_INTERVAL, TokenBudgeter};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::Instrument;

/// MCP protocol version.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name reported by `initialize`.
const SERVER_NAME: &str = "obsidian-mcp";

/// Maximum request line size (1 MiB).
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024;

const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

/// Everything a running server owns.
///
/// Built once at startup and torn down by [`shutdown`](Self::shutdown).
pub struct ServerContext {
    limiter: Arc<RateLimiter>,
    budgeter: Arc<TokenBudgeter>,
    pipeline: ToolPipeline,
    resources: ResourceHandler,
}

impl ServerContext {
    /// Builds a context talking to the configured REST API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or the tokenizer cannot be built.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let client = ObsidianClient::new(&config.api)?;
        Self::with_backend(Arc::new(client), config)
    }

    /// Builds a context over any backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the tokenizer cannot be loaded.
    pub fn with_backend(backend: Arc<dyn VaultBackend>, config: &ServerConfig) -> Result<Self> {
        let budgeter = Arc::new(TokenBudgeter::new(config.max_tokens)?);
        Ok(Self::with_parts(backend, config, budgeter))
    }

    /// Builds a context with an explicit budgeter.
    #[must_use]
    pub fn with_parts(
        backend: Arc<dyn VaultBackend>,
        config: &ServerConfig,
        budgeter: Arc<TokenBudgeter>,
    ) -> Self {
        let tools = ToolContext::new(backend);
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        let resources = ResourceHandler::new(Arc::clone(&tools.tags));
        let pipeline = ToolPipeline::new(
            tools,
            Arc::clone(&limiter),
            Arc::clone(&budgeter),
            config.tool_timeout,
        );
        Self {
            limiter,
            budgeter,
            pipeline,
            resources,
        }
    }

    /// Returns the tool pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &ToolPipeline {
        &self.pipeline
    }

    /// Returns the rate limiter.
    #[must_use]
    pub const fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Stops background work and frees the tokenizer.
    pub fn shutdown(&self) {
        self.limiter.shutdown();
        self.budgeter.release();
        tracing::info!("Server context shut down");
    }
}

/// MCP server over a [`ServerContext`].
#[derive(Clone)]
pub struct McpServer {
    context: Arc<ServerContext>,
}

impl McpServer {
    /// Creates a server over a built context.
    #[must_use]
    pub fn new(context: ServerContext) -> Self {
        Self {
            context: Arc::new(context),
        }
    }

    /// Creates a server talking to the configured REST API.
    ///
    /// # Errors
    ///
    /// Returns an error if the context cannot be built.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        ServerContext::from_config(config).map(Self::new)
    }

    /// Returns the server context.
    #[must_use]
    pub fn context(&self) -> &ServerContext {
        &self.context
    }

    /// Runs over stdin/stdout until EOF or a termination signal.
    ///
    /// # Errors
    ///
    /// Returns an error if stdin cannot be read or stdout written.
    pub async fn run_stdio(&self) -> Result<()> {
        tracing::info!(protocol = PROTOCOL_VERSION, "Starting MCP server on stdio");
        let reader = BufReader::new(tokio::io::stdin());
        self.run_with_shutdown(reader, tokio::io::stdout(), shutdown_signal())
            .await
    }

    /// Runs over arbitrary streams until `reader` reaches EOF.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing fails.
    pub async fn run<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        self.run_with_shutdown(reader, writer, std::future::pending())
            .await
    }

    /// Runs until EOF or until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing fails.
    pub async fn run_with_shutdown<R, W, S>(&self, reader: R, writer: W, shutdown: S) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
        S: Future<Output = ()>,
    {
        self.context.limiter.start_sweep(SWEEP_INTERVAL);

        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let writer_task = tokio::spawn(write_responses(writer, rx));

        let mut in_flight: JoinSet<Option<String>> = JoinSet::new();
        let mut pending: HashMap<tokio::task::Id, Option<Value>> = HashMap::new();
        let mut lines = reader.lines();
        let mut interrupted = false;
        let mut read_error = None;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        let request_id = peek_id(&line);
                        let server = self.clone();
                        let handle = in_flight.spawn(async move { server.handle_request(&line).await });
                        pending.insert(handle.id(), request_id);
                    },
                    Ok(None) => {
                        tracing::info!("stdin closed");
                        break;
                    },
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to read request");
                        read_error = Some(Error::operation("read_stdin", e));
                        break;
                    },
                },
                Some(joined) = in_flight.join_next_with_id() => {
                    finish_request(joined, &mut pending, &tx);
                },
                () = &mut shutdown => {
                    interrupted = true;
                    break;
                },
            }
        }

        if interrupted {
            tracing::info!(in_flight = in_flight.len(), "Aborting in-flight requests");
            in_flight.abort_all();
        }
        while let Some(joined) = in_flight.join_next_with_id().await {
            finish_request(joined, &mut pending, &tx);
        }

        drop(tx);
        let written = match writer_task.await {
            Ok(result) => result,
            Err(e) => Err(Error::operation("write_stdout", e)),
        };

        self.context.shutdown();
        match read_error {
            Some(e) => Err(e),
            None => written,
        }
    }

    /// Handles one JSON-RPC request line.
    ///
    /// Returns `None` for notifications.
    pub async fn handle_request(&self, request: &str) -> Option<String> {
        if request.len() > MAX_REQUEST_BYTES {
            tracing::warn!(
                request_size = request.len(),
                max_size = MAX_REQUEST_BYTES,
                "Request exceeds maximum size limit"
            );
            return Some(format_error(
                None,
                JsonRpcError::new(
                    INVALID_REQUEST,
                    format!(
                        "Request too large: {} bytes (max: {MAX_REQUEST_BYTES} bytes)",
                        request.len()
                    ),
                ),
            ));
        }

        let value: Value = match serde_json::from_str(request) {
            Ok(value) => value,
            Err(e) => {
                metrics::counter!("mcp_requests_total", "method" => "parse_error", "status" => "error")
                    .increment(1);
                return Some(format_error(
                    None,
                    JsonRpcError::new(PARSE_ERROR, format!("Parse error: {e}")),
                ));
            },
        };
        let fallback_id = value.get("id").cloned().filter(|id| !id.is_null());

        let req = match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(req) if req.jsonrpc == "2.0" => req,
            Ok(req) => {
                return Some(format_error(
                    fallback_id,
                    JsonRpcError::new(
                        INVALID_REQUEST,
                        format!("Unsupported jsonrpc version: {}", req.jsonrpc),
                    ),
                ));
            },
            Err(e) => {
                return Some(format_error(
                    fallback_id,
                    JsonRpcError::new(INVALID_REQUEST, format!("Invalid request: {e}")),
                ));
            },
        };

        let Some(id) = req.id else {
            tracing::debug!(method = %req.method, "Ignoring notification");
            return None;
        };

        let span = tracing::info_span!(
            "mcp.request",
            rpc.method = %req.method,
            rpc.id = %id,
            status = tracing::field::Empty
        );
        let start = Instant::now();
        let method = Method::parse(&req.method);

        let result = match method {
            Some(method) => {
                self.dispatch_method(method, req.params)
                    .instrument(span.clone())
                    .await
            },
            None => Err(JsonRpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {}", req.method),
            )),
        };

        let status = if result.is_ok() { "success" } else { "error" };
        span.record("status", status);
        // Unknown names are not recorded as labels.
        let method_label = method.map_or("unknown", Method::label);
        metrics::counter!(
            "mcp_requests_total",
            "method" => method_label,
            "status" => status
        )
        .increment(1);
        metrics::histogram!("mcp_request_duration_ms", "method" => method_label)
            .record(start.elapsed().as_secs_f64() * 1000.0);

        Some(format_response(id, result))
    }

    /// Dispatches a method call.
    async fn dispatch_method(&self, method: Method, params: Option<Value>) -> DispatchResult {
        match method {
            Method::Initialize => Ok(Self::handle_initialize()),
            Method::Ping => Ok(json!({})),
            Method::ListTools => Ok(self.handle_list_tools()),
            Method::CallTool => self.handle_call_tool(params).await,
            Method::ListResources => Ok(self.handle_list_resources()),
            Method::ReadResource => self.handle_read_resource(params).await,
        }
    }

    fn handle_initialize() -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {},
                "resources": {}
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    fn handle_list_tools(&self) -> Value {
        let tools: Vec<Value> = self
            .context
            .pipeline
            .registry()
            .list_tools()
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema
                })
            })
            .collect();

        json!({ "tools": tools })
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> DispatchResult {
        let params = params.ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "Missing params"))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "Missing tool name"))?;
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        let result = self.context.pipeline.call(name, arguments).await?;
        Ok(json!({
            "content": result.content,
            "isError": result.is_error
        }))
    }

    fn handle_list_resources(&self) -> Value {
        let resources: Vec<Value> = self
            .context
            .resources
            .list_resources()
            .iter()
            .map(|r| {
                json!({
                    "uri": r.uri,
                    "name": r.name,
                    "description": r.description,
                    "mimeType": r.mime_type
                })
            })
            .collect();

        json!({ "resources": resources })
    }

    async fn handle_read_resource(&self, params: Option<Value>) -> DispatchResult {
        let uri = params
            .as_ref()
            .and_then(|p| p.get("uri"))
            .and_then(Value::as_str)
            .ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "Missing resource URI"))?;

        let content = self.context.resources.get_resource(uri).await?;
        Ok(json!({
            "contents": [{
                "uri": content.uri,
                "mimeType": content.mime_type,
                "text": content.text
            }]
        }))
    }
}

/// Records a finished request task and queues its response.
fn finish_request(
    joined: std::result::Result<(tokio::task::Id, Option<String>), JoinError>,
    pending: &mut HashMap<tokio::task::Id, Option<Value>>,
    tx: &mpsc::UnboundedSender<String>,
) {
    let response = match joined {
        Ok((task, response)) => {
            pending.remove(&task);
            response
        },
        Err(e) => {
            let request_id = pending.remove(&e.id()).flatten();
            if e.is_cancelled() {
                return;
            }
            let detail = match e.try_into_panic() {
                Ok(payload) => panic_message(payload.as_ref()),
                Err(e) => e.to_string(),
            };
            tracing::error!(panic = %detail, "Request handler panicked");
            request_id.map(|id| format_error(Some(id), JsonRpcError::internal(&detail)))
        },
    };

    if let Some(line) = response {
        if tx.send(line).is_err() {
            tracing::warn!("Response writer closed; dropping response");
        }
    }
}

/// Writes queued responses, one per line.
async fn write_responses<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<String>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| Error::operation("write_stdout", e))?;
        writer
            .write_all(b"\n")
            .await
            .map_err(|e| Error::operation("write_stdout", e))?;
        writer
            .flush()
            .await
            .map_err(|e| Error::operation("flush_stdout", e))?;
    }
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(e) => {
                tracing::warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => tracing::info!("Received SIGINT"),
        () = terminate => tracing::info!("Received SIGTERM"),
    }
}

/// Extracts the text of a panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Extracts a request id without validating the rest of the line.
fn peek_id(line: &str) -> Option<Value> {
    if line.len() > MAX_REQUEST_BYTES {
        return None;
    }
    serde_json::from_str::<Value>(line)
        .ok()
        .and_then(|v| v.get("id").cloned())
        .filter(|id| !id.is_null())
}

fn format_response(id: Value, result: DispatchResult) -> String {
    match result {
        Ok(value) => serialize_response(&JsonRpcResponse {
            jsonrpc: "2.0",
            id: Some(id),
            result: Some(value),
            error: None,
        }),
        Err(error) => format_error(Some(id), error),
    }
}

fn format_error(id: Option<Value>, error: JsonRpcError) -> String {
    serialize_response(&JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(error),
    })
}

fn serialize_response(response: &JsonRpcResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to serialize response");
        format!(
            r#"{{"jsonrpc":"2.0","error":{{"code":{INTERNAL_ERROR},"message":"Failed to serialize response"}}}}"#
        )
    })
}

/// JSON-RPC methods this server answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Initialize,
    Ping,
    ListTools,
    CallTool,
    ListResources,
    ReadResource,
}

impl Method {
    /// Maps a method name; `None` for anything outside the served set.
    fn parse(name: &str) -> Option<Self> {
        match name {
            "initialize" => Some(Self::Initialize),
            "ping" => Some(Self::Ping),
            "tools/list" => Some(Self::ListTools),
            "tools/call" => Some(Self::CallTool),
            "resources/list" => Some(Self::ListResources),
            "resources/read" => Some(Self::ReadResource),
            _ => None,
        }
    }

    /// Metric label for the method.
    const fn label(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Ping => "ping",
            Self::ListTools => "tools/list",
            Self::CallTool => "tools/call",
            Self::ListResources => "resources/list",
            Self::ReadResource => "resources/read",
        }
    }
}

/// Result type for method dispatch.
type DispatchResult = std::result::Result<Value, JsonRpcError>;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl JsonRpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Internal error for a failure outside the error taxonomy.
    fn internal(detail: &str) -> Self {
        Self {
            code: INTERNAL_ERROR,
            message: format!("Internal error: {detail}"),
            data: Some(json!({
                "code": crate::ErrorCode::InternalError.as_str(),
                "details": detail
            })),
        }
    }
}

impl From<Error> for JsonRpcError {
    fn from(error: Error) -> Self {
        let code = error.code();
        let details = match &error {
            Error::Validation(errors) => json!(errors),
            Error::RateLimitExceeded {
                max_requests,
                window,
                ..
            } => json!({
                "maxRequests": max_requests,
                "windowMs": u64::try_from(window.as_millis()).unwrap_or(u64::MAX)
            }),
            Error::Timeout { timeout, .. } => json!({
                "timeoutMs": u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
            }),
            Error::Backend { status, code, .. } => json!({
                "status": status,
                "errorCode": code
            }),
            _ => Value::Null,
        };

        let mut data = json!({ "code": code.as_str() });
        if !details.is_null() {
            data["details"] = details;
        }

        Self {
            code: code.rpc_code(),
            message: error.to_string(),
            data: Some(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, RateLimitConfig};
    use crate::models::{FileEntry, JsonSearchHit, SearchHit};
    use async_trait::async_trait;
    use std::time::Duration;

    struct EmptyVault;

    #[async_trait]
    impl VaultBackend for EmptyVault {
        async fn list_files_in_vault(&self) -> Result<Vec<FileEntry>> {
            Ok(vec![FileEntry::from_listing("", "a.md")])
        }

        async fn list_files_in_dir(&self, _dirpath: &str) -> Result<Vec<FileEntry>> {
            Ok(Vec::new())
        }

        async fn get_file_contents(&self, _filepath: &str) -> Result<String> {
            Err(Error::NoContent)
        }

        async fn search(&self, _query: &str, _context_length: u32) -> Result<Vec<SearchHit>> {
            Ok(Vec::new())
        }

        async fn append_content(&self, _filepath: &str, _content: &str) -> Result<()> {
            Ok(())
        }

        async fn update_content(&self, _filepath: &str, _content: &str) -> Result<()> {
            Ok(())
        }

        async fn search_json(&self, _query: &Value) -> Result<Vec<JsonSearchHit>> {
            Ok(Vec::new())
        }
    }

    /// Vault whose reads panic.
    struct PanickingVault;

    #[async_trait]
    impl VaultBackend for PanickingVault {
        async fn list_files_in_vault(&self) -> Result<Vec<FileEntry>> {
            Ok(Vec::new())
        }

        async fn list_files_in_dir(&self, _dirpath: &str) -> Result<Vec<FileEntry>> {
            Ok(Vec::new())
        }

        #[allow(clippy::panic)]
        async fn get_file_contents(&self, filepath: &str) -> Result<String> {
            panic!("index out of range reading {filepath}")
        }

        async fn search(&self, _query: &str, _context_length: u32) -> Result<Vec<SearchHit>> {
            Ok(Vec::new())
        }

        async fn append_content(&self, _filepath: &str, _content: &str) -> Result<()> {
            Ok(())
        }

        async fn update_content(&self, _filepath: &str, _content: &str) -> Result<()> {
            Ok(())
        }

        async fn search_json(&self, _query: &Value) -> Result<Vec<JsonSearchHit>> {
            Ok(Vec::new())
        }
    }

    fn server() -> McpServer {
        server_with(Arc::new(EmptyVault))
    }

    fn server_with(backend: Arc<dyn VaultBackend>) -> McpServer {
        let config = ServerConfig {
            api: ApiConfig::for_base_url("http://127.0.0.1:27123", "test-key"),
            rate_limit: RateLimitConfig::default().with_max_requests(100),
            max_tokens: 1000,
            tool_timeout: Duration::from_secs(5),
            ..ServerConfig::default()
        };
        let context = ServerContext::with_parts(
            backend,
            &config,
            Arc::new(TokenBudgeter::estimating(config.max_tokens)),
        );
        McpServer::new(context)
    }

    async fn call(server: &McpServer, request: &str) -> Value {
        let line = server.handle_request(request).await.unwrap();
        serde_json::from_str(&line).unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let response = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
        )
        .await;
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], "obsidian-mcp");
    }

    #[tokio::test]
    async fn test_list_tools_uses_input_schema() {
        let response = call(&server(), r#"{"jsonrpc":"2.0","id":"a","method":"tools/list"}"#).await;
        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 10);
        assert!(tools.iter().all(|t| t["inputSchema"].is_object()));
    }

    #[tokio::test]
    async fn test_call_tool_success() {
        let response = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"list_files_in_vault"}}"#,
        )
        .await;
        assert_eq!(response["result"]["isError"], false);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("a.md"));
    }

    #[tokio::test]
    async fn test_no_content_becomes_success() {
        let response = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"get_file_contents","arguments":{"filepath":"empty.md"}}}"#,
        )
        .await;
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        let body: Value = serde_json::from_str(text).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Operation completed successfully");
    }

    #[tokio::test]
    async fn test_tool_errors_carry_code_and_details() {
        let response = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"get_file_contents","arguments":{"filepath":"../x.md"}}}"#,
        )
        .await;
        assert_eq!(response["error"]["code"], -32602);
        assert_eq!(response["error"]["data"]["code"], "BAD_REQUEST");
        assert!(response["error"]["data"]["details"].is_array());

        let response = call(
            &server(),
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"nope"}}"#,
        )
        .await;
        assert_eq!(response["error"]["code"], -32004);
        assert_eq!(response["error"]["data"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let server = server();
        let response = call(&server, "{not json").await;
        assert_eq!(response["error"]["code"], PARSE_ERROR);
        assert!(response["id"].is_null());

        let response = call(&server, r#"{"jsonrpc":"2.0","id":6,"method":"prompts/list"}"#).await;
        assert_eq!(response["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(response["id"], 6);

        let response = call(&server, r#"{"jsonrpc":"2.0","id":7}"#).await;
        assert_eq!(response["error"]["code"], INVALID_REQUEST);
        assert_eq!(response["id"], 7);

        let response = call(&server, r#"{"jsonrpc":"1.0","id":11,"method":"ping"}"#).await;
        assert_eq!(response["error"]["code"], INVALID_REQUEST);
        assert_eq!(response["id"], 11);
        assert!(response["error"]["message"].as_str().unwrap().contains("1.0"));
    }

    #[tokio::test]
    async fn test_oversized_request_rejected() {
        let big = format!(
            r#"{{"jsonrpc":"2.0","id":8,"method":"ping","params":{{"pad":"{}"}}}}"#,
            "x".repeat(MAX_REQUEST_BYTES)
        );
        let response = call(&server(), &big).await;
        assert_eq!(response["error"]["code"], INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let server = server();
        assert!(
            server
                .handle_request(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_resources() {
        let server = server();
        let response = call(&server, r#"{"jsonrpc":"2.0","id":9,"method":"resources/list"}"#).await;
        assert_eq!(response["result"]["resources"][0]["uri"], "obsidian://tags");

        let response = call(
            &server,
            r#"{"jsonrpc":"2.0","id":10,"method":"resources/read","params":{"uri":"obsidian://tags"}}"#,
        )
        .await;
        assert_eq!(response["result"]["contents"][0]["mimeType"], "application/json");
    }

    #[tokio::test]
    async fn test_run_answers_every_request_then_shuts_down() {
        let server = server();
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n"
        );
        let (writer, mut output) = tokio::io::duplex(1 << 20);

        server.run(input.as_bytes(), writer).await.unwrap();

        let mut text = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut output, &mut text)
            .await
            .unwrap();
        let ids: std::collections::BTreeSet<i64> = text
            .lines()
            .map(|l| serde_json::from_str::<Value>(l).unwrap()["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![1, 2]);
        assert!(!server.context().limiter().is_sweeping());
    }

    #[tokio::test]
    async fn test_handler_panic_reports_internal_error_with_detail() {
        let server = server_with(Arc::new(PanickingVault));
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":21,"method":"tools/call","params":{"name":"get_file_contents","arguments":{"filepath":"boom.md"}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":22,"method":"ping"}"#,
            "\n"
        );
        let (writer, mut output) = tokio::io::duplex(1 << 20);

        server.run(input.as_bytes(), writer).await.unwrap();

        let mut text = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut output, &mut text)
            .await
            .unwrap();
        let responses: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 2);

        let failed = responses.iter().find(|r| r["id"] == 21).unwrap();
        assert_eq!(failed["error"]["code"], INTERNAL_ERROR);
        assert_eq!(failed["error"]["data"]["code"], "INTERNAL_ERROR");
        let detail = failed["error"]["data"]["details"].as_str().unwrap();
        assert!(detail.contains("index out of range reading boom.md"), "{detail}");
        assert!(
            failed["error"]["message"]
                .as_str()
                .unwrap()
                .contains("index out of range")
        );

        let ping = responses.iter().find(|r| r["id"] == 22).unwrap();
        assert!(ping["result"].is_object());
    }

    #[test]
    fn test_method_labels_parse_back() {
        for method in [
            Method::Initialize,
            Method::Ping,
            Method::ListTools,
            Method::CallTool,
            Method::ListResources,
            Method::ReadResource,
        ] {
            assert_eq!(Method::parse(method.label()), Some(method));
        }
        assert_eq!(Method::parse("prompts/list"), None);
        assert_eq!(Method::parse("notifications/initialized"), None);
    }

    #[test]
    fn test_panic_message_reads_str_and_string_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "unknown panic");
    }
}
