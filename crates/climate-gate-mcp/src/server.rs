// climate-gate-mcp/src/server.rs
// ============================================================================
// Module: MCP Server
// Description: JSON-RPC 2.0 server over stdio and HTTP transports.
// Purpose: Expose the Climate Gate tools to calling agents.
// Dependencies: climate-gate-archive, climate-gate-config, axum, tokio
// ============================================================================

//! ## Overview
//! [`McpServer`] wires configuration into an archive store, audit sink, and
//! [`QueryPipeline`], then answers `initialize`, `tools/list`, and
//! `tools/call` over Content-Length framed stdio or HTTP POST `/rpc`. Every
//! call is routed through [`ToolRouter`]; only protocol failures surface as
//! JSON-RPC errors, tool failures travel inside the envelope.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::post;
use climate_gate_archive::HttpArchiveConfig;
use climate_gate_archive::HttpArchiveStore;
use climate_gate_archive::InMemoryArchiveStore;
use climate_gate_config::ArchiveBackend;
use climate_gate_config::ArchiveConfig;
use climate_gate_config::ClimateGateConfig;
use climate_gate_config::ServerAuditConfig;
use climate_gate_config::ServerTransport;
use climate_gate_core::ArchiveStore;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::audit::ToolAuditSink;
use crate::audit::ToolFileAuditSink;
use crate::audit::ToolNoopAuditSink;
use crate::audit::ToolStderrAuditSink;
use crate::pipeline::QueryPipeline;
use crate::pipeline::QueryPipelineConfig;
use crate::tools::ToolDefinition;
use crate::tools::ToolError;
use crate::tools::ToolRouter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// MCP protocol revision reported by `initialize`.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Archive round trips budgeted for one tool call.
const ROUND_TRIPS_PER_CALL: u32 = 4;

// ============================================================================
// SECTION: MCP Server
// ============================================================================

/// MCP server instance.
pub struct McpServer {
    /// Server configuration.
    config: ClimateGateConfig,
    /// Tool router for request dispatch.
    router: ToolRouter,
}

impl McpServer {
    /// Builds a new MCP server from configuration.
    ///
    /// The HTTP archive client is blocking; call this from a blocking
    /// context such as [`tokio::task::spawn_blocking`].
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when configuration is invalid or the
    /// archive store, audit sink, or plot sink cannot be initialized.
    pub fn from_config(config: ClimateGateConfig) -> Result<Self, McpServerError> {
        config.validate().map_err(|err| McpServerError::Config(err.to_string()))?;
        let store = build_store(&config.archive)?;
        let mut pipeline_config = QueryPipelineConfig::from_config(&config, store)
            .map_err(|err| McpServerError::Init(err.to_string()))?;
        pipeline_config.audit = build_audit_sink(&config.server.audit)?;
        let pipeline = QueryPipeline::new(pipeline_config);
        let router = ToolRouter::new(Arc::new(pipeline), call_timeout(&config.archive))
            .with_read_allowance(read_allowance(&config.archive));
        Ok(Self {
            config,
            router,
        })
    }

    /// Tool router backing this server.
    #[must_use]
    pub const fn router(&self) -> &ToolRouter {
        &self.router
    }

    /// Serves requests using the configured transport.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when the transport fails.
    pub async fn serve(self) -> Result<(), McpServerError> {
        match self.config.server.transport {
            ServerTransport::Stdio => serve_stdio(&self.router, self.config.server.max_body_bytes).await,
            ServerTransport::Http => serve_http(self.config, self.router).await,
        }
    }
}

/// Builds the archive store for the configured backend.
fn build_store(config: &ArchiveConfig) -> Result<Arc<dyn ArchiveStore>, McpServerError> {
    match config.backend {
        ArchiveBackend::Http => {
            let base_url = config.base_url.clone().ok_or_else(|| {
                McpServerError::Config("http archive backend requires base_url".to_string())
            })?;
            let store = HttpArchiveStore::new(&HttpArchiveConfig {
                base_url,
                allow_http: config.allow_http,
                connect_timeout_ms: config.connect_timeout_ms,
                request_timeout_ms: config.request_timeout_ms,
                max_response_bytes: config.max_response_bytes,
                user_agent: config.user_agent.clone(),
            })
            .map_err(|err| McpServerError::Init(err.to_string()))?;
            Ok(Arc::new(store))
        }
        ArchiveBackend::Fixture => {
            let path = config.fixture_path.as_deref().ok_or_else(|| {
                McpServerError::Config("fixture archive backend requires fixture_path".to_string())
            })?;
            let store = InMemoryArchiveStore::load(Path::new(path))
                .map_err(|err| McpServerError::Init(err.to_string()))?;
            Ok(Arc::new(store))
        }
    }
}

/// Selects the audit sink from `[server.audit]`.
fn build_audit_sink(
    config: &ServerAuditConfig,
) -> Result<Arc<dyn ToolAuditSink>, McpServerError> {
    if !config.enabled {
        return Ok(Arc::new(ToolNoopAuditSink));
    }
    match &config.path {
        Some(path) => {
            let sink = ToolFileAuditSink::new(Path::new(path))
                .map_err(|err| McpServerError::Init(format!("audit log {path}: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(ToolStderrAuditSink)),
    }
}

/// Base deadline for one tool call: listing and header round trips plus one retry pause.
fn call_timeout(config: &ArchiveConfig) -> Duration {
    config.request_timeout().saturating_mul(ROUND_TRIPS_PER_CALL).saturating_add(config.retry_backoff())
}

/// Time granted per planned array read: two attempts and the pause between them.
fn read_allowance(config: &ArchiveConfig) -> Duration {
    config.request_timeout().saturating_mul(2).saturating_add(config.retry_backoff())
}

// ============================================================================
// SECTION: Stdio Transport
// ============================================================================

/// Serves JSON-RPC requests over stdin/stdout until stdin closes.
async fn serve_stdio(router: &ToolRouter, max_body_bytes: usize) -> Result<(), McpServerError> {
    let mut reader = BufReader::new(std::io::stdin());
    let mut writer = std::io::stdout();
    loop {
        let bytes = blocking(|| read_framed(&mut reader, max_body_bytes))?;
        let (_, response) = parse_request(router, max_body_bytes, &bytes).await;
        let Some(response) = response else {
            continue;
        };
        let payload = serde_json::to_vec(&response)
            .map_err(|_| McpServerError::Transport("json-rpc serialization failed".to_string()))?;
        blocking(|| write_framed(&mut writer, &payload))?;
    }
}

/// Runs blocking stdio work, shifting off the async worker when possible.
fn blocking<T>(work: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(work)
        }
        _ => work(),
    }
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Serves JSON-RPC requests over HTTP.
async fn serve_http(config: ClimateGateConfig, router: ToolRouter) -> Result<(), McpServerError> {
    let addr: SocketAddr =
        config.server.bind_addr().map_err(|err| McpServerError::Config(err.to_string()))?;
    let state = Arc::new(ServerState {
        router,
        max_body_bytes: config.server.max_body_bytes,
    });
    let app = Router::new().route("/rpc", post(handle_http)).with_state(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|_| McpServerError::Transport("http bind failed".to_string()))?;
    axum::serve(listener, app.into_make_service())
        .await
        .map_err(|_| McpServerError::Transport("http server failed".to_string()))
}

/// Shared server state for HTTP handlers.
#[derive(Clone)]
struct ServerState {
    /// Tool router for request dispatch.
    router: ToolRouter,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
}

/// Handles HTTP JSON-RPC requests.
async fn handle_http(State(state): State<Arc<ServerState>>, bytes: Bytes) -> Response {
    match parse_request(&state.router, state.max_body_bytes, &bytes).await {
        (status, Some(response)) => (status, axum::Json(response)).into_response(),
        (status, None) => status.into_response(),
    }
}

// ============================================================================
// SECTION: JSON-RPC Handling
// ============================================================================

/// Incoming JSON-RPC request payload.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    jsonrpc: String,
    /// Request identifier; absent for notifications.
    #[serde(default)]
    id: Value,
    /// Method name.
    method: String,
    /// Optional parameters payload.
    params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    jsonrpc: &'static str,
    /// Request identifier.
    id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Successful response.
    const fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error response.
    const fn failure(id: Value, code: i64, message: String) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
            }),
        }
    }
}

/// JSON-RPC error payload.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    /// Error code.
    code: i64,
    /// Human-readable error message.
    message: String,
}

/// Tool call parameters for JSON-RPC requests.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw JSON arguments.
    #[serde(default)]
    arguments: Value,
}

/// Tool list response payload.
#[derive(Debug, Serialize)]
struct ToolListResult {
    /// Registered tool definitions.
    tools: Vec<ToolDefinition>,
}

/// Tool call response payload.
#[derive(Debug, Serialize)]
struct ToolCallResult {
    /// Tool output content.
    content: Vec<ToolContent>,
}

/// Tool output payloads for JSON-RPC responses.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ToolContent {
    /// JSON tool output.
    Json {
        /// Envelope payload.
        json: Value,
    },
}

/// Status and optional body; notifications have no body.
type Reply = (StatusCode, Option<JsonRpcResponse>);

/// Parses and validates a JSON-RPC request payload.
async fn parse_request(router: &ToolRouter, max_body_bytes: usize, bytes: &[u8]) -> Reply {
    if bytes.len() > max_body_bytes {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            Some(JsonRpcResponse::failure(
                Value::Null,
                -32070,
                "request body too large".to_string(),
            )),
        );
    }
    match serde_json::from_slice::<JsonRpcRequest>(bytes) {
        Ok(request) => handle_request(router, request).await,
        Err(_) => (
            StatusCode::BAD_REQUEST,
            Some(JsonRpcResponse::failure(
                Value::Null,
                -32600,
                "invalid json-rpc request".to_string(),
            )),
        ),
    }
}

/// Dispatches a JSON-RPC request to the tool router.
async fn handle_request(router: &ToolRouter, request: JsonRpcRequest) -> Reply {
    let id = request.id;
    if request.jsonrpc != "2.0" {
        return (
            StatusCode::BAD_REQUEST,
            Some(JsonRpcResponse::failure(id, -32600, "invalid json-rpc version".to_string())),
        );
    }
    if request.method.starts_with("notifications/") {
        return (StatusCode::ACCEPTED, None);
    }
    let result = match request.method.as_str() {
        "initialize" => Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": { "name": "climate-gate", "version": env!("CARGO_PKG_VERSION") },
            "capabilities": { "tools": {} }
        })),
        "tools/list" => serde_json::to_value(ToolListResult {
            tools: router.list_tools(),
        })
        .map_err(|_| ToolError::Serialization),
        "tools/call" => call_tool(router, &id, request.params).await,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Some(JsonRpcResponse::failure(id, -32601, "method not found".to_string())),
            );
        }
    };
    match result {
        Ok(value) => (StatusCode::OK, Some(JsonRpcResponse::ok(id, value))),
        Err(err) => jsonrpc_error(id, err),
    }
}

/// Runs `tools/call` and wraps the envelope as tool content.
async fn call_tool(router: &ToolRouter, id: &Value, params: Option<Value>) -> Result<Value, ToolError> {
    let call = serde_json::from_value::<ToolCallParams>(params.unwrap_or(Value::Null))
        .map_err(|_| ToolError::InvalidParams("invalid tool params".to_string()))?;
    let request_id = match id {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    };
    let envelope = router.handle_tool_call(request_id, &call.name, call.arguments).await?;
    serde_json::to_value(ToolCallResult {
        content: vec![ToolContent::Json {
            json: envelope,
        }],
    })
    .map_err(|_| ToolError::Serialization)
}

/// Builds a JSON-RPC error response for a routing failure.
fn jsonrpc_error(id: Value, error: ToolError) -> Reply {
    let (status, code, message) = match error {
        ToolError::UnknownTool(name) => {
            (StatusCode::BAD_REQUEST, -32601, format!("unknown tool: {name}"))
        }
        ToolError::InvalidParams(message) => (StatusCode::BAD_REQUEST, -32602, message),
        ToolError::Serialization => (StatusCode::OK, -32060, "serialization failed".to_string()),
    };
    (status, Some(JsonRpcResponse::failure(id, code, message)))
}

// ============================================================================
// SECTION: Framing Helpers
// ============================================================================

/// Reads a framed stdio payload using MCP Content-Length headers.
fn read_framed(
    reader: &mut BufReader<impl Read>,
    max_body_bytes: usize,
) -> Result<Vec<u8>, McpServerError> {
    let mut content_length: Option<usize> = None;
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
        if bytes == 0 {
            return Err(McpServerError::Transport("stdio closed".to_string()));
        }
        if line.trim().is_empty() {
            if content_length.is_some() {
                break;
            }
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            return Err(McpServerError::Transport("malformed header line".to_string()));
        };
        if name.trim().eq_ignore_ascii_case("content-length") {
            let parsed = value
                .trim()
                .parse::<usize>()
                .map_err(|_| McpServerError::Transport("invalid content length".to_string()))?;
            content_length = Some(parsed);
        }
    }
    let len = content_length
        .ok_or_else(|| McpServerError::Transport("missing content length".to_string()))?;
    if len > max_body_bytes {
        return Err(McpServerError::Transport("payload too large".to_string()));
    }
    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
    Ok(buf)
}

/// Writes a framed stdio payload using MCP Content-Length headers.
fn write_framed(writer: &mut impl Write, payload: &[u8]) -> Result<(), McpServerError> {
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    writer
        .write_all(header.as_bytes())
        .and_then(|()| writer.write_all(payload))
        .and_then(|()| writer.flush())
        .map_err(|_| McpServerError::Transport("stdio write failed".to_string()))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// MCP server errors.
#[derive(Debug, thiserror::Error)]
pub enum McpServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    //! Framing and JSON-RPC dispatch checks.

    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use std::io::BufReader;
    use std::io::Cursor;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::StatusCode;
    use climate_gate_archive::InMemoryArchiveStore;
    use climate_gate_config::ClimateGateConfig;
    use serde_json::Value;
    use serde_json::json;

    use super::McpServerError;
    use super::call_timeout;
    use super::parse_request;
    use super::read_allowance;
    use super::read_framed;
    use super::write_framed;
    use crate::pipeline::QueryPipeline;
    use crate::pipeline::QueryPipelineConfig;
    use crate::tools::ToolRouter;

    fn router() -> ToolRouter {
        let store = Arc::new(InMemoryArchiveStore::new());
        let config = QueryPipelineConfig::from_config(&ClimateGateConfig::default(), store).unwrap();
        ToolRouter::new(Arc::new(QueryPipeline::new(config)), Duration::from_secs(5))
    }

    async fn rpc(router: &ToolRouter, body: Value) -> (StatusCode, Value) {
        let bytes = serde_json::to_vec(&body).unwrap();
        let (status, response) = parse_request(router, 64 * 1024, &bytes).await;
        (status, response.map_or(Value::Null, |response| serde_json::to_value(response).unwrap()))
    }

    #[test]
    fn read_framed_rejects_payload_over_limit() {
        let payload = b"Content-Length: 10\r\n\r\n0123456789";
        let mut reader = BufReader::new(Cursor::new(payload.as_slice()));
        let result = read_framed(&mut reader, 9);
        assert!(matches!(result, Err(McpServerError::Transport(_))));
    }

    #[test]
    fn read_framed_accepts_payload_at_limit() {
        let payload = b"Content-Length: 10\r\n\r\n0123456789";
        let mut reader = BufReader::new(Cursor::new(payload.as_slice()));
        assert_eq!(read_framed(&mut reader, 10).unwrap(), b"0123456789");
    }

    #[test]
    fn read_framed_ignores_other_headers_and_case() {
        let payload = b"content-type: application/json\r\ncontent-length: 2\r\n\r\n{}";
        let mut reader = BufReader::new(Cursor::new(payload.as_slice()));
        assert_eq!(read_framed(&mut reader, 16).unwrap(), b"{}");
    }

    #[test]
    fn read_framed_reports_closed_stream() {
        let mut reader = BufReader::new(Cursor::new(b"".as_slice()));
        assert!(matches!(read_framed(&mut reader, 16), Err(McpServerError::Transport(_))));
    }

    #[test]
    fn write_then_read_frames_back_to_back() {
        let mut buffer = Vec::new();
        write_framed(&mut buffer, b"{\"a\":1}").unwrap();
        write_framed(&mut buffer, b"[]").unwrap();
        let mut reader = BufReader::new(Cursor::new(buffer));
        assert_eq!(read_framed(&mut reader, 64).unwrap(), b"{\"a\":1}");
        assert_eq!(read_framed(&mut reader, 64).unwrap(), b"[]");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn initialize_reports_tool_capability() {
        let (status, body) =
            rpc(&router(), json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["serverInfo"]["name"], "climate-gate");
        assert!(body["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn tools_list_returns_five_tools() {
        let (_, body) =
            rpc(&router(), json!({"jsonrpc": "2.0", "id": "a", "method": "tools/list"})).await;
        let tools = body["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 5);
        assert_eq!(tools[3]["name"], "query_data");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_tool_is_a_protocol_error() {
        let (status, body) = rpc(
            &router(),
            json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "tools/call",
                "params": { "name": "delete_archive", "arguments": {} }
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], -32601);
        assert_eq!(body["id"], 7);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn tool_failures_travel_in_the_envelope() {
        let (status, body) = rpc(
            &router(),
            json!({
                "jsonrpc": "2.0",
                "id": 8,
                "method": "tools/call",
                "params": { "name": "browse_directory", "arguments": { "path": "nowhere" } }
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let envelope = &body["result"]["content"][0]["json"];
        assert_eq!(body["result"]["content"][0]["type"], "json");
        assert_eq!(envelope["status"], "error");
        assert_eq!(envelope["error_kind"], "not_found");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn malformed_requests_are_rejected() {
        let router = router();
        let (status, body) = rpc(&router, json!({"jsonrpc": "1.0", "id": 1, "method": "tools/list"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], -32600);
        let (_, body) = rpc(&router, json!({"jsonrpc": "2.0", "id": 1, "method": "resources/list"})).await;
        assert_eq!(body["error"]["code"], -32601);
        let (_, body) = rpc(
            &router,
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"arguments": {}}}),
        )
        .await;
        assert_eq!(body["error"]["code"], -32602);
        let (status, _) = parse_request(&router, 4, b"{\"jsonrpc\":\"2.0\"}").await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn notifications_get_no_response() {
        let (status, body) = rpc(
            &router(),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(body.is_null());
    }

    #[test]
    fn deadline_budget_follows_archive_timeouts() {
        let mut config = ClimateGateConfig::default();
        config.archive.request_timeout_ms = 1_000;
        config.archive.retry_backoff_ms = 250;
        assert_eq!(call_timeout(&config.archive), Duration::from_millis(4_250));
        assert_eq!(read_allowance(&config.archive), Duration::from_millis(2_250));
    }
}
