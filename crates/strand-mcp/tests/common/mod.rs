//! Common test utilities for integration tests.
//!
//! `MockMcpServer` is an in-process MCP endpoint on an ephemeral port that
//! records every request it receives. `ScriptedTransport` hands each exchange
//! to the test, which decides when and how it completes.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use strand_mcp::{McpError, Transport, TransportResponse};

// ─────────────────────────────────────────────────────────────────────────────
// Mock MCP server
// ─────────────────────────────────────────────────────────────────────────────

/// A request as the mock server saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub headers: HeaderMap,
    pub body: Value,
}

impl RecordedRequest {
    pub fn method(&self) -> &str {
        self.body["method"].as_str().unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Startup options for [`MockMcpServer`].
#[derive(Debug, Clone, Default)]
pub struct MockOptions {
    /// Session id returned with the `initialize` response.
    pub session_id: Option<String>,
    /// Protocol version to answer with; echoes the client's when `None`.
    pub protocol_version: Option<String>,
}

#[derive(Default)]
struct MockState {
    options: MockOptions,
    recorded: Mutex<Vec<RecordedRequest>>,
    forced: Mutex<Option<(u16, String)>>,
    notifications: Mutex<VecDeque<Value>>,
}

/// A mock MCP server running in the background.
pub struct MockMcpServer {
    /// The server's address.
    pub addr: SocketAddr,
    state: Arc<MockState>,
    _handle: JoinHandle<()>,
}

impl MockMcpServer {
    /// Start a server with default options.
    pub async fn start() -> Result<Self> {
        Self::start_with(MockOptions::default()).await
    }

    /// Start a server with the given options.
    pub async fn start_with(options: MockOptions) -> Result<Self> {
        let state = Arc::new(MockState {
            options,
            ..Default::default()
        });

        let app = Router::new()
            .route("/mcp", post(handle))
            .with_state(state.clone());

        // Bound before spawning, so connections queue until the server runs.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// The MCP endpoint URL.
    pub fn url(&self) -> String {
        format!("http://{}/mcp", self.addr)
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.recorded.lock().clone()
    }

    /// Methods of every request received so far.
    pub fn methods(&self) -> Vec<String> {
        self.requests().iter().map(|r| r.method().to_string()).collect()
    }

    /// Answer every following exchange with this status and body.
    pub fn force_status(&self, status: u16, body: &str) {
        *self.state.forced.lock() = Some((status, body.to_string()));
    }

    /// Answer the next client notification with this notification body
    /// instead of 202.
    pub fn queue_notification(&self, method: &str, params: Value) {
        self.state
            .notifications
            .lock()
            .push_back(json!({"jsonrpc": "2.0", "method": method, "params": params}));
    }
}

/// An address nothing listens on.
pub async fn unreachable_url() -> Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{}/mcp", addr))
}

async fn handle(State(state): State<Arc<MockState>>, headers: HeaderMap, body: String) -> Response {
    let message: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    state.recorded.lock().push(RecordedRequest {
        headers,
        body: message.clone(),
    });

    if let Some((status, body)) = state.forced.lock().clone() {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, body).into_response();
    }

    let Some(id) = message.get("id").cloned() else {
        return match state.notifications.lock().pop_front() {
            Some(notification) => axum::Json(notification).into_response(),
            None => StatusCode::ACCEPTED.into_response(),
        };
    };

    let method = message["method"].as_str().unwrap_or_default();
    let params = &message["params"];
    let outcome = match method {
        "initialize" => Ok(json!({
            "protocolVersion": state
                .options
                .protocol_version
                .clone()
                .unwrap_or_else(|| params["protocolVersion"].as_str().unwrap_or_default().to_string()),
            "capabilities": {
                "tools": {"listChanged": false},
                "resources": {},
                "prompts": {"listChanged": false}
            },
            "serverInfo": {"name": "mock-mcp-server", "version": "1.0.0"}
        })),
        "tools/list" => Ok(json!({
            "tools": [
                {
                    "name": "echo",
                    "description": "Echo back the input",
                    "inputSchema": {
                        "type": "object",
                        "properties": {"message": {"type": "string"}},
                        "required": ["message"]
                    }
                },
                {
                    "name": "add",
                    "description": "Add two numbers",
                    "inputSchema": {
                        "type": "object",
                        "properties": {"a": {"type": "number"}, "b": {"type": "number"}},
                        "required": ["a", "b"]
                    }
                }
            ]
        })),
        "tools/call" => call_tool(params),
        "resources/list" => Ok(json!({
            "resources": [{
                "uri": "file:///greeting.txt",
                "name": "greeting",
                "mimeType": "text/plain"
            }]
        })),
        "resources/read" => Ok(json!({
            "contents": [{
                "uri": params["uri"],
                "mimeType": "text/plain",
                "text": "hello from the mock server"
            }]
        })),
        "prompts/list" => Ok(json!({
            "prompts": [{
                "name": "greet",
                "description": "Greet someone",
                "arguments": [{"name": "name", "required": true}]
            }]
        })),
        "prompts/get" => Ok(json!({
            "description": "Greet someone",
            "messages": [{
                "role": "user",
                "content": {
                    "type": "text",
                    "text": format!("Say hello to {}", params["arguments"]["name"].as_str().unwrap_or("nobody"))
                }
            }]
        })),
        other => Err((-32601, format!("Method not found: {}", other))),
    };

    let reply = match outcome {
        Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
        Err((code, message)) => {
            json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
        }
    };

    let mut response = axum::Json(reply).into_response();
    if method == "initialize"
        && let Some(session) = &state.options.session_id
        && let Ok(value) = HeaderValue::from_str(session)
    {
        response.headers_mut().insert("mcp-session-id", value);
    }
    response
}

fn call_tool(params: &Value) -> std::result::Result<Value, (i64, String)> {
    let arguments = &params["arguments"];
    match params["name"].as_str().unwrap_or_default() {
        "echo" => Ok(json!({
            "content": [{"type": "text", "text": arguments["message"].as_str().unwrap_or_default()}]
        })),
        "add" => {
            let sum = arguments["a"].as_f64().unwrap_or(0.0) + arguments["b"].as_f64().unwrap_or(0.0);
            Ok(json!({"content": [{"type": "text", "text": sum.to_string()}]}))
        }
        other => Ok(json!({
            "content": [{"type": "text", "text": format!("Unknown tool: {}", other)}],
            "isError": true
        })),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scripted transport
// ─────────────────────────────────────────────────────────────────────────────

/// One in-flight exchange, completed by the test.
pub struct Exchange {
    pub message: Value,
    pub headers: HeaderMap,
    reply: oneshot::Sender<strand_mcp::Result<TransportResponse>>,
}

impl Exchange {
    pub fn id(&self) -> Option<u64> {
        self.message.get("id").and_then(Value::as_u64)
    }

    pub fn method(&self) -> &str {
        self.message["method"].as_str().unwrap_or_default()
    }

    /// Complete the exchange with a reply.
    pub fn reply(self, response: TransportResponse) {
        let _ = self.reply.send(Ok(response));
    }

    /// Complete the exchange with 202 and no body.
    pub fn accept(self) {
        self.reply(TransportResponse::new(202, ""));
    }

    /// Fail the exchange itself.
    pub fn fail(self, error: McpError) {
        let _ = self.reply.send(Err(error));
    }
}

/// Transport that forwards each exchange to the test through a channel.
pub struct ScriptedTransport {
    tx: mpsc::UnboundedSender<Exchange>,
}

impl ScriptedTransport {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Exchange>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(&self, body: String, headers: HeaderMap) -> strand_mcp::Result<TransportResponse> {
        let (reply, rx) = oneshot::channel();
        let exchange = Exchange {
            message: serde_json::from_str(&body)?,
            headers,
            reply,
        };
        self.tx.send(exchange).map_err(|_| McpError::ConnectionClosed)?;
        rx.await.map_err(|_| McpError::ConnectionClosed)?
    }
}

/// A 200 reply carrying a success response for `id`.
pub fn result_for(id: u64, result: Value) -> TransportResponse {
    TransportResponse::new(
        200,
        json!({"jsonrpc": "2.0", "id": id, "result": result}).to_string(),
    )
}
