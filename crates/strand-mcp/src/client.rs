//! MCP client for communicating with a single MCP server over HTTP.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Value, json};

use crate::correlator::Correlator;
use crate::dispatcher::NotificationDispatcher;
use crate::error::{McpError, Result};
use crate::handshake::{Begin, Handshake, HandshakeState};
use crate::protocol::{
    CallToolParams, CallToolResult, ClientInfo, DEFAULT_PROTOCOL_VERSION, GetPromptParams,
    GetPromptResult, InitializeParams, InitializeResult, JsonRpcNotification, JsonRpcRequest,
    ListPromptsResult, ListResourcesResult, ListToolsResult, Message, PromptInfo,
    ReadResourceParams, ReadResourceResult, ResourceInfo, ToolInfo, methods,
};
use crate::session::{SessionConflictPolicy, SessionTracker};
use crate::transport::{HttpTransport, HttpTransportConfig, Transport, TransportResponse};

/// Default deadline for a request's response.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default per-exchange HTTP timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROTOCOL_VERSION_HEADER: HeaderName = HeaderName::from_static("mcp-protocol-version");
const ACCEPT_VALUE: &str = "application/json, text/event-stream";

/// Configuration for an MCP server connection.
#[derive(Debug, Clone)]
pub struct McpClientConfig {
    /// Name for this server (used in logs and fan-out maps).
    pub name: String,
    /// Endpoint URL.
    pub url: String,
    /// Protocol version offered during the handshake.
    pub protocol_version: String,
    /// Deadline for each request's response. `None` waits forever.
    pub request_timeout: Option<Duration>,
    /// How conflicting session ids are handled.
    pub session_conflict: SessionConflictPolicy,
    /// Per-exchange HTTP timeout.
    pub http_timeout: Duration,
    /// Extra HTTP headers.
    pub headers: Vec<(String, String)>,
}

impl McpClientConfig {
    /// Create a config for the named endpoint.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            session_conflict: SessionConflictPolicy::default(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            headers: Vec::new(),
        }
    }

    /// Set the protocol version offered during the handshake.
    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    /// Set the request deadline (`None` disables it).
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the session conflict policy.
    pub fn with_session_conflict(mut self, policy: SessionConflictPolicy) -> Self {
        self.session_conflict = policy;
        self
    }

    /// Set the per-exchange HTTP timeout.
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Add an HTTP header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

/// An MCP client bound to a single server endpoint.
///
/// Requests may be issued concurrently from the same instance; each gets its
/// own identifier and its own pending entry, so responses can be delivered in
/// any order.
pub struct McpClient {
    config: McpClientConfig,
    transport: Arc<dyn Transport>,
    correlator: Correlator,
    session: SessionTracker,
    handshake: Handshake,
    dispatcher: NotificationDispatcher,
    /// Version sent in `MCP-Protocol-Version`; replaced by the server's choice
    /// after the handshake.
    protocol_version: RwLock<String>,
    closed: AtomicBool,
}

impl McpClient {
    /// Create a client using HTTP transport.
    ///
    /// This does NOT contact the server. Call [`initialize`](Self::initialize)
    /// to run the handshake.
    pub fn connect_http(config: McpClientConfig) -> Result<Self> {
        let mut http_config =
            HttpTransportConfig::new(&config.url).with_timeout(config.http_timeout);
        for (key, value) in &config.headers {
            http_config = http_config.with_header(key, value);
        }
        let transport = HttpTransport::new(http_config)?;

        tracing::info!(
            server = %config.name,
            url = %config.url,
            "created MCP client"
        );

        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over an arbitrary transport.
    pub fn with_transport(config: McpClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            session: SessionTracker::new(config.session_conflict),
            protocol_version: RwLock::new(config.protocol_version.clone()),
            config,
            transport,
            correlator: Correlator::new(),
            handshake: Handshake::new(),
            dispatcher: NotificationDispatcher::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Get the endpoint URL.
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// The session id assigned by the server, if any.
    pub fn session_id(&self) -> Option<String> {
        self.session.current()
    }

    /// The protocol version currently sent with each exchange.
    pub fn protocol_version(&self) -> String {
        self.protocol_version.read().clone()
    }

    /// Current handshake state.
    pub fn handshake_state(&self) -> HandshakeState {
        self.handshake.state()
    }

    /// Check if the handshake completed.
    pub fn is_initialized(&self) -> bool {
        self.handshake.state() == HandshakeState::Ready
    }

    /// The parsed `initialize` result, once ready.
    pub fn server_info(&self) -> Option<InitializeResult> {
        self.handshake
            .result()
            .and_then(|result| serde_json::from_value(result).ok())
    }

    /// Number of requests still awaiting a response.
    pub fn pending_requests(&self) -> usize {
        self.correlator.pending_count()
    }

    /// The identifier the next request will use.
    pub fn next_request_id(&self) -> u64 {
        self.correlator.peek_next_id()
    }

    /// Check if [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Core exchange
    // ─────────────────────────────────────────────────────────────────────────

    /// Headers attached to every outbound exchange.
    fn outbound_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));

        let version = self.protocol_version.read().clone();
        let version = HeaderValue::from_str(&version)
            .map_err(|_| McpError::transport(format!("invalid protocol version '{}'", version)))?;
        headers.insert(PROTOCOL_VERSION_HEADER, version);

        self.session.apply(&mut headers);
        Ok(headers)
    }

    /// Post one envelope and interpret the reply.
    async fn exchange(&self, message: &Message) -> Result<()> {
        if self.is_closed() {
            return Err(McpError::ConnectionClosed);
        }

        let body = serde_json::to_string(message)?;
        let headers = self.outbound_headers()?;
        let response = self.transport.post(body, headers).await?;
        self.on_transport_result(response)
    }

    /// Interpret the reply of one completed exchange.
    ///
    /// 202 acknowledges without content. 200 carries one envelope: responses
    /// settle their pending request, notifications go to the registered
    /// handlers. An error response with a null id rejects the message this
    /// exchange carried. Any other status is an error carrying the body text.
    ///
    /// The body is routed even when the session header conflicts, so a
    /// response for another pending request is never lost.
    pub fn on_transport_result(&self, response: TransportResponse) -> Result<()> {
        let session = self.session.observe(&response.headers);
        let routed = self.route(response.status, &response.body);
        session.and(routed)
    }

    fn route(&self, status: u16, body: &str) -> Result<()> {
        match status {
            202 => Ok(()),
            200 => {
                match Message::parse(body)? {
                    Message::Response(resp) if resp.id.is_none() => {
                        let error = resp.into_result().err().ok_or_else(|| {
                            McpError::malformed("response without id carries a result")
                        })?;
                        tracing::warn!(
                            server = %self.config.name,
                            code = error.code,
                            message = %error.message,
                            "server rejected the message"
                        );
                        return Err(McpError::server_error(error.code, error.message, error.data));
                    }
                    Message::Response(resp) => {
                        self.correlator.resolve_response(resp);
                    }
                    Message::Notification(notification) => {
                        self.dispatcher.dispatch(&notification);
                    }
                    Message::Request(req) => {
                        tracing::warn!(
                            server = %self.config.name,
                            id = req.id,
                            method = %req.method,
                            "ignoring server-initiated request"
                        );
                    }
                }
                Ok(())
            }
            status => Err(McpError::http(status, body)),
        }
    }

    /// Send a request and wait for its response's result.
    ///
    /// Any failure of the exchange itself settles this request immediately;
    /// otherwise the response may arrive on any later exchange, bounded by the
    /// configured request deadline.
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.correlator.allocate_id();
        let pending = self.correlator.register(id);
        let message = Message::Request(JsonRpcRequest::new(id, method, params));

        tracing::debug!(server = %self.config.name, id, method, "sending MCP request");

        if let Err(e) = self.exchange(&message).await {
            self.correlator.cancel(id);
            tracing::debug!(
                server = %self.config.name,
                id,
                method,
                error = %e,
                "MCP request failed"
            );
            return Err(e);
        }

        pending.wait(self.config.request_timeout).await
    }

    /// Send a notification (no response expected).
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        tracing::debug!(server = %self.config.name, method, "sending MCP notification");
        let message = Message::Notification(JsonRpcNotification::new(method, params));
        self.exchange(&message).await
    }

    /// Register a handler for notifications sent by the server.
    pub fn on_message<F>(&self, handler: F)
    where
        F: Fn(&JsonRpcNotification) + Send + Sync + 'static,
    {
        self.dispatcher.register(handler);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Handshake
    // ─────────────────────────────────────────────────────────────────────────

    /// Run the MCP handshake and return the `initialize` result unchanged.
    ///
    /// A failed handshake leaves this client unusable for another attempt.
    /// Calling this again after success returns the stored result.
    pub async fn initialize(&self, client_info: ClientInfo) -> Result<Value> {
        if let Begin::AlreadyReady(result) = self.handshake.begin()? {
            return Ok(result);
        }

        let params = InitializeParams::new(self.protocol_version(), client_info);
        let result = self
            .request(methods::INITIALIZE, Some(serde_json::to_value(&params)?))
            .await?;

        match serde_json::from_value::<InitializeResult>(result.clone()) {
            Ok(init) => {
                tracing::info!(
                    server = %self.config.name,
                    server_name = %init.server_info.name,
                    version = %init.server_info.version,
                    protocol = %init.protocol_version,
                    "MCP server initialized"
                );
                let mut version = self.protocol_version.write();
                if *version != init.protocol_version {
                    tracing::debug!(
                        offered = %*version,
                        negotiated = %init.protocol_version,
                        "server chose a different protocol version"
                    );
                    *version = init.protocol_version;
                }
            }
            Err(e) => {
                tracing::warn!(
                    server = %self.config.name,
                    error = %e,
                    "initialize result is not a standard InitializeResult"
                );
            }
        }

        if let Err(e) = self.notify(methods::INITIALIZED, None).await {
            tracing::warn!(
                server = %self.config.name,
                error = %e,
                "initialized notification was not acknowledged"
            );
        }

        self.handshake.complete(result.clone());
        Ok(result)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Convenience wrappers
    // ─────────────────────────────────────────────────────────────────────────

    /// List available tools from the server.
    pub async fn list_tools(&self) -> Result<Vec<ToolInfo>> {
        let result = self.request(methods::TOOLS_LIST, None).await?;
        let list: ListToolsResult = serde_json::from_value(result)?;

        tracing::debug!(
            server = %self.config.name,
            tool_count = list.tools.len(),
            "listed MCP tools"
        );

        Ok(list.tools)
    }

    /// Call a tool on the server.
    pub async fn call_tool(&self, name: &str, arguments: Option<Value>) -> Result<CallToolResult> {
        let params = CallToolParams {
            name: name.to_string(),
            arguments: arguments.unwrap_or_else(|| json!({})),
        };

        let result = self
            .request(methods::TOOLS_CALL, Some(serde_json::to_value(&params)?))
            .await?;
        let call_result: CallToolResult = serde_json::from_value(result)?;

        if call_result.is_error() {
            tracing::warn!(server = %self.config.name, tool = %name, "tool call returned error");
        } else {
            tracing::debug!(server = %self.config.name, tool = %name, "tool call succeeded");
        }

        Ok(call_result)
    }

    /// A handle bound to one tool name.
    pub fn tool<'a>(&'a self, name: &'a str) -> ToolHandle<'a> {
        ToolHandle { client: self, name }
    }

    /// List available resources.
    pub async fn list_resources(&self) -> Result<Vec<ResourceInfo>> {
        let result = self.request(methods::RESOURCES_LIST, None).await?;
        let list: ListResourcesResult = serde_json::from_value(result)?;
        Ok(list.resources)
    }

    /// Read a resource by URI.
    pub async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult> {
        let params = ReadResourceParams {
            uri: uri.to_string(),
        };
        let result = self
            .request(methods::RESOURCES_READ, Some(serde_json::to_value(&params)?))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// List available prompts.
    pub async fn list_prompts(&self) -> Result<Vec<PromptInfo>> {
        let result = self.request(methods::PROMPTS_LIST, None).await?;
        let list: ListPromptsResult = serde_json::from_value(result)?;
        Ok(list.prompts)
    }

    /// Expand a prompt template.
    pub async fn get_prompt(&self, name: &str, arguments: Option<Value>) -> Result<GetPromptResult> {
        let params = GetPromptParams {
            name: name.to_string(),
            arguments: arguments.unwrap_or_else(|| json!({})),
        };
        let result = self
            .request(methods::PROMPTS_GET, Some(serde_json::to_value(&params)?))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Close the client.
    ///
    /// Pending requests are abandoned, not rejected: their waiters observe
    /// [`McpError::ConnectionClosed`]. Later calls fail the same way.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let abandoned = self.correlator.abandon_all();
        self.session.clear();
        tracing::info!(server = %self.config.name, abandoned, "closing MCP client");

        self.transport.close().await
    }
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient")
            .field("name", &self.config.name)
            .field("url", &self.config.url)
            .field("state", &self.handshake.state())
            .field("session_id", &self.session.current())
            .field("pending", &self.correlator.pending_count())
            .finish()
    }
}

/// A tool bound by name, so call sites read `client.tool("search").call(args)`.
#[derive(Debug, Clone, Copy)]
pub struct ToolHandle<'a> {
    client: &'a McpClient,
    name: &'a str,
}

impl ToolHandle<'_> {
    /// The tool name.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Invoke the tool.
    pub async fn call(&self, arguments: Value) -> Result<CallToolResult> {
        self.client.call_tool(self.name, Some(arguments)).await
    }
}
