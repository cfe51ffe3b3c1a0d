//! Transport layer for MCP communication.
//!
//! A transport performs exactly one HTTP POST per message and reports the raw
//! status, headers and body. Interpreting them is the client's job.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{McpError, Result};

/// Raw result of one exchange.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body as text (may be empty).
    pub body: String,
}

impl TransportResponse {
    /// Build a response with no headers.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }
}

/// Something that can deliver one serialized message and return the reply.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` with `headers` and return the raw reply.
    async fn post(&self, body: String, headers: HeaderMap) -> Result<TransportResponse>;

    /// Release held connections. Later posts fail.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Configuration for HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Endpoint URL of the MCP server.
    pub url: String,
    /// Per-exchange timeout.
    pub timeout: Duration,
    /// Extra headers sent with every exchange.
    pub headers: Vec<(String, String)>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout: Duration::from_secs(30),
            headers: Vec::new(),
        }
    }
}

impl HttpTransportConfig {
    /// Create a new HTTP transport config with the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

/// HTTP POST transport backed by `reqwest`.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: url::Url,
    extra_headers: HeaderMap,
    closed: AtomicBool,
}

impl HttpTransport {
    /// Create a new HTTP transport. Does not contact the server.
    pub fn new(config: HttpTransportConfig) -> Result<Self> {
        let url = url::Url::parse(&config.url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(McpError::transport(format!(
                "unsupported URL scheme '{}'",
                url.scheme()
            )));
        }

        let mut extra_headers = HeaderMap::new();
        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| McpError::transport(format!("invalid header name '{}': {}", key, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| McpError::transport(format!("invalid value for header '{}': {}", key, e)))?;
            extra_headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(5)
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| McpError::transport(format!("failed to build HTTP client: {}", e)))?;

        tracing::debug!(
            url = %url,
            timeout_secs = config.timeout.as_secs(),
            "created HTTP transport"
        );

        Ok(Self {
            client,
            url,
            extra_headers,
            closed: AtomicBool::new(false),
        })
    }

    /// The endpoint URL.
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Whether [`close`](Transport::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, body: String, headers: HeaderMap) -> Result<TransportResponse> {
        if self.is_closed() {
            return Err(McpError::ConnectionClosed);
        }

        tracing::trace!(url = %self.url, json = %body, "sending MCP HTTP request");

        let mut all_headers = self.extra_headers.clone();
        all_headers.extend(headers);

        let response = self
            .client
            .post(self.url.clone())
            .headers(all_headers)
            .body(body)
            .send()
            .await
            .map_err(|e| McpError::transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| McpError::transport(format!("failed to read response body: {}", e)))?;

        tracing::trace!(status, json = %body, "received MCP HTTP response");

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
