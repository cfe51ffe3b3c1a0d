//! Error types for MCP operations.

use thiserror::Error;

/// Result type for MCP operations.
pub type Result<T> = std::result::Result<T, McpError>;

/// Error type for MCP operations.
#[derive(Debug, Error)]
pub enum McpError {
    /// The HTTP exchange itself failed (connect, send, read).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a status other than 200 or 202.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Raw response body, kept as diagnostic text.
        body: String,
    },

    /// The response body was not a recognizable JSON-RPC envelope.
    #[error("failed to parse response: {0}")]
    MalformedResponse(String),

    /// Server returned an error response.
    #[error("MCP error {code}: {message}")]
    ServerError {
        /// Error code from the server.
        code: i64,
        /// Error message from the server.
        message: String,
        /// Optional additional data.
        data: Option<serde_json::Value>,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The endpoint URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The server assigned a different session id than the one held.
    #[error("session conflict: holding '{held}', server sent '{received}'")]
    SessionConflict {
        /// Session id currently in use.
        held: String,
        /// Session id carried by the rejected response.
        received: String,
    },

    /// The handshake cannot be (re)started on this client.
    #[error("handshake error: {0}")]
    Handshake(String),

    /// A server in a fan-out failed to initialize.
    #[error("server '{server}' failed to initialize: {source}")]
    ServerInit {
        /// Name of the failing server.
        server: String,
        /// Underlying failure.
        #[source]
        source: Box<McpError>,
    },

    /// No server with this name is configured.
    #[error("server '{0}' not configured")]
    UnknownServer(String),

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Request deadline elapsed before its response arrived.
    #[error("timeout waiting for response to request {id}")]
    Timeout {
        /// Identifier of the request that timed out.
        id: u64,
    },
}

impl McpError {
    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an HTTP status error.
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    /// Create a malformed response error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create a server error from an error response.
    pub fn server_error(
        code: i64,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self::ServerError {
            code,
            message: message.into(),
            data,
        }
    }

    /// Create a handshake error.
    pub fn handshake(msg: impl Into<String>) -> Self {
        Self::Handshake(msg.into())
    }

    /// The JSON-RPC error code, for server errors.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::ServerError { code, .. } => Some(*code),
            Self::ServerInit { source, .. } => source.code(),
            _ => None,
        }
    }

    /// The HTTP status, for HTTP errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::ServerInit { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Check if this error carries the given HTTP status.
    pub fn is_http_status(&self, status: u16) -> bool {
        self.status() == Some(status)
    }
}

impl From<reqwest::Error> for McpError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
