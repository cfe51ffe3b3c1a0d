//! MCP (Model Context Protocol) client over HTTP.
//!
//! Each MCP message is one HTTP POST. A response to a request can arrive on any
//! later exchange and in any order, so requests are matched to responses by
//! identifier rather than by the exchange that carried them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  McpClient                                                  │
//! │  - request / notify / initialize / tools / resources / ...  │
//! │  - Correlator: id allocation + pending table                │
//! │  - SessionTracker: Mcp-Session-Id capture and replay        │
//! │  - Handshake: Uninitialized → Initializing → Ready          │
//! │  - NotificationDispatcher: ordered observer callbacks       │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Transport (HttpTransport)                                  │
//! │  - one POST per message, raw status/headers/body back       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use strand_mcp::{ClientInfo, McpClient, McpClientConfig};
//! use serde_json::json;
//!
//! let client = McpClient::connect_http(
//!     McpClientConfig::new("files", "http://localhost:3000/mcp"),
//! )?;
//! client.on_message(|n| eprintln!("notification: {}", n.method));
//!
//! let info = client.initialize(ClientInfo::new("strand", "0.1.0")).await?;
//! println!("protocol {}", info["protocolVersion"]);
//!
//! for tool in client.list_tools().await? {
//!     println!("Tool: {} - {:?}", tool.name, tool.description);
//! }
//!
//! let result = client.tool("echo").call(json!({"message": "hi"})).await?;
//! println!("Result: {:?}", result.text());
//! client.close().await?;
//! ```
//!
//! # Exchange handling
//!
//! | Reply | Effect |
//! |-------|--------|
//! | 202 | acknowledged, no content |
//! | 200 + response | settles the pending request with that id |
//! | 200 + error with null id | the exchange fails with [`McpError::ServerError`] |
//! | 200 + notification | delivered to every `on_message` handler |
//! | other status | the exchange fails with [`McpError::Http`] |

pub mod client;
pub mod correlator;
pub mod dispatcher;
pub mod error;
pub mod fanout;
pub mod handshake;
pub mod manager;
pub mod protocol;
pub mod session;
pub mod transport;

// Re-export main types
pub use client::{McpClient, McpClientConfig, ToolHandle};
pub use correlator::{Correlator, PendingRequest, Resolution};
pub use dispatcher::{NotificationDispatcher, NotificationHandler};
pub use error::{McpError, Result};
pub use fanout::{ClientMap, create_clients, create_clients_with, initialize_all};
pub use handshake::HandshakeState;
pub use manager::McpManager;
pub use protocol::{
    CallToolParams, CallToolResult, ClientInfo, GetPromptResult, InitializeParams,
    InitializeResult, JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, Message, PromptInfo, ReadResourceResult, ResourceContents, ResourceInfo,
    ServerCapabilities, ServerInfo, ToolContent, ToolInfo,
};
pub use session::{SessionConflictPolicy, SessionTracker};
pub use transport::{HttpTransport, HttpTransportConfig, Transport, TransportResponse};
