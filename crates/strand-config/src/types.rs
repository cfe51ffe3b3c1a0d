//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [client]                 # identity and protocol defaults
//! name = "strand"
//! version = "0.1.0"
//! protocol_version = "2025-03-26"
//! request_timeout_secs = 30
//! session_conflict = "keep-first"
//!
//! [[servers]]              # named endpoints
//! name = "files"
//! url = "http://localhost:3000/mcp"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strand_mcp::protocol::DEFAULT_PROTOCOL_VERSION;
use strand_mcp::{ClientInfo, McpClientConfig, SessionConflictPolicy};

/// Default `clientInfo.name`.
pub const DEFAULT_CLIENT_NAME: &str = "strand";

/// Default request deadline in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default per-exchange HTTP timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g. project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrandConfig {
    /// Client identity and protocol defaults.
    pub client: ClientSection,
    /// Configured MCP servers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<ServerEntry>,
}

impl StrandConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// `[client]` fields override individually; servers are replaced by name.
    pub fn merge(&mut self, other: StrandConfig) {
        self.client.merge(other.client);
        for server in other.servers {
            self.upsert_server(server);
        }
    }

    /// Add a server, replacing any existing entry with the same name.
    pub fn upsert_server(&mut self, server: ServerEntry) {
        match self.servers.iter_mut().find(|s| s.name == server.name) {
            Some(existing) => *existing = server,
            None => self.servers.push(server),
        }
    }

    /// Remove a server by name. Returns true if it existed.
    pub fn remove_server(&mut self, name: &str) -> bool {
        let before = self.servers.len();
        self.servers.retain(|s| s.name != name);
        self.servers.len() != before
    }

    /// Look up a server by name.
    pub fn server(&self, name: &str) -> Option<&ServerEntry> {
        self.servers.iter().find(|s| s.name == name)
    }

    /// Look up a server by name, failing if it is not configured.
    pub fn require_server(&self, name: &str) -> crate::Result<&ServerEntry> {
        self.server(name)
            .ok_or_else(|| crate::ConfigError::ServerNotFound(name.to_string()))
    }

    /// Servers with `enabled = true`.
    pub fn enabled_servers(&self) -> impl Iterator<Item = &ServerEntry> {
        self.servers.iter().filter(|s| s.enabled)
    }

    /// Client configs for every enabled server.
    pub fn client_configs(&self) -> Vec<McpClientConfig> {
        self.enabled_servers()
            .map(|s| s.to_client_config(&self.client))
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client section
// ─────────────────────────────────────────────────────────────────────────────

/// How a second, different session id from the server is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionConflict {
    /// Keep the first session id (a warning is logged).
    #[default]
    KeepFirst,
    /// Adopt the newest session id.
    Overwrite,
    /// Fail the exchange that carried the different id.
    Reject,
}

impl From<SessionConflict> for SessionConflictPolicy {
    fn from(value: SessionConflict) -> Self {
        match value {
            SessionConflict::KeepFirst => Self::KeepFirst,
            SessionConflict::Overwrite => Self::Overwrite,
            SessionConflict::Reject => Self::Reject,
        }
    }
}

/// The `[client]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    /// `clientInfo.name` sent during the handshake.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `clientInfo.version` sent during the handshake.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Protocol version offered during the handshake.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
    /// Request deadline in seconds. 0 disables the deadline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    /// Session conflict policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_conflict: Option<SessionConflict>,
}

impl ClientSection {
    /// Identity sent in `initialize`.
    pub fn client_info(&self) -> ClientInfo {
        ClientInfo::new(
            self.name.as_deref().unwrap_or(DEFAULT_CLIENT_NAME),
            self.version
                .as_deref()
                .unwrap_or(env!("CARGO_PKG_VERSION")),
        )
    }

    /// Protocol version to offer.
    pub fn protocol_version(&self) -> &str {
        self.protocol_version
            .as_deref()
            .unwrap_or(DEFAULT_PROTOCOL_VERSION)
    }

    /// Request deadline, `None` when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Session conflict policy.
    pub fn session_conflict(&self) -> SessionConflict {
        self.session_conflict.unwrap_or_default()
    }

    fn merge(&mut self, other: ClientSection) {
        if other.name.is_some() {
            self.name = other.name;
        }
        if other.version.is_some() {
            self.version = other.version;
        }
        if other.protocol_version.is_some() {
            self.protocol_version = other.protocol_version;
        }
        if other.request_timeout_secs.is_some() {
            self.request_timeout_secs = other.request_timeout_secs;
        }
        if other.session_conflict.is_some() {
            self.session_conflict = other.session_conflict;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Servers
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for a single MCP server.
///
/// ```toml
/// [[servers]]
/// name = "files"
/// url = "http://localhost:3000/mcp"
/// headers = [["Authorization", "Bearer abc"]]
/// timeout_secs = 10
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntry {
    /// Unique name for this server.
    pub name: String,
    /// Endpoint URL.
    pub url: String,
    /// HTTP headers to set (as [key, value] pairs).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<[String; 2]>,
    /// Per-exchange HTTP timeout in seconds. Defaults to 30.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Protocol version override for this server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
    /// Whether this server is enabled. Defaults to true.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ServerEntry {
    /// Create a new server entry.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            headers: Vec::new(),
            timeout_secs: None,
            protocol_version: None,
            enabled: true,
        }
    }

    /// Add an HTTP header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push([key.into(), value.into()]);
        self
    }

    /// Set the HTTP timeout in seconds.
    pub fn with_timeout_secs(mut self, timeout: u64) -> Self {
        self.timeout_secs = Some(timeout);
        self
    }

    /// Override the protocol version for this server.
    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = Some(version.into());
        self
    }

    /// Set enabled state.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Headers in the tuple format expected by [`McpClientConfig`].
    pub fn header_tuples(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .map(|[k, v]| (k.clone(), v.clone()))
            .collect()
    }

    /// Build the client config for this server, filling gaps from `client`.
    pub fn to_client_config(&self, client: &ClientSection) -> McpClientConfig {
        let protocol_version = self
            .protocol_version
            .as_deref()
            .unwrap_or_else(|| client.protocol_version());

        let mut config = McpClientConfig::new(&self.name, &self.url)
            .with_protocol_version(protocol_version)
            .with_request_timeout(client.request_timeout())
            .with_session_conflict(client.session_conflict().into())
            .with_http_timeout(Duration::from_secs(
                self.timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ));
        for (key, value) in self.header_tuples() {
            config = config.with_header(key, value);
        }
        config
    }
}
