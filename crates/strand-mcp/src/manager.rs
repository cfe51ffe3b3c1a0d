//! MCP Manager for multi-server lifecycle management.
//!
//! The [`McpManager`] keeps a set of named server configurations and the
//! clients connected to them. Unlike [`create_clients`](crate::fanout::create_clients),
//! it is lenient: a server that fails to connect is logged and skipped.
//!
//! # Example
//!
//! ```rust,ignore
//! use strand_mcp::{ClientInfo, McpClientConfig, McpManager};
//!
//! let mut manager = McpManager::new(ClientInfo::new("strand", "0.1.0"));
//! manager.add_server(McpClientConfig::new("files", "http://localhost:3000/mcp"));
//! manager.add_server(McpClientConfig::new("search", "http://localhost:3001/mcp"));
//!
//! let connected = manager.connect_all().await;
//! let tools = manager.all_tools_flat().await;
//! println!("{} servers, {} tools", connected, tools.len());
//!
//! manager.shutdown_all().await;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;

use crate::client::{McpClient, McpClientConfig};
use crate::error::{McpError, Result};
use crate::protocol::{ClientInfo, ToolInfo};

/// Manager for multiple MCP server connections.
pub struct McpManager {
    client_info: ClientInfo,
    /// Server configurations (before connection).
    configs: BTreeMap<String, McpClientConfig>,
    /// Connected and initialized clients.
    clients: BTreeMap<String, Arc<McpClient>>,
}

impl Default for McpManager {
    fn default() -> Self {
        Self::new(ClientInfo::default())
    }
}

impl McpManager {
    /// Create an empty manager that identifies itself with `client_info`.
    pub fn new(client_info: ClientInfo) -> Self {
        Self {
            client_info,
            configs: BTreeMap::new(),
            clients: BTreeMap::new(),
        }
    }

    /// Create a manager with the given server configurations.
    pub fn with_configs(client_info: ClientInfo, configs: Vec<McpClientConfig>) -> Self {
        let mut manager = Self::new(client_info);
        for config in configs {
            manager.configs.insert(config.name.clone(), config);
        }
        manager
    }

    /// Add a server configuration, replacing any with the same name.
    ///
    /// The server is not contacted until [`connect_all`](Self::connect_all)
    /// or [`connect_server_by_name`](Self::connect_server_by_name).
    pub fn add_server(&mut self, config: McpClientConfig) {
        tracing::debug!(server = %config.name, url = %config.url, "adding MCP server configuration");
        self.configs.insert(config.name.clone(), config);
    }

    /// Remove a server, closing its client if connected.
    ///
    /// Returns true if the server was configured.
    pub async fn remove_server(&mut self, name: &str) -> bool {
        self.shutdown_server(name).await;

        if self.configs.remove(name).is_some() {
            tracing::debug!(server = %name, "removed MCP server configuration");
            true
        } else {
            false
        }
    }

    /// Names of all configured servers, sorted.
    pub fn server_names(&self) -> Vec<&str> {
        self.configs.keys().map(|s| s.as_str()).collect()
    }

    /// Names of all connected servers, sorted.
    pub fn connected_server_names(&self) -> Vec<&str> {
        self.clients.keys().map(|s| s.as_str()).collect()
    }

    /// Check if a server is configured.
    pub fn has_server(&self, name: &str) -> bool {
        self.configs.contains_key(name)
    }

    /// Check if a server is connected.
    pub fn is_connected(&self, name: &str) -> bool {
        self.clients.contains_key(name)
    }

    /// Get a connected client by name.
    pub fn get_client(&self, name: &str) -> Option<Arc<McpClient>> {
        self.clients.get(name).cloned()
    }

    /// Connect every configured server that is not yet connected.
    ///
    /// Handshakes run concurrently. Servers that fail are logged and skipped.
    /// Returns the number of newly connected servers.
    pub async fn connect_all(&mut self) -> usize {
        let pending: Vec<McpClientConfig> = self
            .configs
            .values()
            .filter(|config| !self.clients.contains_key(&config.name))
            .cloned()
            .collect();

        let client_info = &self.client_info;
        let attempts = pending.into_iter().map(|config| {
            let client_info = client_info.clone();
            async move {
                let name = config.name.clone();
                (name, connect_server(config, client_info).await)
            }
        });

        let outcomes = join_all(attempts).await;

        let mut connected = 0;
        for (name, outcome) in outcomes {
            match outcome {
                Ok(client) => {
                    tracing::info!(server = %name, "MCP server connected");
                    self.clients.insert(name, Arc::new(client));
                    connected += 1;
                }
                Err(e) => {
                    tracing::error!(server = %name, error = %e, "failed to connect to MCP server");
                }
            }
        }

        tracing::info!(
            connected,
            total = self.configs.len(),
            "MCP server connection complete"
        );

        connected
    }

    /// Connect a single server by name.
    ///
    /// If the server is already connected, returns Ok without reconnecting.
    pub async fn connect_server_by_name(&mut self, name: &str) -> Result<Arc<McpClient>> {
        if let Some(client) = self.clients.get(name) {
            return Ok(client.clone());
        }

        let config = self
            .configs
            .get(name)
            .ok_or_else(|| McpError::UnknownServer(name.to_string()))?
            .clone();

        let client = Arc::new(connect_server(config, self.client_info.clone()).await?);
        self.clients.insert(name.to_string(), client.clone());
        tracing::info!(server = %name, "MCP server connected");
        Ok(client)
    }

    /// Insert an already-initialized client.
    pub fn insert_client(&mut self, client: Arc<McpClient>) {
        self.clients.insert(client.name().to_string(), client);
    }

    /// List tools from every connected server.
    ///
    /// Servers whose listing fails are logged and omitted.
    pub async fn list_all_tools(&self) -> BTreeMap<String, Vec<ToolInfo>> {
        let listings = self.clients.iter().map(|(name, client)| async move {
            (name.clone(), client.list_tools().await)
        });

        let mut all_tools = BTreeMap::new();
        for (name, outcome) in join_all(listings).await {
            match outcome {
                Ok(tools) => {
                    tracing::debug!(server = %name, tool_count = tools.len(), "listed tools");
                    all_tools.insert(name, tools);
                }
                Err(e) => {
                    tracing::error!(server = %name, error = %e, "failed to list tools");
                }
            }
        }
        all_tools
    }

    /// Flat list of `(server_name, tool)` pairs across all servers.
    pub async fn all_tools_flat(&self) -> Vec<(String, ToolInfo)> {
        self.list_all_tools()
            .await
            .into_iter()
            .flat_map(|(server, tools)| tools.into_iter().map(move |tool| (server.clone(), tool)))
            .collect()
    }

    /// Close one connected server. Its configuration is kept.
    ///
    /// Returns true if the server was connected.
    pub async fn shutdown_server(&mut self, name: &str) -> bool {
        let Some(client) = self.clients.remove(name) else {
            return false;
        };
        tracing::info!(server = %name, "shutting down MCP server");
        if let Err(e) = client.close().await {
            tracing::warn!(server = %name, error = %e, "error closing MCP client");
        }
        true
    }

    /// Close every connected server. Configurations are kept for reconnection.
    pub async fn shutdown_all(&mut self) {
        tracing::info!(server_count = self.clients.len(), "shutting down all MCP servers");
        let clients = std::mem::take(&mut self.clients);
        for (name, client) in clients {
            if let Err(e) = client.close().await {
                tracing::warn!(server = %name, error = %e, "error closing MCP client");
            }
        }
    }

    /// Number of configured servers.
    pub fn config_count(&self) -> usize {
        self.configs.len()
    }

    /// Number of connected servers.
    pub fn connected_count(&self) -> usize {
        self.clients.len()
    }
}

async fn connect_server(config: McpClientConfig, client_info: ClientInfo) -> Result<McpClient> {
    let client = McpClient::connect_http(config)?;
    client.initialize(client_info).await?;
    Ok(client)
}

impl std::fmt::Debug for McpManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpManager")
            .field("configured", &self.configs.keys().collect::<Vec<_>>())
            .field("connected", &self.clients.keys().collect::<Vec<_>>())
            .finish()
    }
}
