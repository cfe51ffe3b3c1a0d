//! Concurrent creation and initialization of several clients.
//!
//! Every handshake runs to completion before the outcome is decided. If any
//! server fails, the whole call fails with [`McpError::ServerInit`] naming the
//! first failing server in name order, and the clients that did initialize are
//! closed.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;

use crate::client::{McpClient, McpClientConfig};
use crate::error::{McpError, Result};
use crate::protocol::ClientInfo;

/// Connected clients keyed by server name.
pub type ClientMap = BTreeMap<String, Arc<McpClient>>;

/// Create and initialize one HTTP client per named endpoint.
pub async fn create_clients<I, K, V>(endpoints: I, client_info: ClientInfo) -> Result<ClientMap>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let configs = endpoints
        .into_iter()
        .map(|(name, url)| McpClientConfig::new(name, url));
    create_clients_with(configs, client_info).await
}

/// Like [`create_clients`], with a full config per server.
pub async fn create_clients_with<I>(configs: I, client_info: ClientInfo) -> Result<ClientMap>
where
    I: IntoIterator<Item = McpClientConfig>,
{
    let mut clients = BTreeMap::new();
    let mut failures = BTreeMap::new();

    for config in configs {
        let name = config.name.clone();
        match McpClient::connect_http(config) {
            Ok(client) => {
                if clients.insert(name.clone(), Arc::new(client)).is_some() {
                    tracing::warn!(server = %name, "duplicate server name, keeping the last entry");
                }
            }
            Err(e) => {
                failures.insert(name, e);
            }
        }
    }

    if let Some((server, source)) = failures.into_iter().next() {
        tracing::error!(server = %server, error = %source, "failed to create MCP client");
        return Err(McpError::ServerInit {
            server,
            source: Box::new(source),
        });
    }

    initialize_all(clients, client_info).await
}

/// Run the handshake on every client concurrently.
///
/// Works with clients over any transport; [`create_clients_with`] is this plus
/// HTTP client construction.
pub async fn initialize_all(clients: ClientMap, client_info: ClientInfo) -> Result<ClientMap> {
    tracing::info!(servers = clients.len(), "initializing MCP servers");

    let handshakes = clients.into_iter().map(|(name, client)| {
        let client_info = client_info.clone();
        async move {
            let outcome = client.initialize(client_info).await;
            (name, client, outcome)
        }
    });

    // BTreeMap iteration order is preserved by join_all, so outcomes are in
    // name order.
    let outcomes = join_all(handshakes).await;

    let mut ready = BTreeMap::new();
    let mut first_failure = None;
    for (name, client, outcome) in outcomes {
        match outcome {
            Ok(_) => {
                ready.insert(name, client);
            }
            Err(e) => {
                tracing::error!(server = %name, error = %e, "MCP server failed to initialize");
                if let Err(close_err) = client.close().await {
                    tracing::debug!(server = %name, error = %close_err, "close after failed handshake");
                }
                if first_failure.is_none() {
                    first_failure = Some((name, e));
                }
            }
        }
    }

    let Some((server, source)) = first_failure else {
        tracing::info!(servers = ready.len(), "all MCP servers initialized");
        return Ok(ready);
    };

    for (name, client) in &ready {
        if let Err(e) = client.close().await {
            tracing::debug!(server = %name, error = %e, "close after fan-out failure");
        }
    }

    Err(McpError::ServerInit {
        server,
        source: Box::new(source),
    })
}
