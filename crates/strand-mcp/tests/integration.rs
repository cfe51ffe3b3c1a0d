//! Integration tests for the MCP client.
//!
//! These tests run the full protocol flow against an in-process mock MCP
//! server over real HTTP.

mod common;

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use strand_mcp::{
    ClientInfo, HandshakeState, McpClient, McpClientConfig, McpError, McpManager, create_clients,
};

use common::{MockMcpServer, MockOptions, unreachable_url};

fn client_for(server: &MockMcpServer) -> McpClient {
    McpClient::connect_http(McpClientConfig::new("test", server.url())).expect("Failed to create client")
}

#[tokio::test]
async fn test_connect_and_initialize() -> anyhow::Result<()> {
    let server = MockMcpServer::start().await?;
    let client = client_for(&server);

    let result = client.initialize(ClientInfo::new("strand-tests", "0.1.0")).await?;
    assert_eq!(result["serverInfo"]["name"], "mock-mcp-server");
    assert_eq!(result["serverInfo"]["version"], "1.0.0");
    assert!(client.is_initialized());
    assert_eq!(client.handshake_state(), HandshakeState::Ready);

    assert_eq!(server.methods(), vec!["initialize", "notifications/initialized"]);
    let requests = server.requests();
    assert_eq!(requests[0].body["id"], 1);
    assert_eq!(requests[0].body["params"]["protocolVersion"], "2025-03-26");
    assert_eq!(requests[0].body["params"]["clientInfo"]["name"], "strand-tests");
    assert!(requests[1].body.get("id").is_none());
    Ok(())
}

#[tokio::test]
async fn test_outbound_headers() -> anyhow::Result<()> {
    let server = MockMcpServer::start().await?;
    let client = client_for(&server);
    client.initialize(ClientInfo::default()).await?;
    client.list_tools().await?;

    for request in server.requests() {
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(
            request.header("accept"),
            Some("application/json, text/event-stream")
        );
        assert_eq!(request.header("mcp-protocol-version"), Some("2025-03-26"));
        assert_eq!(request.header("mcp-session-id"), None);
    }
    Ok(())
}

#[tokio::test]
async fn test_session_id_replayed_after_first_observation() -> anyhow::Result<()> {
    let server = MockMcpServer::start_with(MockOptions {
        session_id: Some("sess-42".to_string()),
        ..Default::default()
    })
    .await?;
    let client = client_for(&server);

    client.initialize(ClientInfo::default()).await?;
    client.list_tools().await?;
    assert_eq!(client.session_id().as_deref(), Some("sess-42"));

    let requests = server.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].header("mcp-session-id"), None);
    assert_eq!(requests[1].header("mcp-session-id"), Some("sess-42"));
    assert_eq!(requests[2].header("mcp-session-id"), Some("sess-42"));
    Ok(())
}

#[tokio::test]
async fn test_negotiated_protocol_version_is_used() -> anyhow::Result<()> {
    let server = MockMcpServer::start_with(MockOptions {
        protocol_version: Some("2024-11-05".to_string()),
        ..Default::default()
    })
    .await?;
    let client = client_for(&server);

    client.initialize(ClientInfo::default()).await?;
    assert_eq!(client.protocol_version(), "2024-11-05");

    let requests = server.requests();
    assert_eq!(requests[0].header("mcp-protocol-version"), Some("2025-03-26"));
    assert_eq!(requests[1].header("mcp-protocol-version"), Some("2024-11-05"));
    Ok(())
}

#[tokio::test]
async fn test_list_and_call_tools() -> anyhow::Result<()> {
    let server = MockMcpServer::start().await?;
    let client = client_for(&server);
    client.initialize(ClientInfo::default()).await?;

    let tools = client.list_tools().await?;
    assert_eq!(tools.len(), 2);
    let echo = tools.iter().find(|t| t.name == "echo").expect("echo tool not found");
    assert_eq!(echo.description.as_deref(), Some("Echo back the input"));
    assert!(echo.input_schema.is_some());

    let result = client
        .call_tool("echo", Some(json!({"message": "Hello, MCP!"})))
        .await?;
    assert!(!result.is_error());
    assert_eq!(result.text().as_deref(), Some("Hello, MCP!"));

    let result = client.tool("add").call(json!({"a": 5, "b": 3})).await?;
    assert_eq!(result.text().as_deref(), Some("8"));

    let result = client.tool("missing").call(json!({})).await?;
    assert!(result.is_error());
    Ok(())
}

#[tokio::test]
async fn test_resources_and_prompts() -> anyhow::Result<()> {
    let server = MockMcpServer::start().await?;
    let client = client_for(&server);
    client.initialize(ClientInfo::default()).await?;

    let resources = client.list_resources().await?;
    assert_eq!(resources[0].uri, "file:///greeting.txt");
    assert_eq!(resources[0].mime_type.as_deref(), Some("text/plain"));

    let read = client.read_resource("file:///greeting.txt").await?;
    assert_eq!(read.contents[0].text.as_deref(), Some("hello from the mock server"));

    let prompts = client.list_prompts().await?;
    assert_eq!(prompts[0].name, "greet");
    assert_eq!(prompts[0].arguments[0].name, "name");

    let prompt = client.get_prompt("greet", Some(json!({"name": "Ada"}))).await?;
    assert_eq!(prompt.messages[0].content["text"], "Say hello to Ada");
    Ok(())
}

#[tokio::test]
async fn test_unknown_method_is_server_error() -> anyhow::Result<()> {
    let server = MockMcpServer::start().await?;
    let client = client_for(&server);
    client.initialize(ClientInfo::default()).await?;

    let err = client.request("does/not/exist", None).await.unwrap_err();
    assert_eq!(err.code(), Some(-32601));
    assert!(err.to_string().contains("Method not found"));
    assert_eq!(client.pending_requests(), 0);
    Ok(())
}

#[tokio::test]
async fn test_http_error_status() -> anyhow::Result<()> {
    let server = MockMcpServer::start().await?;
    server.force_status(404, "no such endpoint");
    let client = client_for(&server);

    let err = client.initialize(ClientInfo::default()).await.unwrap_err();
    assert!(err.is_http_status(404));
    assert!(err.to_string().contains("404"));
    assert!(err.to_string().contains("no such endpoint"));
    assert_eq!(client.handshake_state(), HandshakeState::Initializing);
    assert_eq!(client.pending_requests(), 0);
    Ok(())
}

#[tokio::test]
async fn test_notification_routed_to_handlers() -> anyhow::Result<()> {
    let server = MockMcpServer::start().await?;
    let client = client_for(&server);

    let seen = Arc::new(Mutex::new(Vec::new()));
    for tag in ["a", "b"] {
        let seen = seen.clone();
        client.on_message(move |n| seen.lock().push(format!("{}:{}", tag, n.method)));
    }

    client.initialize(ClientInfo::default()).await?;
    server.queue_notification("notifications/tools/list_changed", json!({}));
    client.notify("notifications/roots/list_changed", None).await?;

    assert_eq!(
        *seen.lock(),
        vec![
            "a:notifications/tools/list_changed",
            "b:notifications/tools/list_changed"
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_unreachable_server() -> anyhow::Result<()> {
    let client = McpClient::connect_http(McpClientConfig::new("gone", unreachable_url().await?))?;
    let err = client.initialize(ClientInfo::default()).await.unwrap_err();
    assert!(matches!(err, McpError::Transport(_)));
    assert_eq!(client.pending_requests(), 0);
    Ok(())
}

#[tokio::test]
async fn test_close_stops_traffic() -> anyhow::Result<()> {
    let server = MockMcpServer::start_with(MockOptions {
        session_id: Some("sess-1".to_string()),
        ..Default::default()
    })
    .await?;
    let client = client_for(&server);
    client.initialize(ClientInfo::default()).await?;

    client.close().await?;
    assert!(client.is_closed());
    assert!(client.session_id().is_none());

    let err = client.list_tools().await.unwrap_err();
    assert!(matches!(err, McpError::ConnectionClosed));
    assert_eq!(server.requests().len(), 2);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Fan-out
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_clients_initializes_every_server() -> anyhow::Result<()> {
    let alpha = MockMcpServer::start().await?;
    let beta = MockMcpServer::start().await?;

    let clients = create_clients(
        [("alpha", alpha.url()), ("beta", beta.url())],
        ClientInfo::new("fanout", "1.0.0"),
    )
    .await?;

    assert_eq!(clients.keys().collect::<Vec<_>>(), vec!["alpha", "beta"]);
    assert!(clients.values().all(|c| c.is_initialized()));
    assert_eq!(alpha.methods(), vec!["initialize", "notifications/initialized"]);
    assert_eq!(beta.methods(), vec!["initialize", "notifications/initialized"]);

    let tools = clients["beta"].list_tools().await?;
    assert_eq!(tools.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_create_clients_names_first_failing_server() -> anyhow::Result<()> {
    let good = MockMcpServer::start().await?;
    let bad = MockMcpServer::start().await?;
    bad.force_status(503, "unavailable");
    let worse = MockMcpServer::start().await?;
    worse.force_status(500, "broken");

    let err = create_clients(
        [("a-good", good.url()), ("b-bad", bad.url()), ("c-worse", worse.url())],
        ClientInfo::default(),
    )
    .await
    .unwrap_err();

    match &err {
        McpError::ServerInit { server, source } => {
            assert_eq!(server, "b-bad");
            assert!(source.is_http_status(503));
        }
        other => panic!("unexpected error: {other}"),
    }
    // Every handshake was attempted before the outcome was decided.
    assert_eq!(worse.methods(), vec!["initialize"]);
    assert_eq!(good.methods(), vec!["initialize", "notifications/initialized"]);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Manager
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_manager_connects_leniently() -> anyhow::Result<()> {
    let server = MockMcpServer::start().await?;

    let mut manager = McpManager::new(ClientInfo::default());
    manager.add_server(McpClientConfig::new("live", server.url()));
    manager.add_server(McpClientConfig::new("dead", unreachable_url().await?));

    assert_eq!(manager.connect_all().await, 1);
    assert!(manager.is_connected("live"));
    assert!(!manager.is_connected("dead"));

    // Already-connected servers are skipped.
    assert_eq!(manager.connect_all().await, 0);

    let flat = manager.all_tools_flat().await;
    assert_eq!(flat.len(), 2);
    assert!(flat.iter().all(|(server, _)| server == "live"));

    let client = manager.connect_server_by_name("live").await?;
    assert!(client.is_initialized());

    manager.shutdown_all().await;
    assert_eq!(manager.connected_count(), 0);
    assert!(client.is_closed());
    assert!(manager.has_server("live"));
    Ok(())
}
