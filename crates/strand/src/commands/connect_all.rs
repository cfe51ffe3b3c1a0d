//! `strand connect-all`: initialize every enabled server concurrently.

use anyhow::{Context as _, Result};
use clap::Args;
use serde_json::json;

use strand_mcp::{McpManager, create_clients_with};

use super::{Context, print_json};

/// Arguments for `strand connect-all`.
#[derive(Args, Debug)]
pub struct ConnectAllArgs {
    /// Fail if any server fails to initialize (default: skip failures)
    #[arg(long)]
    pub strict: bool,

    /// List each server's tools after connecting
    #[arg(long)]
    pub tools: bool,
}

/// Run `strand connect-all`.
pub async fn run(args: ConnectAllArgs, ctx: &Context) -> Result<()> {
    let configs = ctx.config.client_configs();
    if configs.is_empty() {
        if ctx.json_output {
            return print_json(&json!([]));
        }
        println!("No enabled servers configured.");
        return Ok(());
    }

    let client_info = ctx.config.client.client_info();
    let mut manager = McpManager::new(client_info.clone());

    if args.strict {
        let clients = create_clients_with(configs, client_info)
            .await
            .context("connect-all failed")?;
        for client in clients.into_values() {
            manager.insert_client(client);
        }
    } else {
        for config in configs {
            manager.add_server(config);
        }
        manager.connect_all().await;
    }

    let tools = if args.tools {
        Some(manager.list_all_tools().await)
    } else {
        None
    };

    let configured: Vec<String> = ctx.config.enabled_servers().map(|s| s.name.clone()).collect();

    if ctx.json_output {
        let output: Vec<_> = configured
            .iter()
            .map(|name| {
                let mut entry = json!({
                    "name": name,
                    "connected": manager.is_connected(name),
                });
                if let Some(client) = manager.get_client(name) {
                    entry["session_id"] = json!(client.session_id());
                    entry["protocol_version"] = json!(client.protocol_version());
                }
                if let Some(tools) = tools.as_ref().and_then(|t| t.get(name)) {
                    entry["tools"] = json!(tools.iter().map(|t| &t.name).collect::<Vec<_>>());
                }
                entry
            })
            .collect();
        print_json(&output)?;
    } else {
        println!("{:<20} {:<12} {:<12}", "NAME", "STATUS", "PROTOCOL");
        println!("{}", "-".repeat(44));
        for name in &configured {
            match manager.get_client(name) {
                Some(client) => {
                    println!("{:<20} {:<12} {:<12}", name, "connected", client.protocol_version())
                }
                None => println!("{:<20} {:<12}", name, "failed"),
            }
            if let Some(tools) = tools.as_ref().and_then(|t| t.get(name)) {
                for tool in tools {
                    println!("  - {}", tool.name);
                }
            }
        }
        println!();
        println!(
            "{} of {} servers connected",
            manager.connected_count(),
            configured.len()
        );
    }

    manager.shutdown_all().await;
    Ok(())
}
