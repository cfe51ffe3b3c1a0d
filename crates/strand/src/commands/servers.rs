//! Server configuration commands.
//!
//! - `strand servers` / `strand servers list` - List configured servers
//! - `strand servers add` - Add a server to the user config
//! - `strand servers remove` - Remove a server from the user config

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use serde_json::json;

use strand_config::{ServerEntry, StrandConfig, load_config_file, save_config};

use super::{Context, is_url, print_json};

/// Server configuration commands.
#[derive(Args, Debug)]
pub struct ServersArgs {
    #[command(subcommand)]
    pub command: Option<ServersCommand>,
}

#[derive(Subcommand, Debug)]
pub enum ServersCommand {
    /// List configured servers (default)
    List,

    /// Add a server to the user config
    Add(AddArgs),

    /// Remove a server from the user config
    Remove(RemoveArgs),
}

/// Arguments for `strand servers add`.
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Unique name for this server
    pub name: String,

    /// Endpoint URL (http or https)
    pub url: String,

    /// HTTP header in KEY=VALUE format
    #[arg(long = "header", short = 'H')]
    pub headers: Vec<String>,

    /// HTTP timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Protocol version to offer to this server
    #[arg(long)]
    pub protocol_version: Option<String>,

    /// Add the server disabled (skipped by connect-all)
    #[arg(long)]
    pub disabled: bool,
}

/// Arguments for `strand servers remove`.
#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Name of the server to remove
    pub name: String,
}

/// Run the servers command.
pub async fn run(args: ServersArgs, ctx: &Context) -> Result<()> {
    match args.command.unwrap_or(ServersCommand::List) {
        ServersCommand::List => run_list(ctx),
        ServersCommand::Add(add_args) => run_add(add_args, ctx),
        ServersCommand::Remove(remove_args) => run_remove(remove_args, ctx),
    }
}

/// Run `strand servers list`.
fn run_list(ctx: &Context) -> Result<()> {
    let servers = &ctx.config.servers;

    if ctx.json_output {
        let output: Vec<_> = servers
            .iter()
            .map(|s| {
                json!({
                    "name": s.name,
                    "url": s.url,
                    "enabled": s.enabled,
                })
            })
            .collect();
        return print_json(&output);
    }

    if servers.is_empty() {
        println!("No servers configured.");
        println!();
        println!("Add a server with:");
        println!("  strand servers add <name> <url>");
        return Ok(());
    }

    println!("{:<20} {:<10} {:<50}", "NAME", "STATUS", "URL");
    println!("{}", "-".repeat(80));
    for server in servers {
        let status = if server.enabled { "enabled" } else { "disabled" };
        println!(
            "{:<20} {:<10} {:<50}",
            truncate(&server.name, 20),
            status,
            truncate(&server.url, 50)
        );

        if ctx.verbose {
            for [key, value] in &server.headers {
                println!("  Header: {}: {}", key, value);
            }
            if let Some(timeout) = server.timeout_secs {
                println!("  Timeout: {}s", timeout);
            }
            if let Some(version) = &server.protocol_version {
                println!("  Protocol: {}", version);
            }
        }
    }

    Ok(())
}

/// Run `strand servers add`.
fn run_add(args: AddArgs, ctx: &Context) -> Result<()> {
    if !is_url(&args.url) {
        bail!("'{}' is not an http(s) URL", args.url);
    }

    let path = ctx.user_config_path()?;
    let mut config = if path.is_file() {
        load_config_file(&path)?
    } else {
        StrandConfig::new()
    };

    if config.server(&args.name).is_some() {
        bail!(
            "Server '{}' already exists. Use 'strand servers remove {}' first.",
            args.name,
            args.name
        );
    }

    let mut entry = ServerEntry::new(&args.name, &args.url).with_enabled(!args.disabled);
    for header in &args.headers {
        let Some((key, value)) = header.split_once('=') else {
            bail!("Invalid header format: '{}'. Use KEY=VALUE.", header);
        };
        entry = entry.with_header(key, value);
    }
    if let Some(timeout) = args.timeout {
        entry = entry.with_timeout_secs(timeout);
    }
    if let Some(version) = args.protocol_version {
        entry = entry.with_protocol_version(version);
    }

    config.upsert_server(entry);
    save_config(&config, &path)?;
    tracing::info!(server = %args.name, path = %path.display(), "added server");

    if ctx.json_output {
        print_json(&json!({
            "status": "added",
            "name": args.name,
            "config_path": path.display().to_string(),
        }))
    } else {
        println!("Added server '{}' to {}", args.name, path.display());
        Ok(())
    }
}

/// Run `strand servers remove`.
fn run_remove(args: RemoveArgs, ctx: &Context) -> Result<()> {
    let path = ctx.user_config_path()?;
    if !path.is_file() {
        bail!("Server '{}' not found in {}", args.name, path.display());
    }

    let mut config = load_config_file(&path)?;
    if !config.remove_server(&args.name) {
        bail!("Server '{}' not found in {}", args.name, path.display());
    }
    save_config(&config, &path)?;

    if ctx.json_output {
        print_json(&json!({"status": "removed", "name": args.name}))
    } else {
        println!("Removed server '{}'", args.name);
        Ok(())
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
