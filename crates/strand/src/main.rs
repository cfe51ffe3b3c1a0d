//! strand - command-line client for MCP servers over HTTP.
//!
//! Main entry point for the strand CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{connect_all, servers, session};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// strand - talk to MCP servers over HTTP
#[derive(Parser)]
#[command(name = "strand")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Config directory (default: platform config dir / strand)
    #[arg(long, global = true, env = "STRAND_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List and manage configured servers
    Servers(servers::ServersArgs),

    /// Run the handshake and print the server's initialize result
    Init(session::TargetArgs),

    /// List tools offered by a server
    Tools(session::TargetArgs),

    /// Call a tool
    Call(session::CallArgs),

    /// List resources offered by a server
    Resources(session::TargetArgs),

    /// Read a resource by URI
    Read(session::ReadArgs),

    /// List prompts offered by a server
    Prompts(session::TargetArgs),

    /// Expand a prompt
    Prompt(session::PromptArgs),

    /// Send an arbitrary request and print its result
    Request(session::RawArgs),

    /// Send an arbitrary notification
    Notify(session::RawArgs),

    /// Connect every enabled server concurrently
    ConnectAll(connect_all::ConnectAllArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = cli.config_dir.clone().or_else(strand_config::config_dir);

    // Initialize tracing: console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "strand=debug,strand_mcp=debug,strand_config=debug,info"
    } else {
        "strand=info,strand_mcp=warn,strand_config=info,warn"
    };

    let log_dir = config_dir
        .as_ref()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "strand.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "strand=trace,strand_mcp=trace,strand_config=trace,info",
                )),
        )
        .init();

    let ctx = commands::Context::load(config_dir, cli.json, cli.verbose)?;

    // Dispatch to command handlers
    match cli.command {
        Commands::Servers(args) => servers::run(args, &ctx).await,
        Commands::Init(args) => session::run_init(args, &ctx).await,
        Commands::Tools(args) => session::run_tools(args, &ctx).await,
        Commands::Call(args) => session::run_call(args, &ctx).await,
        Commands::Resources(args) => session::run_resources(args, &ctx).await,
        Commands::Read(args) => session::run_read(args, &ctx).await,
        Commands::Prompts(args) => session::run_prompts(args, &ctx).await,
        Commands::Prompt(args) => session::run_prompt(args, &ctx).await,
        Commands::Request(args) => session::run_request(args, &ctx).await,
        Commands::Notify(args) => session::run_notify(args, &ctx).await,
        Commands::ConnectAll(args) => connect_all::run(args, &ctx).await,
    }
}
