//! Commands that talk to a single server.
//!
//! Each command connects to `<target>` (a configured server name or an
//! http(s) URL), runs the handshake, performs one operation and closes the
//! client.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Args;
use serde_json::json;

use strand_mcp::{CallToolResult, McpClient, ToolContent};

use super::{Context, parse_json_arg, print_json};

/// A server name or URL.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Configured server name or http(s) URL
    pub target: String,
}

/// Arguments for `strand call`.
#[derive(Args, Debug)]
pub struct CallArgs {
    /// Configured server name or http(s) URL
    pub target: String,

    /// Tool name
    pub tool: String,

    /// Tool arguments as a JSON object
    #[arg(long)]
    pub args: Option<String>,
}

/// Arguments for `strand read`.
#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Configured server name or http(s) URL
    pub target: String,

    /// Resource URI
    pub uri: String,
}

/// Arguments for `strand prompt`.
#[derive(Args, Debug)]
pub struct PromptArgs {
    /// Configured server name or http(s) URL
    pub target: String,

    /// Prompt name
    pub name: String,

    /// Prompt arguments as a JSON object
    #[arg(long)]
    pub args: Option<String>,
}

/// Arguments for `strand request` and `strand notify`.
#[derive(Args, Debug)]
pub struct RawArgs {
    /// Configured server name or http(s) URL
    pub target: String,

    /// JSON-RPC method
    pub method: String,

    /// Params as JSON
    #[arg(long)]
    pub params: Option<String>,
}

/// Connect, run `op`, and close the client whatever the outcome.
async fn with_client<T, F, Fut>(ctx: &Context, target: &str, op: F) -> Result<T>
where
    F: FnOnce(Arc<McpClient>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let client = Arc::new(ctx.connect(target).await?);
    let outcome = op(client.clone()).await;
    if let Err(e) = client.close().await {
        tracing::debug!(server = %client.name(), error = %e, "error closing client");
    }
    outcome
}

/// Run `strand init`.
pub async fn run_init(args: TargetArgs, ctx: &Context) -> Result<()> {
    let client = ctx.connect(&args.target).await?;
    let info = client.server_info();

    if ctx.json_output {
        print_json(&json!({
            "server": client.name(),
            "session_id": client.session_id(),
            "protocol_version": client.protocol_version(),
            "initialize": info,
        }))?;
    } else {
        match info {
            Some(info) => {
                println!("Server:   {} v{}", info.server_info.name, info.server_info.version);
                if let Some(instructions) = info.instructions {
                    println!("Info:     {}", instructions);
                }
            }
            None => println!("Server:   (non-standard initialize result)"),
        }
        println!("Protocol: {}", client.protocol_version());
        println!(
            "Session:  {}",
            client.session_id().unwrap_or_else(|| "(none)".to_string())
        );
    }

    client.close().await?;
    Ok(())
}

/// Run `strand tools`.
pub async fn run_tools(args: TargetArgs, ctx: &Context) -> Result<()> {
    let tools = with_client(ctx, &args.target, |client| async move {
        client.list_tools().await.context("tools/list failed")
    })
    .await?;

    if ctx.json_output {
        return print_json(&tools);
    }
    if tools.is_empty() {
        println!("No tools.");
    }
    for tool in &tools {
        match &tool.description {
            Some(description) => println!("{:<24} {}", tool.name, description),
            None => println!("{}", tool.name),
        }
        if ctx.verbose
            && let Some(schema) = &tool.input_schema
        {
            println!("  {}", schema);
        }
    }
    Ok(())
}

/// Run `strand call`.
pub async fn run_call(args: CallArgs, ctx: &Context) -> Result<()> {
    let arguments = parse_json_arg(args.args.as_deref(), "--args")?.unwrap_or_else(|| json!({}));
    let result = with_client(ctx, &args.target, |client| async move {
        client
            .tool(&args.tool)
            .call(arguments)
            .await
            .with_context(|| format!("tool '{}' failed", args.tool))
    })
    .await?;

    if ctx.json_output {
        print_json(&result)?;
    } else {
        print_tool_result(&result);
    }

    if result.is_error() {
        anyhow::bail!("tool reported an error");
    }
    Ok(())
}

/// Run `strand resources`.
pub async fn run_resources(args: TargetArgs, ctx: &Context) -> Result<()> {
    let resources = with_client(ctx, &args.target, |client| async move {
        client.list_resources().await.context("resources/list failed")
    })
    .await?;

    if ctx.json_output {
        return print_json(&resources);
    }
    if resources.is_empty() {
        println!("No resources.");
    }
    for resource in &resources {
        println!(
            "{:<40} {:<20} {}",
            resource.uri,
            resource.name,
            resource.mime_type.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

/// Run `strand read`.
pub async fn run_read(args: ReadArgs, ctx: &Context) -> Result<()> {
    let result = with_client(ctx, &args.target, |client| async move {
        client
            .read_resource(&args.uri)
            .await
            .with_context(|| format!("failed to read '{}'", args.uri))
    })
    .await?;

    if ctx.json_output {
        return print_json(&result);
    }
    for contents in &result.contents {
        match (&contents.text, &contents.blob) {
            (Some(text), _) => println!("{}", text),
            (None, Some(blob)) => println!("[binary {} bytes base64]", blob.len()),
            (None, None) => println!("[empty: {}]", contents.uri),
        }
    }
    Ok(())
}

/// Run `strand prompts`.
pub async fn run_prompts(args: TargetArgs, ctx: &Context) -> Result<()> {
    let prompts = with_client(ctx, &args.target, |client| async move {
        client.list_prompts().await.context("prompts/list failed")
    })
    .await?;

    if ctx.json_output {
        return print_json(&prompts);
    }
    if prompts.is_empty() {
        println!("No prompts.");
    }
    for prompt in &prompts {
        let arguments: Vec<String> = prompt
            .arguments
            .iter()
            .map(|a| {
                if a.required.unwrap_or(false) {
                    a.name.clone()
                } else {
                    format!("[{}]", a.name)
                }
            })
            .collect();
        println!(
            "{:<24} {:<30} {}",
            prompt.name,
            arguments.join(" "),
            prompt.description.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

/// Run `strand prompt`.
pub async fn run_prompt(args: PromptArgs, ctx: &Context) -> Result<()> {
    let arguments = parse_json_arg(args.args.as_deref(), "--args")?;
    let result = with_client(ctx, &args.target, |client| async move {
        client
            .get_prompt(&args.name, arguments)
            .await
            .with_context(|| format!("prompt '{}' failed", args.name))
    })
    .await?;

    if ctx.json_output {
        return print_json(&result);
    }
    if let Some(description) = &result.description {
        println!("# {}", description);
    }
    for message in &result.messages {
        let text = message
            .content
            .get("text")
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| message.content.to_string());
        println!("[{}] {}", message.role, text);
    }
    Ok(())
}

/// Run `strand request`.
pub async fn run_request(args: RawArgs, ctx: &Context) -> Result<()> {
    let params = parse_json_arg(args.params.as_deref(), "--params")?;
    let result = with_client(ctx, &args.target, |client| async move {
        client
            .request(&args.method, params)
            .await
            .with_context(|| format!("request '{}' failed", args.method))
    })
    .await?;
    print_json(&result)
}

/// Run `strand notify`.
pub async fn run_notify(args: RawArgs, ctx: &Context) -> Result<()> {
    let params = parse_json_arg(args.params.as_deref(), "--params")?;
    let method = args.method.clone();
    with_client(ctx, &args.target, |client| async move {
        client
            .notify(&args.method, params)
            .await
            .with_context(|| format!("notification '{}' failed", args.method))
    })
    .await?;

    if ctx.json_output {
        print_json(&json!({"status": "sent", "method": method}))
    } else {
        println!("Sent {}", method);
        Ok(())
    }
}

/// Print tool output content for humans.
fn print_tool_result(result: &CallToolResult) {
    for item in &result.content {
        match item {
            ToolContent::Text { text } => println!("{}", text),
            ToolContent::Image { mime_type, .. } => println!("[image: {}]", mime_type),
            ToolContent::Resource { resource } => println!("[resource: {}]", resource.uri),
            ToolContent::Unknown => println!("[unsupported content]"),
        }
    }
}
