//! CLI command handlers.

pub mod connect_all;
pub mod servers;
pub mod session;

use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use serde_json::Value;

use strand_config::{LoadedConfig, ServerEntry, StrandConfig, load_config_with_options};
use strand_mcp::{McpClient, McpClientConfig};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged configuration.
    pub config: StrandConfig,
    /// User config directory, if one could be determined.
    pub config_dir: Option<PathBuf>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Load the layered config and build the context.
    pub fn load(config_dir: Option<PathBuf>, json_output: bool, verbose: bool) -> Result<Self> {
        let LoadedConfig {
            config,
            sources,
            warnings,
        } = load_config_with_options(None, config_dir.as_deref()).context("failed to load config")?;

        for warning in &warnings {
            tracing::warn!("{}", warning);
        }
        for source in sources.iter().filter(|s| s.loaded) {
            tracing::debug!(path = %source.path.display(), "loaded config layer");
        }

        Ok(Self {
            config,
            config_dir,
            json_output,
            verbose,
        })
    }

    /// Path of the user config file that `servers add/remove` edits.
    pub fn user_config_path(&self) -> Result<PathBuf> {
        match &self.config_dir {
            Some(dir) => Ok(dir.join("config.toml")),
            None => bail!("could not determine config directory; pass --config-dir"),
        }
    }

    /// Resolve a configured server name or a literal URL to a client config.
    pub fn client_config(&self, target: &str) -> Result<McpClientConfig> {
        let entry = if is_url(target) {
            ServerEntry::new(target, target)
        } else {
            self.config.require_server(target)?.clone()
        };
        Ok(entry.to_client_config(&self.config.client))
    }

    /// Create a client for `target` and run the handshake.
    ///
    /// Notifications received while the client is in use are echoed to stderr.
    pub async fn connect(&self, target: &str) -> Result<McpClient> {
        let config = self.client_config(target)?;
        let client = McpClient::connect_http(config)
            .with_context(|| format!("failed to create client for '{}'", target))?;

        client.on_message(|notification| {
            eprintln!("<- {} {}", notification.method, notification.params);
        });

        client
            .initialize(self.config.client.client_info())
            .await
            .with_context(|| format!("failed to initialize '{}'", target))?;
        Ok(client)
    }
}

/// Whether `target` is an HTTP(S) URL rather than a server name.
pub fn is_url(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://")
}

/// Parse an optional JSON argument.
pub fn parse_json_arg(raw: Option<&str>, flag: &str) -> Result<Option<Value>> {
    raw.map(|s| {
        serde_json::from_str(s).with_context(|| format!("{} must be valid JSON: {}", flag, s))
    })
    .transpose()
}

/// Print a JSON value, pretty-printed.
pub fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("http://localhost:3000/mcp"));
        assert!(is_url("https://mcp.example.com"));
        assert!(!is_url("files"));
        assert!(!is_url("ftp://example.com"));
    }

    #[test]
    fn test_parse_json_arg() {
        assert_eq!(parse_json_arg(None, "--args").unwrap(), None);
        assert_eq!(
            parse_json_arg(Some(r#"{"a": 1}"#), "--args").unwrap(),
            Some(serde_json::json!({"a": 1}))
        );
        let err = parse_json_arg(Some("{nope"), "--args").unwrap_err();
        assert!(err.to_string().contains("--args"));
    }

    #[test]
    fn test_client_config_resolution() {
        let mut config = StrandConfig::new();
        config.upsert_server(ServerEntry::new("files", "http://localhost:3000/mcp"));
        let ctx = Context {
            config,
            config_dir: None,
            json_output: false,
            verbose: false,
        };

        assert_eq!(
            ctx.client_config("files").unwrap().url,
            "http://localhost:3000/mcp"
        );
        assert_eq!(
            ctx.client_config("http://other/mcp").unwrap().name,
            "http://other/mcp"
        );
        assert!(ctx.client_config("missing").is_err());
        assert!(ctx.user_config_path().is_err());
    }
}
