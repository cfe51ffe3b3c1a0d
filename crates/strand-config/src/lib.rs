//! Configuration system for the strand MCP client.
//!
//! Provides TOML-based configuration with:
//! - Client identity and protocol defaults (`[client]`)
//! - Named MCP server endpoints (`[[servers]]`)
//! - Config file layering (user config dir + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, config_dir, config_path, load_config, load_config_file,
    load_config_with_options, save_config,
};
pub use error::{ConfigError, Result};
pub use types::*;
