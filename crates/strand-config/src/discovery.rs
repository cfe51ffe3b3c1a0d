//! Where strand looks for configuration, and how the files stack.
//!
//! Two layers are read, the second winning over the first:
//! the user file `config.toml` in [`config_dir`], then `strand.toml` in the
//! project directory. A missing layer is skipped. A broken one becomes a
//! warning so a bad project file never locks the user out.

use std::path::{Path, PathBuf};

use crate::{ConfigError, Result, StrandConfig};

const PROJECT_CONFIG_FILE: &str = "strand.toml";
const USER_CONFIG_FILE: &str = "config.toml";
const APP_NAME: &str = "strand";
const CONFIG_DIR_ENV: &str = "STRAND_CONFIG_DIR";

/// One file that discovery considered.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// False when the file was absent or could not be parsed.
    pub loaded: bool,
}

/// The merged config plus a record of how it was assembled.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: StrandConfig,
    /// Every layer considered, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of the layers that contributed.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter_map(|s| s.loaded.then_some(s.path.as_path()))
            .collect()
    }
}

/// Discover and merge config using the default user directory.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Discover and merge config.
///
/// `config_dir` replaces the user directory from [`config_dir`]; `project_dir`
/// defaults to the working directory.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let user_file = config_dir
        .map(|dir| dir.join(USER_CONFIG_FILE))
        .or_else(config_path);
    let project_file = project_dir
        .unwrap_or_else(|| Path::new("."))
        .join(PROJECT_CONFIG_FILE);

    let mut loader = Loader::default();
    if let Some(path) = user_file {
        loader.layer(path);
    }
    loader.layer(project_file);
    Ok(loader.finish())
}

/// Read and parse a single config file.
pub fn load_config_file(path: &Path) -> Result<StrandConfig> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    StrandConfig::from_toml(&text)
}

/// Write `config` to `path`, creating missing directories.
pub fn save_config(config: &StrandConfig, path: &Path) -> Result<()> {
    let write_err = |at: &Path, source| ConfigError::WriteFile {
        path: at.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;
    }
    std::fs::write(path, config.to_toml()?).map_err(|e| write_err(path, e))
}

/// `config.toml` inside [`config_dir`].
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// `$STRAND_CONFIG_DIR` when set and non-empty, else `<platform config dir>/strand`.
pub fn config_dir() -> Option<PathBuf> {
    match std::env::var(CONFIG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|d| d.join(APP_NAME)),
    }
}

#[derive(Default)]
struct Loader {
    config: StrandConfig,
    sources: Vec<ConfigSource>,
    warnings: Vec<String>,
}

impl Loader {
    fn layer(&mut self, path: PathBuf) {
        let loaded = path.is_file()
            && match load_config_file(&path) {
                Ok(layer) => {
                    self.config.merge(layer);
                    true
                }
                Err(e) => {
                    self.warnings
                        .push(format!("Failed to load {}: {}", path.display(), e));
                    false
                }
            };
        self.sources.push(ConfigSource { path, loaded });
    }

    fn finish(mut self) -> LoadedConfig {
        for server in &self.config.servers {
            if !(server.url.starts_with("http://") || server.url.starts_with("https://")) {
                self.warnings.push(format!(
                    "Server '{}' has a non-HTTP url '{}'; only http(s) endpoints are supported.",
                    server.name, server.url
                ));
            }
        }
        LoadedConfig {
            config: self.config,
            sources: self.sources,
            warnings: self.warnings,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
