//! Configuration resolution and path discovery.
//!
//! Resolution order: CLI argument → environment variables → XDG path → defaults.

use std::path::{Path, PathBuf};

/// Where the configuration file was found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via `--config`.
    CliArgument,

    /// Set via `TS_CONFIG` or `TS_CONFIG_DIR`.
    Environment,

    /// Found in the XDG config directory.
    XdgConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Environment variable names.
pub const ENV_CONFIG_PATH: &str = "TS_CONFIG";
pub const ENV_CONFIG_DIR: &str = "TS_CONFIG_DIR";

/// Standard config file name.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Application name for XDG directories.
const APP_NAME: &str = "tactile-search";

/// Resolve the configuration file path.
///
/// 1. Explicit CLI path (returned even if missing, so loading reports it)
/// 2. `TS_CONFIG` (likewise)
/// 3. `TS_CONFIG_DIR` + `config.toml`, if it exists
/// 4. `~/.config/tactile-search/config.toml`, if it exists
/// 5. Built-in defaults (None)
pub fn resolve_config_path(cli_path: Option<&Path>) -> (Option<PathBuf>, ConfigSource) {
    resolve_with(cli_path, |name| std::env::var(name).ok(), xdg_config_dir())
}

fn resolve_with(
    cli_path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
    xdg_dir: Option<PathBuf>,
) -> (Option<PathBuf>, ConfigSource) {
    // 1. CLI argument
    if let Some(path) = cli_path {
        return (Some(path.to_path_buf()), ConfigSource::CliArgument);
    }

    // 2. Explicit file from environment
    if let Some(path) = env(ENV_CONFIG_PATH).filter(|p| !p.is_empty()) {
        return (Some(PathBuf::from(path)), ConfigSource::Environment);
    }

    // 3. Config directory from environment
    if let Some(dir) = env(ENV_CONFIG_DIR).filter(|p| !p.is_empty()) {
        let path = PathBuf::from(dir).join(CONFIG_FILENAME);
        if path.exists() {
            return (Some(path), ConfigSource::Environment);
        }
    }

    // 4. XDG config directory
    if let Some(dir) = xdg_dir {
        let path = dir.join(CONFIG_FILENAME);
        if path.exists() {
            return (Some(path), ConfigSource::XdgConfig);
        }
    }

    // 5. Built-in default
    (None, ConfigSource::BuiltinDefault)
}

/// Get the XDG config directory for tactile-search.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}
