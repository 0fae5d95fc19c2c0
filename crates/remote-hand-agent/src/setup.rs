//! Config file discovery and loading.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::AgentError;

/// Load configuration from the given path, or the default location.
///
/// A missing file means defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, AgentError> {
    let config_path = path.map_or_else(default_config_path, Path::to_path_buf);

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| AgentError::Config(format!("failed to read config: {e}")))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| AgentError::Config(format!("failed to parse config: {e}")))?;
        Ok(config)
    } else {
        Ok(Config::default())
    }
}

/// Get the default config directory path.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("remote-hand")
}

/// Get the default config file path.
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}
