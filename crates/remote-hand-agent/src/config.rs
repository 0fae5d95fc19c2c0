//! Agent configuration loaded from TOML.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listening socket settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host name or IP address to listen at. `0.0.0.0` accepts clients from
    /// other machines.
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Set `TCP_NODELAY` on the client socket.
    #[serde(default = "default_true")]
    pub nodelay: bool,
    /// Larger request frames are discarded.
    #[serde(default = "default_max_request_size")]
    pub max_request_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            nodelay: true,
            max_request_size: default_max_request_size(),
        }
    }
}

/// Input engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Release keys still held by injection when the client goes away.
    #[serde(default = "default_true")]
    pub release_on_disconnect: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            release_on_disconnect: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub const DEFAULT_ADDRESS: &str = "localhost";
pub const DEFAULT_PORT: u16 = 12345;

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_true() -> bool {
    true
}

fn default_max_request_size() -> u32 {
    remote_hand_protocol::wire::MAX_REQUEST_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}
