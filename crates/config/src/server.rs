//! HTTP server configuration

use std::path::PathBuf;

use serde::Deserialize;

/// HTTP server configuration
///
/// # Example
///
/// ```toml
/// [server]
/// host = "0.0.0.0"            # default
/// port = 8080                 # default
/// static_dir = "frontend/dist" # default
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    /// Default: "0.0.0.0"
    pub host: String,

    /// Port to listen on
    /// Default: 8080
    pub port: u16,

    /// Built front-end bundle served for non-API paths
    /// Default: "frontend/dist"
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            static_dir: PathBuf::from("frontend/dist"),
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
