//! Drift Configuration
//!
//! TOML-based configuration loading with sensible defaults. Every section is
//! optional; an empty file (or no file) yields a config that only lacks the
//! warehouse DSN.
//!
//! Precedence, lowest first: defaults, TOML file, environment, CLI flags (the
//! binary applies the last layer).
//!
//! # Parsing
//!
//! ```
//! use drift_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[server]\nport = 9090").unwrap();
//! assert_eq!(config.server.port, 9090);
//! ```
//!
//! # Environment
//!
//! | Variable | Field |
//! |---|---|
//! | `REDIS_HOST` | `redis.host` |
//! | `REDIS_PORT` | `redis.port` |
//! | `REDIS_PASSWORD` | `redis.password` |
//! | `WAREHOUSE_DSN` | `warehouse.dsn` |
//! | `STATIC_DIR` | `server.static_dir` |

mod divergence;
mod error;
mod logging;
mod redis;
mod server;
mod warehouse;

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use divergence::DivergenceConfig;
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use redis::RedisConfig;
pub use server::ServerConfig;
pub use warehouse::WarehouseConfig;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// HTTP listener and static bundle
    pub server: ServerConfig,

    /// Key-value store holding the cache and tags
    pub redis: RedisConfig,

    /// Analytical warehouse pool
    pub warehouse: WarehouseConfig,

    /// Engine thresholds
    pub divergence: DivergenceConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or contains invalid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`; empty values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(host) = var("REDIS_HOST") {
            self.redis.host = host;
        }
        if let Some(port) = var("REDIS_PORT") {
            self.redis.port = port.trim().parse().map_err(|_| {
                ConfigError::invalid("REDIS_PORT", "port", format!("not a port: {:?}", port))
            })?;
        }
        if let Some(password) = lookup("REDIS_PASSWORD") {
            self.redis.password = password;
        }
        if let Some(dsn) = var("WAREHOUSE_DSN") {
            self.warehouse.dsn = Some(dsn);
        }
        if let Some(dir) = var("STATIC_DIR") {
            self.server.static_dir = PathBuf::from(dir);
        }

        self.validate()
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server", "port", "must be non-zero"));
        }
        if self.warehouse.max_open == 0 {
            return Err(ConfigError::invalid(
                "warehouse",
                "max_open",
                "must be at least 1",
            ));
        }
        if self.divergence.new_customer_days <= 0 {
            return Err(ConfigError::invalid(
                "divergence",
                "new_customer_days",
                "must be positive",
            ));
        }
        if self.divergence.recent_zero_threshold > self.divergence.recent_zero_window {
            return Err(ConfigError::invalid(
                "divergence",
                "recent_zero_threshold",
                format!(
                    "{} exceeds the {}-day window",
                    self.divergence.recent_zero_threshold, self.divergence.recent_zero_window
                ),
            ));
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
