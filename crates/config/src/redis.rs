//! Key-value store configuration

use serde::Deserialize;

/// Redis connection settings
///
/// # Example
///
/// ```toml
/// [redis]
/// host = "localhost"
/// port = 6379
/// password = ""
/// db = 0
/// ```
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    pub db: i64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            password: String::new(),
            db: 0,
        }
    }
}

impl std::fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("db", &self.db)
            .finish()
    }
}
