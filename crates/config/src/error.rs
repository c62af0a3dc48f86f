//! Configuration errors

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A file value or environment override that parses but cannot be used
    #[error("{origin}: invalid {field}, {reason}")]
    Invalid {
        /// `[section]` name or environment variable
        origin: &'static str,
        field: &'static str,
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid(origin: &'static str, field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            origin,
            field,
            reason: reason.into(),
        }
    }
}
