//! Store error types

use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors from the external key-value store or from payload encoding
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not reach the store
    #[error("store connection failed: {0}")]
    Connection(String),

    /// A command was rejected or failed mid-flight
    #[error("store command failed: {0}")]
    Command(String),

    /// A key segment would not address a single logical key
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A cached payload could not be encoded or decoded
    #[error("cache payload serialization failed: {0}")]
    Serialization(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_timeout() {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Command(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
