//! Source error types

use thiserror::Error;

/// Result type for source operations
pub type Result<T> = std::result::Result<T, SourceError>;

#[derive(Debug, Error)]
pub enum SourceError {
    /// Warehouse query failed
    #[error(transparent)]
    Query(#[from] drift_query::QueryError),

    /// Cache read or write failed
    #[error(transparent)]
    Store(#[from] drift_store::StoreError),

    /// Platform has no registered sources
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),
}
