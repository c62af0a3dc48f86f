//! Analytics error types

use thiserror::Error;

/// Analytics errors
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A source fetch failed
    #[error("source error: {0}")]
    Source(#[from] drift_sources::SourceError),

    /// Tag or side-cache read failed
    #[error("store error: {0}")]
    Store(#[from] drift_store::StoreError),
}

/// Result type for analytics operations
pub type Result<T> = std::result::Result<T, AnalyticsError>;
