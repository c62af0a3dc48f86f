//! Query error types

/// Result type for query operations
pub type Result<T> = std::result::Result<T, QueryError>;

/// Errors that can occur during query execution
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Connection failed
    #[error("connection failed: {0}")]
    Connection(String),

    /// Query execution failed
    #[error("query execution failed: {0}")]
    Execution(String),

    /// Invalid SQL (only SELECT/WITH allowed)
    #[error("invalid SQL: {0}")]
    InvalidSql(String),

    /// Template references a placeholder with no bound value
    #[error("missing query parameter: {0}")]
    MissingParam(String),

    /// A row did not match the record type it was decoded into
    #[error("row decode failed: {0}")]
    Decode(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::Serialization(err.to_string())
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(e) => QueryError::Config(e.to_string()),
            sqlx::Error::Io(e) => QueryError::Connection(e.to_string()),
            sqlx::Error::Tls(e) => QueryError::Connection(e.to_string()),
            sqlx::Error::PoolTimedOut => {
                QueryError::Connection("timed out acquiring a pooled connection".into())
            }
            sqlx::Error::PoolClosed => QueryError::Connection("connection pool closed".into()),
            sqlx::Error::ColumnDecode { index, source } => {
                QueryError::Decode(format!("column {}: {}", index, source))
            }
            other => QueryError::Execution(other.to_string()),
        }
    }
}
