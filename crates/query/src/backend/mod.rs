//! Query backend trait and implementations

pub mod memory;
pub mod mysql;

use async_trait::async_trait;

use crate::error::QueryError;
use crate::result::QueryResult;
use crate::template::BoundQuery;

/// Query backend trait
///
/// Implemented by the pooled MySQL backend and the in-memory backend.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Execute a bound query
    async fn execute(&self, query: &BoundQuery) -> Result<QueryResult, QueryError>;

    /// Check if backend is available
    async fn health_check(&self) -> Result<(), QueryError>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Reject anything but a single read-only statement
///
/// Templates are trusted, so this is a tripwire for a template edited into a
/// write, not a sanitiser.
pub fn validate_sql(sql: &str) -> Result<(), QueryError> {
    let statement = sql.trim().trim_end_matches(';');
    if statement.contains(';') {
        return Err(QueryError::InvalidSql("one statement per query".into()));
    }

    let mut words = statement
        .split(|c: char| c.is_whitespace() || c == '(' || c == ')')
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_uppercase);

    match words.next().as_deref() {
        Some("SELECT") | Some("WITH") => {}
        other => {
            return Err(QueryError::InvalidSql(format!(
                "read-only query expected, got {}",
                other.unwrap_or("nothing")
            )));
        }
    }
    if words.any(|w| w == "INTO") {
        return Err(QueryError::InvalidSql("SELECT ... INTO writes a table".into()));
    }

    Ok(())
}
