//! Drift Query - SQL execution against the analytical warehouse
//!
//! Every query the service runs is a single autonomous read. Templates carry
//! named `{{placeholders}}` that are bound as driver parameters, never spliced
//! into the SQL text.
//!
//! - **MySQL**: production warehouse (MySQL wire protocol, pooled)
//! - **Memory**: canned results for tests and offline development
//!
//! # Usage
//!
//! ```ignore
//! use drift_query::{MySqlBackend, MySqlBackendConfig, QueryExecutor, QueryParams};
//!
//! let backend = MySqlBackend::connect_lazy(&MySqlBackendConfig::new(dsn))?;
//! let executor = QueryExecutor::new(backend);
//!
//! let params = QueryParams::new().text("ads_platform", "Google");
//! let rows: Vec<MyRow> = executor.fetch(MY_SQL, &params).await?;
//! ```

pub mod backend;
pub mod error;
pub mod result;
pub mod template;

// Re-exports
pub use backend::QueryBackend;
pub use backend::memory::MemoryBackend;
pub use backend::mysql::{MySqlBackend, MySqlBackendConfig};
pub use error::{QueryError, Result};
pub use result::{Column, DataType, QueryResult};
pub use template::{BoundQuery, ParamValue, QueryParams};

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;

/// Process-wide query executor
///
/// Cheap to clone; all clones share the same backend (and its pool).
#[derive(Clone)]
pub struct QueryExecutor {
    backend: Arc<dyn QueryBackend>,
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl QueryExecutor {
    /// Create an executor over a specific backend
    pub fn new(backend: impl QueryBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Create an executor over an already shared backend
    pub fn from_arc(backend: Arc<dyn QueryBackend>) -> Self {
        Self { backend }
    }

    /// Bind `params` into `sql` and return the raw result
    pub async fn execute(&self, sql: &str, params: &QueryParams) -> Result<QueryResult> {
        let bound = template::bind(sql, params)?;
        let start = Instant::now();
        let result = self.backend.execute(&bound).await?;

        tracing::debug!(
            backend = self.backend.name(),
            rows = result.row_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "warehouse query executed"
        );

        Ok(result)
    }

    /// Bind, execute and decode every row into `T`
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &QueryParams,
    ) -> Result<Vec<T>> {
        self.execute(sql, params).await?.decode()
    }

    /// Check the backend is reachable
    pub async fn health_check(&self) -> Result<()> {
        self.backend.health_check().await
    }

    /// Backend name for logging
    pub fn name(&self) -> &'static str {
        self.backend.name()
    }
}
