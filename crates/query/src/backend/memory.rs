//! In-memory backend
//!
//! Serves canned results matched by a marker substring of the SQL text (a
//! table name is usually enough). Records every query it receives so callers
//! can assert how often the warehouse would have been hit.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::backend::QueryBackend;
use crate::error::QueryError;
use crate::result::QueryResult;
use crate::template::BoundQuery;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    fixtures: RwLock<Vec<(String, QueryResult)>>,
    executed: RwLock<Vec<BoundQuery>>,
    failure: RwLock<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer any query containing `marker` with `result`
    ///
    /// Registering the same marker again replaces the previous result.
    pub fn respond(&self, marker: impl Into<String>, result: QueryResult) {
        let marker = marker.into();
        let mut fixtures = self.fixtures.write();
        match fixtures.iter_mut().find(|(m, _)| *m == marker) {
            Some(slot) => slot.1 = result,
            None => fixtures.push((marker, result)),
        }
    }

    /// Fail every subsequent query with an execution error
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.write() = Some(message.into());
    }

    /// Stop failing
    pub fn recover(&self) {
        *self.failure.write() = None;
    }

    /// Queries received so far, in order
    pub fn executed(&self) -> Vec<BoundQuery> {
        self.executed.read().clone()
    }

    /// Number of queries received so far
    pub fn execution_count(&self) -> usize {
        self.executed.read().len()
    }
}

#[async_trait]
impl QueryBackend for MemoryBackend {
    async fn execute(&self, query: &BoundQuery) -> Result<QueryResult, QueryError> {
        self.executed.write().push(query.clone());

        if let Some(message) = self.failure.read().clone() {
            return Err(QueryError::Execution(message));
        }

        let fixtures = self.fixtures.read();
        Ok(fixtures
            .iter()
            .find(|(marker, _)| query.sql.contains(marker.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or_else(QueryResult::empty))
    }

    async fn health_check(&self) -> Result<(), QueryError> {
        match self.failure.read().as_ref() {
            Some(message) => Err(QueryError::Connection(message.clone())),
            None => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
