//! Application state
//!
//! Shared state for API handlers: both engines, the tag store, the cache (for
//! the remove-data side table) and where the dashboard bundle lives.

use std::path::PathBuf;
use std::sync::Arc;

use drift_analytics::{AttributionAggregator, DivergenceEngine};
use drift_store::{CacheLayer, TagStore};

#[derive(Clone)]
pub struct AppState {
    pub divergence: Arc<DivergenceEngine>,
    pub attribution: Arc<AttributionAggregator>,
    pub tags: TagStore,
    pub cache: Arc<CacheLayer>,
    /// Built dashboard served for non-API paths; `None` disables the fallback
    pub static_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        divergence: DivergenceEngine,
        attribution: AttributionAggregator,
        tags: TagStore,
        cache: Arc<CacheLayer>,
    ) -> Self {
        Self {
            divergence: Arc::new(divergence),
            attribution: Arc::new(attribution),
            tags,
            cache,
            static_dir: None,
        }
    }

    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }
}
