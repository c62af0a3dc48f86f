//! Shared fixtures: in-memory warehouse, in-memory store, clock at 2025-01-30

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;

use drift_query::{MemoryBackend, QueryExecutor, QueryResult};
use drift_sources::DataSources;
use drift_store::{CacheLayer, DefaultTags, FixedClock, MemoryStore, TagStore};

use crate::attribution::AttributionAggregator;
use crate::divergence::DivergenceEngine;
use crate::rules::EngineConfig;

const API_TABLE: &str = "integration_api_data_view";
const OVERVIEW_MARKER: &str = "sum(ad_spend) as bigint) as value";
const ATTRIBUTION_MARKER: &str = "attr_orders";
const TENANT_TABLE: &str = "non_testing_tenants";
const CONNECTION_TABLE: &str = "account_connection";
pub const FAIRING_TABLE: &str = "post_survey_response_latest";

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn today() -> NaiveDate {
    day(2025, 1, 30)
}

pub struct Harness {
    pub backend: Arc<MemoryBackend>,
    pub store: Arc<MemoryStore>,
    pub clock: FixedClock,
    pub cache: Arc<CacheLayer>,
    pub tags: TagStore,
    pub sources: DataSources,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_defaults(DefaultTags::empty())
    }

    pub fn with_defaults(defaults: DefaultTags) -> Self {
        let clock = FixedClock::at_date(today());
        let store = Arc::new(MemoryStore::with_clock(Arc::new(clock.clone())));
        let cache = Arc::new(CacheLayer::new(store.clone(), Arc::new(clock.clone())));
        let tags = TagStore::new(store.clone(), Arc::new(clock.clone()), defaults);
        let backend = Arc::new(MemoryBackend::new());
        let sources = DataSources::new(QueryExecutor::from_arc(backend.clone()), cache.clone());
        Self {
            backend,
            store,
            clock,
            cache,
            tags,
            sources,
        }
    }

    pub fn engine(&self) -> DivergenceEngine {
        self.engine_with(EngineConfig::default())
    }

    pub fn engine_with(&self, config: EngineConfig) -> DivergenceEngine {
        DivergenceEngine::new(
            self.sources.clone(),
            self.tags.clone(),
            self.cache.clone(),
            Arc::new(self.clock.clone()),
            config,
        )
    }

    pub fn aggregator(&self) -> AttributionAggregator {
        AttributionAggregator::new(
            self.sources.clone(),
            self.tags.clone(),
            Arc::new(self.clock.clone()),
            EngineConfig::default(),
        )
    }

    /// Vendor-reported rows `(tenant, day, value)`
    pub fn api_rows(&self, rows: &[(i64, NaiveDate, i64)]) {
        let rows = rows
            .iter()
            .map(|(t, d, v)| json!({"tenant_id": t, "raw_date": d.to_string(), "ad_spend": v}))
            .collect();
        self.backend.respond(API_TABLE, QueryResult::from_json_rows(rows));
    }

    /// Pipeline rows `(tenant, day, value)`
    pub fn warehouse_rows(&self, rows: &[(i64, NaiveDate, i64)]) {
        let rows = rows
            .iter()
            .map(|(t, d, v)| json!({"tenant_id": t, "event_date": d.to_string(), "value": v}))
            .collect();
        self.backend.respond(OVERVIEW_MARKER, QueryResult::from_json_rows(rows));
    }

    /// Single-source rows for the query containing `marker`
    pub fn wm_rows(&self, marker: &str, rows: &[(i64, NaiveDate, i64)]) {
        let rows = rows
            .iter()
            .map(|(t, d, v)| json!({"tenant_id": t, "raw_date": d.to_string(), "data": v}))
            .collect();
        self.backend.respond(marker, QueryResult::from_json_rows(rows));
    }

    /// Attribution rows `(tenant, day, ad platform, orders)`
    pub fn attribution_rows(&self, rows: &[(i64, NaiveDate, &str, i64)]) {
        let rows = rows
            .iter()
            .map(|(t, d, p, v)| {
                json!({"tenant_id": t, "raw_date": d.to_string(), "ads_platform": p, "data": v})
            })
            .collect();
        self.backend.respond(ATTRIBUTION_MARKER, QueryResult::from_json_rows(rows));
    }

    /// Directory entries `(tenant, registration day)`
    pub fn tenants(&self, tenants: &[(i64, NaiveDate)]) {
        let rows = tenants
            .iter()
            .map(|(t, d)| {
                json!({
                    "tenant_id": t,
                    "main_client_name": format!("tenant {}", t),
                    "register_time": format!("{} 00:00:00", d),
                })
            })
            .collect();
        self.backend.respond(TENANT_TABLE, QueryResult::from_json_rows(rows));
    }

    pub fn connections(&self, connections: &[(i64, &str)]) {
        let rows = connections
            .iter()
            .map(|(t, p)| json!({"tenant_id": t, "platform": p}))
            .collect();
        self.backend.respond(CONNECTION_TABLE, QueryResult::from_json_rows(rows));
    }
}
