//! Drift Sources - cached warehouse data sources
//!
//! Adapters wrap the query executor and the result cache and expose a uniform
//! `(platform[, tenant]) → rows` shape:
//!
//! - [`ApiDataSource`]: what the vendor API reported
//! - [`WarehouseSource`]: what the pipeline attributed
//! - [`WmOnlySource`]: platforms with a pipeline measure only
//! - [`AttributionSource`]: attributed orders per ad platform
//! - [`TenantDirectory`]: registration times and platform connections

pub mod adapter;
pub mod error;
pub mod model;
pub mod platform;
pub mod sql;
pub mod tenants;

pub use adapter::{ApiDataSource, AttributionSource, MetricSource, WarehouseSource, WmOnlySource};
pub use error::{Result, SourceError};
pub use model::{DailyMetric, PlatformMetric, Tenant, TenantConnection};
pub use platform::{DataType, Platform};
pub use tenants::TenantDirectory;

use std::sync::Arc;

use drift_query::QueryExecutor;
use drift_store::CacheLayer;

/// Every source the engines read, sharing one executor and one cache
#[derive(Clone)]
pub struct DataSources {
    pub api: Arc<dyn MetricSource>,
    pub warehouse: Arc<dyn MetricSource>,
    pub wm_only: Arc<dyn MetricSource>,
    pub attribution: Arc<AttributionSource>,
    pub tenants: Arc<TenantDirectory>,
}

impl std::fmt::Debug for DataSources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSources").finish_non_exhaustive()
    }
}

impl DataSources {
    pub fn new(executor: QueryExecutor, cache: Arc<CacheLayer>) -> Self {
        Self {
            api: Arc::new(ApiDataSource::new(executor.clone(), cache.clone())),
            warehouse: Arc::new(WarehouseSource::new(executor.clone(), cache.clone())),
            wm_only: Arc::new(WmOnlySource::new(executor.clone(), cache.clone())),
            attribution: Arc::new(AttributionSource::new(executor.clone(), cache.clone())),
            tenants: Arc::new(TenantDirectory::new(executor, cache)),
        }
    }
}
