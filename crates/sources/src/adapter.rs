//! Cached warehouse adapters
//!
//! Each adapter pairs one family of templates with one cache namespace and
//! answers `(platform[, tenant]) → rows`. Empty results are valid and cached;
//! errors propagate and leave the cache untouched.

use std::sync::Arc;

use async_trait::async_trait;
use drift_query::{QueryExecutor, QueryParams};
use drift_store::{CacheLayer, Fetched, TypedCache};

use crate::error::{Result, SourceError};
use crate::model::{ApiRow, AttributionRow, DailyMetric, OverviewRow, PlatformMetric, WmRow};
use crate::platform::{Platform, WarehouseQuery};
use crate::sql;

/// A daily-metric source for a platform
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn fetch(
        &self,
        refresh: bool,
        platform: &Platform,
        tenant_id: Option<i64>,
    ) -> Result<Fetched<Vec<DailyMetric>>>;

    /// Drop the entry the fetch would read; the next fetch goes upstream
    async fn invalidate(&self, platform: &Platform, tenant_id: Option<i64>) -> Result<bool>;

    fn name(&self) -> &'static str;
}

fn key_parts<'a>(name: &'a str, tenant: &'a Option<String>) -> Vec<&'a str> {
    let mut parts = vec![name];
    if let Some(t) = tenant {
        parts.push(t.as_str());
    }
    parts
}

fn log_fetched<T>(source: &str, key: &str, fetched: &Fetched<Vec<T>>) {
    tracing::info!(
        source,
        key,
        rows = fetched.data.len(),
        from_cache = fetched.from_cache,
        "source fetched"
    );
}

// =============================================================================
// Vendor-reported aggregates
// =============================================================================

/// `apidata_<platform>[_<tenant>]`, keyed by the external platform name
pub struct ApiDataSource {
    executor: QueryExecutor,
    cache: TypedCache<Vec<DailyMetric>>,
}

impl ApiDataSource {
    pub fn new(executor: QueryExecutor, cache: Arc<CacheLayer>) -> Self {
        Self {
            executor,
            cache: TypedCache::new(cache, "apidata"),
        }
    }
}

#[async_trait]
impl MetricSource for ApiDataSource {
    async fn fetch(
        &self,
        refresh: bool,
        platform: &Platform,
        tenant_id: Option<i64>,
    ) -> Result<Fetched<Vec<DailyMetric>>> {
        let tenant = tenant_id.map(|t| t.to_string());
        let parts = key_parts(platform.external, &tenant);

        let fetched = self
            .cache
            .get_or_fetch(&parts, refresh, move || async move {
                let params = QueryParams::new().text("raw_platform", platform.external);
                let (template, params) = match tenant_id {
                    Some(t) => (sql::API_DATA_FOR_TENANT, params.int("tenant_id", t)),
                    None => (sql::API_DATA, params),
                };
                let rows: Vec<ApiRow> = self.executor.fetch(template, &params).await?;
                Ok::<_, SourceError>(rows.into_iter().map(DailyMetric::from).collect())
            })
            .await?;

        log_fetched(self.name(), &self.cache.key(&parts), &fetched);
        Ok(fetched)
    }

    async fn invalidate(&self, platform: &Platform, tenant_id: Option<i64>) -> Result<bool> {
        let tenant = tenant_id.map(|t| t.to_string());
        Ok(self
            .cache
            .invalidate(&key_parts(platform.external, &tenant))
            .await?)
    }

    fn name(&self) -> &'static str {
        "api_data"
    }
}

// =============================================================================
// Pipeline-computed aggregates
// =============================================================================

/// `overview_<canonical>[_<tenant>]`
pub struct WarehouseSource {
    executor: QueryExecutor,
    cache: TypedCache<Vec<DailyMetric>>,
}

impl WarehouseSource {
    pub fn new(executor: QueryExecutor, cache: Arc<CacheLayer>) -> Self {
        Self {
            executor,
            cache: TypedCache::new(cache, "overview"),
        }
    }
}

#[async_trait]
impl MetricSource for WarehouseSource {
    async fn fetch(
        &self,
        refresh: bool,
        platform: &Platform,
        tenant_id: Option<i64>,
    ) -> Result<Fetched<Vec<DailyMetric>>> {
        let tenant = tenant_id.map(|t| t.to_string());
        let parts = key_parts(platform.canonical, &tenant);

        let fetched = self
            .cache
            .get_or_fetch(&parts, refresh, move || async move {
                let params = QueryParams::new().text("ads_platform", platform.canonical);
                let template = match (platform.warehouse, tenant_id) {
                    (WarehouseQuery::SurveyResponses, Some(_)) => {
                        sql::KNOCOMMERCE_RESPONSES_FOR_TENANT
                    }
                    (WarehouseQuery::SurveyResponses, None) => sql::KNOCOMMERCE_RESPONSES,
                    (_, Some(_)) => sql::OVERVIEW_DATA_FOR_TENANT,
                    (_, None) => sql::OVERVIEW_DATA,
                };
                let params = match tenant_id {
                    Some(t) => params.int("tenant_id", t),
                    None => params,
                };
                let rows: Vec<OverviewRow> = self.executor.fetch(template, &params).await?;
                Ok::<_, SourceError>(rows.into_iter().map(DailyMetric::from).collect())
            })
            .await?;

        log_fetched(self.name(), &self.cache.key(&parts), &fetched);
        Ok(fetched)
    }

    async fn invalidate(&self, platform: &Platform, tenant_id: Option<i64>) -> Result<bool> {
        let tenant = tenant_id.map(|t| t.to_string());
        Ok(self
            .cache
            .invalidate(&key_parts(platform.canonical, &tenant))
            .await?)
    }

    fn name(&self) -> &'static str {
        "warehouse_attributed"
    }
}

// =============================================================================
// Single-source platforms
// =============================================================================

/// `wmdata_<platform>`; a tenant request filters the platform-wide entry
pub struct WmOnlySource {
    executor: QueryExecutor,
    cache: TypedCache<Vec<DailyMetric>>,
}

impl WmOnlySource {
    pub fn new(executor: QueryExecutor, cache: Arc<CacheLayer>) -> Self {
        Self {
            executor,
            cache: TypedCache::new(cache, "wmdata"),
        }
    }
}

#[async_trait]
impl MetricSource for WmOnlySource {
    async fn fetch(
        &self,
        refresh: bool,
        platform: &Platform,
        tenant_id: Option<i64>,
    ) -> Result<Fetched<Vec<DailyMetric>>> {
        let WarehouseQuery::Single(template) = platform.warehouse else {
            return Err(SourceError::UnknownPlatform(format!(
                "{} has no single-source query",
                platform.external
            )));
        };
        let parts = [platform.external];

        let mut fetched = self
            .cache
            .get_or_fetch(&parts, refresh, move || async move {
                let rows: Vec<WmRow> = self.executor.fetch(template, &QueryParams::new()).await?;
                Ok::<_, SourceError>(rows.into_iter().map(DailyMetric::from).collect())
            })
            .await?;

        log_fetched(self.name(), &self.cache.key(&parts), &fetched);

        if let Some(t) = tenant_id {
            fetched.data.retain(|m| m.tenant_id == t);
        }
        Ok(fetched)
    }

    /// Tenant requests share the platform-wide entry, so it is always the one dropped
    async fn invalidate(&self, platform: &Platform, _tenant_id: Option<i64>) -> Result<bool> {
        Ok(self.cache.invalidate(&[platform.external]).await?)
    }

    fn name(&self) -> &'static str {
        "wm_only"
    }
}

// =============================================================================
// Attribution
// =============================================================================

/// `attribution_data[_<tenant>]`: attributed orders per ad platform
pub struct AttributionSource {
    executor: QueryExecutor,
    cache: TypedCache<Vec<PlatformMetric>>,
}

impl AttributionSource {
    pub fn new(executor: QueryExecutor, cache: Arc<CacheLayer>) -> Self {
        Self {
            executor,
            cache: TypedCache::new(cache, "attribution_data"),
        }
    }

    pub async fn fetch(
        &self,
        refresh: bool,
        tenant_id: Option<i64>,
    ) -> Result<Fetched<Vec<PlatformMetric>>> {
        let tenant = tenant_id.map(|t| t.to_string());
        let parts: Vec<&str> = tenant.iter().map(String::as_str).collect();

        let fetched = self
            .cache
            .get_or_fetch(&parts, refresh, move || async move {
                let (template, params) = match tenant_id {
                    Some(t) => (sql::ATTRIBUTION_FOR_TENANT, QueryParams::new().int("tenant_id", t)),
                    None => (sql::ATTRIBUTION, QueryParams::new()),
                };
                let rows: Vec<AttributionRow> = self.executor.fetch(template, &params).await?;
                Ok::<_, SourceError>(rows.into_iter().map(PlatformMetric::from).collect())
            })
            .await?;

        log_fetched("attribution", &self.cache.key(&parts), &fetched);
        Ok(fetched)
    }
}

#[cfg(test)]
#[path = "adapter_test.rs"]
mod adapter_test;
