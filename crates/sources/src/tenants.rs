//! Tenant directory
//!
//! Registration times and platform connections, cached under `tenants` and
//! `tenant_platforms` with the same refresh rules as the metric sources.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use drift_query::{QueryExecutor, QueryParams};
use drift_store::{CacheLayer, Fetched, TypedCache};

use crate::error::{Result, SourceError};
use crate::model::{Tenant, TenantConnection, TenantRow};
use crate::platform::Platform;
use crate::sql;

pub struct TenantDirectory {
    executor: QueryExecutor,
    tenants: TypedCache<Vec<Tenant>>,
    connections: TypedCache<Vec<TenantConnection>>,
}

impl TenantDirectory {
    pub fn new(executor: QueryExecutor, cache: Arc<CacheLayer>) -> Self {
        Self {
            executor,
            tenants: TypedCache::new(cache.clone(), "tenants"),
            connections: TypedCache::new(cache, "tenant_platforms"),
        }
    }

    /// Every non-testing tenant by id
    pub async fn tenants(&self, refresh: bool) -> Result<HashMap<i64, Tenant>> {
        let fetched: Fetched<Vec<Tenant>> = self
            .tenants
            .get_or_fetch(&[], refresh, move || async move {
                let rows: Vec<TenantRow> = self
                    .executor
                    .fetch(sql::ALL_TENANTS, &QueryParams::new())
                    .await?;
                Ok::<_, SourceError>(rows.into_iter().map(Tenant::from).collect())
            })
            .await?;

        tracing::debug!(tenants = fetched.data.len(), from_cache = fetched.from_cache, "tenant directory loaded");
        Ok(fetched
            .data
            .into_iter()
            .map(|t| (t.tenant_id, t))
            .collect())
    }

    /// Tenants with `platform` connected, including manual connections
    pub async fn connected(&self, refresh: bool, platform: &Platform) -> Result<HashSet<i64>> {
        let fetched = self
            .connections
            .get_or_fetch(&[], refresh, move || async move {
                self.executor
                    .fetch::<TenantConnection>(sql::TENANT_PLATFORMS, &QueryParams::new())
                    .await
                    .map_err(SourceError::from)
            })
            .await?;

        let mut connected: HashSet<i64> = fetched
            .data
            .into_iter()
            .filter(|c| c.platform == platform.external)
            .map(|c| c.tenant_id)
            .collect();
        connected.extend(platform.manual_connections());
        Ok(connected)
    }
}
