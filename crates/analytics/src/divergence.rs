//! Divergence engine
//!
//! Lays the vendor-reported and pipeline-computed series for one platform over
//! the daily axis, per tenant, and flags tenants whose tail days are missing.
//! Dual-source tenants also get the trailing-week judgement from
//! [`crate::quality`].

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use futures::future::try_join_all;
use serde::Serialize;

use drift_sources::{DailyMetric, DataSources, DataType, Platform, Tenant};
use drift_store::{CacheLayer, Clock, Fetched, TagStore};

use crate::axis::{DIFF_WINDOW, DateAxis, tail};
use crate::error::Result;
use crate::quality::{NoiseKind, QualitySummary, assess};
use crate::rules::{
    CustomerType, EngineConfig, MISSING_ATTRIBUTION_TAG, MISSING_DATA_TAG, Rank, SILENT_WEEK_TAG,
    merge_tags,
};

// =============================================================================
// Views
// =============================================================================

/// One day of the joined series
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateEntry {
    pub date: NaiveDate,
    #[serde(rename = "api_data")]
    pub api_value: i64,
    #[serde(rename = "data")]
    pub warehouse_value: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_data: Option<i64>,
    pub is_missing: bool,
    pub is_noise: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_type: Option<NoiseKind>,
}

/// One tenant's comparison for one platform
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenantView {
    pub tenant_id: i64,
    pub tenant_name: String,
    pub register_time: DateTime<Utc>,
    pub last_30_day_diff: i64,
    pub date_sequence: Vec<DateEntry>,
    pub tags: Vec<String>,
    pub recent_zero_days: usize,
    pub has_recent_zeros: bool,
    pub missing_data_days: usize,
    pub has_missing_data: bool,
    pub noise_data_days: usize,
    pub has_noise_data: bool,
    pub customer_type: CustomerType,
}

impl TenantView {
    fn rank(&self) -> Rank {
        Rank::new(
            &self.tags,
            self.recent_zero_days,
            self.last_30_day_diff,
            self.tenant_id,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlterDataReport {
    pub new_tenants: Vec<TenantView>,
    pub old_tenants: Vec<TenantView>,
    pub data_last_load_time: DateTime<Utc>,
    pub data_type: DataType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_data_date: Option<NaiveDate>,
}

impl AlterDataReport {
    pub fn tenant_count(&self) -> usize {
        self.new_tenants.len() + self.old_tenants.len()
    }

    /// Find a tenant in either partition
    pub fn tenant(&self, tenant_id: i64) -> Option<&TenantView> {
        self.new_tenants
            .iter()
            .chain(self.old_tenants.iter())
            .find(|v| v.tenant_id == tenant_id)
    }
}

// =============================================================================
// Join
// =============================================================================

/// tenant → day → value, restricted to the axis
pub(crate) type DailyIndex = HashMap<i64, HashMap<NaiveDate, i64>>;

/// Group rows by tenant and day; rows off the axis are dropped, duplicates summed
pub(crate) fn index_by_tenant(rows: &[DailyMetric], axis: &DateAxis) -> DailyIndex {
    let mut index = DailyIndex::new();
    for row in rows.iter().filter(|r| axis.contains(r.date)) {
        *index
            .entry(row.tenant_id)
            .or_default()
            .entry(row.date)
            .or_insert(0) += row.value;
    }
    index
}

/// Look up both sides on every axis day; a missing side is zero
pub(crate) fn build_sequence(
    axis: &DateAxis,
    api: Option<&HashMap<NaiveDate, i64>>,
    warehouse: Option<&HashMap<NaiveDate, i64>>,
    remove_data: &BTreeMap<NaiveDate, i64>,
) -> Vec<DateEntry> {
    let value_on = |side: Option<&HashMap<NaiveDate, i64>>, date: &NaiveDate| {
        side.and_then(|days| days.get(date)).copied().unwrap_or(0)
    };

    axis.days()
        .iter()
        .map(|date| DateEntry {
            date: *date,
            api_value: value_on(api, date),
            warehouse_value: value_on(warehouse, date),
            remove_data: remove_data.get(date).copied(),
            is_missing: false,
            is_noise: false,
            noise_type: None,
        })
        .collect()
}

/// Sum of `api - warehouse` over the trailing window
pub(crate) fn last_30_day_diff(sequence: &[DateEntry]) -> i64 {
    tail(sequence, DIFF_WINDOW)
        .iter()
        .map(|e| e.api_value - e.warehouse_value)
        .sum()
}

/// Tail days the vendor reported nothing while the pipeline saw activity
pub(crate) fn vendor_gap_days(sequence: &[DateEntry], window: usize) -> usize {
    tail(sequence, window)
        .iter()
        .filter(|e| e.api_value == 0 && e.warehouse_value != 0)
        .count()
}

/// Tail days with no pipeline data
pub(crate) fn silent_days(sequence: &[DateEntry], window: usize) -> usize {
    tail(sequence, window)
        .iter()
        .filter(|e| e.warehouse_value == 0)
        .count()
}

// =============================================================================
// Engine
// =============================================================================

struct Sides {
    api: Option<Fetched<Vec<DailyMetric>>>,
    warehouse: Fetched<Vec<DailyMetric>>,
}

impl Sides {
    fn last_load_time(&self) -> DateTime<Utc> {
        match &self.api {
            Some(api) => api.create_time.max(self.warehouse.create_time),
            None => self.warehouse.create_time,
        }
    }
}

/// Per-request state shared by every tenant in the report
struct Join<'a> {
    platform: &'a Platform,
    axis: DateAxis,
    now: DateTime<Utc>,
    api: DailyIndex,
    warehouse: DailyIndex,
}

pub struct DivergenceEngine {
    sources: DataSources,
    tags: TagStore,
    cache: Arc<CacheLayer>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl DivergenceEngine {
    pub fn new(
        sources: DataSources,
        tags: TagStore,
        cache: Arc<CacheLayer>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            sources,
            tags,
            cache,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compare both sources for `platform`, optionally for one tenant
    pub async fn alter_data(
        &self,
        refresh: bool,
        platform: &Platform,
        tenant_id: Option<i64>,
    ) -> Result<AlterDataReport> {
        let started = Instant::now();

        let (sides, directory, connected) = tokio::try_join!(
            self.fetch_sides(refresh, platform, tenant_id),
            self.sources.tenants.tenants(refresh),
            self.sources.tenants.connected(refresh, platform),
        )?;

        let now = self.clock.now();
        let axis = DateAxis::ending(self.clock.today());
        let join = Join {
            platform,
            api: sides
                .api
                .as_ref()
                .map(|api| index_by_tenant(&api.data, &axis))
                .unwrap_or_default(),
            warehouse: index_by_tenant(&sides.warehouse.data, &axis),
            axis,
            now,
        };

        let ids = tenant_set(&join, connected, tenant_id);
        let (known, unknown): (Vec<i64>, Vec<i64>) =
            ids.into_iter().partition(|id| directory.contains_key(id));
        if !unknown.is_empty() {
            tracing::debug!(
                platform = platform.external,
                unknown = unknown.len(),
                "tenants missing from directory dropped"
            );
        }

        let mut views = try_join_all(
            known
                .iter()
                .filter_map(|id| directory.get(id))
                .map(|tenant| self.tenant_view(&join, tenant)),
        )
        .await?;
        views.sort_by(|a, b| a.rank().cmp_priority(&b.rank()));

        let last_data_date = platform
            .is_wm_only()
            .then(|| latest_active_day(&views))
            .flatten();
        let (new_tenants, old_tenants): (Vec<_>, Vec<_>) = views
            .into_iter()
            .partition(|v| v.customer_type == CustomerType::New);

        tracing::info!(
            platform = platform.external,
            tenant_id,
            new_tenants = new_tenants.len(),
            old_tenants = old_tenants.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "alter data assembled"
        );

        Ok(AlterDataReport {
            new_tenants,
            old_tenants,
            data_last_load_time: sides.last_load_time(),
            data_type: platform.data_type,
            last_data_date,
        })
    }

    /// Drop the cached source entries `alter_data` would read for the same
    /// arguments, without fetching; returns how many existed
    pub async fn invalidate(&self, platform: &Platform, tenant_id: Option<i64>) -> Result<usize> {
        let dropped = if platform.is_wm_only() {
            vec![self.sources.wm_only.invalidate(platform, tenant_id).await?]
        } else {
            let (api, warehouse) = tokio::try_join!(
                self.sources.api.invalidate(platform, tenant_id),
                self.sources.warehouse.invalidate(platform, tenant_id),
            )?;
            vec![api, warehouse]
        };
        let dropped = dropped.into_iter().filter(|existed| *existed).count();

        tracing::info!(
            platform = platform.external,
            tenant_id,
            dropped,
            "source cache invalidated"
        );
        Ok(dropped)
    }

    async fn fetch_sides(
        &self,
        refresh: bool,
        platform: &Platform,
        tenant_id: Option<i64>,
    ) -> drift_sources::Result<Sides> {
        if platform.is_wm_only() {
            let warehouse = self.sources.wm_only.fetch(refresh, platform, tenant_id).await?;
            return Ok(Sides {
                api: None,
                warehouse,
            });
        }

        let (api, warehouse) = tokio::try_join!(
            self.sources.api.fetch(refresh, platform, tenant_id),
            self.sources.warehouse.fetch(refresh, platform, tenant_id),
        )?;
        Ok(Sides {
            api: Some(api),
            warehouse,
        })
    }

    async fn tenant_view(&self, join: &Join<'_>, tenant: &Tenant) -> Result<TenantView> {
        let id = tenant.tenant_id;
        let (remove_data, user_tags) = tokio::try_join!(
            self.cache.load_remove_data(id, join.platform.external),
            self.tags.list(id, join.platform.external),
        )?;

        let mut date_sequence = build_sequence(
            &join.axis,
            join.api.get(&id),
            join.warehouse.get(&id),
            &remove_data,
        );

        let mut system_tags = Vec::new();
        let mut quality = QualitySummary::default();
        let recent_zero_days = if join.platform.is_wm_only() {
            let window = self.config.silence_window;
            if window > 0 && silent_days(&date_sequence, window) == window.min(date_sequence.len())
            {
                system_tags.push(SILENT_WEEK_TAG.to_string());
            }
            silent_days(&date_sequence, self.config.recent_zero_window)
        } else {
            let gaps = vendor_gap_days(&date_sequence, self.config.recent_zero_window);
            if self.config.is_anomalous(gaps) {
                system_tags.push(MISSING_ATTRIBUTION_TAG.to_string());
            }
            quality = assess(&mut date_sequence);
            if quality.has_missing_data() {
                system_tags.push(MISSING_DATA_TAG.to_string());
            }
            gaps
        };

        let tags = merge_tags([
            self.tags.defaults_for(id),
            system_tags.as_slice(),
            user_tags.as_slice(),
        ]);

        Ok(TenantView {
            tenant_id: id,
            tenant_name: tenant.name.clone(),
            register_time: tenant.register_time,
            last_30_day_diff: last_30_day_diff(&date_sequence),
            has_recent_zeros: self.config.is_anomalous(recent_zero_days),
            recent_zero_days,
            missing_data_days: quality.missing_days,
            has_missing_data: quality.has_missing_data(),
            noise_data_days: quality.noise_days,
            has_noise_data: quality.has_noise_data(),
            customer_type: CustomerType::classify(
                Some(tenant.register_time),
                join.now,
                self.config.new_customer_days,
            ),
            date_sequence,
            tags,
        })
    }
}

/// Tenants with rows on either side plus tenants connected to the platform
fn tenant_set(join: &Join<'_>, connected: HashSet<i64>, only: Option<i64>) -> BTreeSet<i64> {
    let mut ids: BTreeSet<i64> = join
        .api
        .keys()
        .chain(join.warehouse.keys())
        .copied()
        .collect();
    ids.extend(connected);
    if let Some(only) = only {
        ids.retain(|id| *id == only);
    }
    ids
}

fn latest_active_day(views: &[TenantView]) -> Option<NaiveDate> {
    views
        .iter()
        .flat_map(|v| v.date_sequence.iter())
        .filter(|e| e.warehouse_value != 0)
        .map(|e| e.date)
        .max()
}
