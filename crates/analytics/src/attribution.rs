//! Attribution aggregator
//!
//! Pivots attributed orders per ad platform onto the daily axis and summarises
//! each platform's contribution per tenant.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use futures::future::try_join_all;
use serde::Serialize;

use drift_sources::{DataSources, PlatformMetric, Tenant};
use drift_store::{Clock, TagStore};

use crate::axis::{DIFF_WINDOW, DateAxis, tail};
use crate::error::Result;
use crate::rules::{
    ATTRIBUTION_PLATFORM, CustomerType, EngineConfig, MISSING_ATTRIBUTION_TAG, Rank, merge_tags,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributionDateEntry {
    pub date: NaiveDate,
    pub platform_data: BTreeMap<String, i64>,
    pub total_attribution: i64,
    pub is_recent_zero: bool,
}

/// One platform's contribution over the axis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformTotal {
    pub platform: String,
    pub total: i64,
    pub active_days: usize,
    /// `total` over the days the platform contributed; zero if it never did
    pub daily_average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributionTenantView {
    pub tenant_id: i64,
    pub tenant_name: String,
    pub register_time: Option<DateTime<Utc>>,
    pub date_sequence: Vec<AttributionDateEntry>,
    pub platform_totals: Vec<PlatformTotal>,
    pub total_attribution_avg: f64,
    pub tags: Vec<String>,
    pub recent_zero_days: usize,
    pub has_recent_zeros: bool,
    pub customer_type: CustomerType,
}

impl AttributionTenantView {
    pub fn platform_total(&self, platform: &str) -> Option<&PlatformTotal> {
        self.platform_totals.iter().find(|p| p.platform == platform)
    }

    fn rank(&self) -> Rank {
        let recent: i64 = tail(&self.date_sequence, DIFF_WINDOW)
            .iter()
            .map(|e| e.total_attribution)
            .sum();
        Rank::new(&self.tags, self.recent_zero_days, recent, self.tenant_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributionReport {
    pub tenants: Vec<AttributionTenantView>,
    /// Every ad platform seen on the axis, by name
    pub platforms: Vec<String>,
    pub data_last_load_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedAttribution {
    pub new_customers: Vec<AttributionTenantView>,
    pub old_customers: Vec<AttributionTenantView>,
    pub data_last_load_time: DateTime<Utc>,
}

// =============================================================================
// Pivot
// =============================================================================

/// tenant → day → platform → value, restricted to the axis
type PivotIndex = HashMap<i64, HashMap<NaiveDate, BTreeMap<String, i64>>>;

fn pivot(rows: &[PlatformMetric], axis: &DateAxis) -> PivotIndex {
    let mut index = PivotIndex::new();
    for row in rows.iter().filter(|r| axis.contains(r.date)) {
        *index
            .entry(row.tenant_id)
            .or_default()
            .entry(row.date)
            .or_default()
            .entry(row.platform.clone())
            .or_insert(0) += row.value;
    }
    index
}

pub(crate) fn build_attribution_sequence(
    axis: &DateAxis,
    days: Option<&HashMap<NaiveDate, BTreeMap<String, i64>>>,
    recent_window: usize,
) -> Vec<AttributionDateEntry> {
    let recent_from = axis.tail_start(recent_window);
    axis.days()
        .iter()
        .enumerate()
        .map(|(i, date)| {
            let platform_data = days
                .and_then(|d| d.get(date))
                .cloned()
                .unwrap_or_default();
            let total_attribution = platform_data.values().sum();
            AttributionDateEntry {
                date: *date,
                platform_data,
                total_attribution,
                is_recent_zero: i >= recent_from && total_attribution == 0,
            }
        })
        .collect()
}

/// Per-platform totals, sorted by platform name
pub(crate) fn platform_totals(sequence: &[AttributionDateEntry]) -> Vec<PlatformTotal> {
    let mut totals: BTreeMap<&str, (i64, usize)> = BTreeMap::new();
    for entry in sequence {
        for (platform, value) in &entry.platform_data {
            let slot = totals.entry(platform.as_str()).or_insert((0, 0));
            slot.0 += value;
            if *value > 0 {
                slot.1 += 1;
            }
        }
    }

    totals
        .into_iter()
        .map(|(platform, (total, active_days))| PlatformTotal {
            platform: platform.to_string(),
            total,
            active_days,
            daily_average: if active_days == 0 {
                0.0
            } else {
                total as f64 / active_days as f64
            },
        })
        .collect()
}

/// Mean daily total over the active days of the trailing window
pub(crate) fn total_attribution_avg(sequence: &[AttributionDateEntry]) -> f64 {
    let active: Vec<i64> = tail(sequence, DIFF_WINDOW)
        .iter()
        .map(|e| e.total_attribution)
        .filter(|t| *t > 0)
        .collect();
    if active.is_empty() {
        return 0.0;
    }
    active.iter().sum::<i64>() as f64 / active.len() as f64
}

// =============================================================================
// Aggregator
// =============================================================================

pub struct AttributionAggregator {
    sources: DataSources,
    tags: TagStore,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl AttributionAggregator {
    pub fn new(
        sources: DataSources,
        tags: TagStore,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            sources,
            tags,
            clock,
            config,
        }
    }

    /// Every tenant with attributed orders on the axis
    pub async fn all(&self, refresh: bool) -> Result<AttributionReport> {
        self.report(refresh, None).await
    }

    /// One tenant, read through its own cache key
    pub async fn tenant(&self, refresh: bool, tenant_id: i64) -> Result<AttributionReport> {
        self.report(refresh, Some(tenant_id)).await
    }

    /// All tenants split by customer type; unknown tenants are left out
    pub async fn grouped(&self, refresh: bool) -> Result<GroupedAttribution> {
        let report = self.all(refresh).await?;
        let mut new_customers = Vec::new();
        let mut old_customers = Vec::new();
        for view in report.tenants {
            match view.customer_type {
                CustomerType::New => new_customers.push(view),
                CustomerType::Old => old_customers.push(view),
                CustomerType::Unknown => {}
            }
        }
        Ok(GroupedAttribution {
            new_customers,
            old_customers,
            data_last_load_time: report.data_last_load_time,
        })
    }

    async fn report(&self, refresh: bool, tenant_id: Option<i64>) -> Result<AttributionReport> {
        let started = Instant::now();

        let (fetched, directory) = tokio::try_join!(
            self.sources.attribution.fetch(refresh, tenant_id),
            self.sources.tenants.tenants(refresh),
        )?;

        let now = self.clock.now();
        let axis = DateAxis::ending(self.clock.today());
        let index = pivot(&fetched.data, &axis);

        let ids: BTreeSet<i64> = match tenant_id {
            Some(only) => BTreeSet::from([only]),
            None => index.keys().copied().collect(),
        };

        let mut tenants = try_join_all(ids.iter().map(|id| {
            self.tenant_view(*id, directory.get(id), index.get(id), &axis, now)
        }))
        .await?;
        tenants.sort_by(|a, b| a.rank().cmp_priority(&b.rank()));

        let platforms: BTreeSet<String> = index
            .values()
            .flat_map(|days| days.values())
            .flat_map(|platforms| platforms.keys().cloned())
            .collect();

        tracing::info!(
            tenant_id,
            tenants = tenants.len(),
            platforms = platforms.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "attribution assembled"
        );

        Ok(AttributionReport {
            tenants,
            platforms: platforms.into_iter().collect(),
            data_last_load_time: fetched.create_time,
        })
    }

    async fn tenant_view(
        &self,
        tenant_id: i64,
        tenant: Option<&Tenant>,
        days: Option<&HashMap<NaiveDate, BTreeMap<String, i64>>>,
        axis: &DateAxis,
        now: DateTime<Utc>,
    ) -> Result<AttributionTenantView> {
        let user_tags = self.tags.list(tenant_id, ATTRIBUTION_PLATFORM).await?;

        let date_sequence =
            build_attribution_sequence(axis, days, self.config.recent_zero_window);
        let recent_zero_days = date_sequence.iter().filter(|e| e.is_recent_zero).count();
        let has_recent_zeros = self.config.is_anomalous(recent_zero_days);

        let system_tags: Vec<String> = if has_recent_zeros {
            vec![MISSING_ATTRIBUTION_TAG.to_string()]
        } else {
            Vec::new()
        };
        let tags = merge_tags([
            self.tags.defaults_for(tenant_id),
            system_tags.as_slice(),
            user_tags.as_slice(),
        ]);

        let register_time = tenant.map(|t| t.register_time);
        Ok(AttributionTenantView {
            tenant_id,
            tenant_name: tenant.map(|t| t.name.clone()).unwrap_or_default(),
            register_time,
            platform_totals: platform_totals(&date_sequence),
            total_attribution_avg: total_attribution_avg(&date_sequence),
            customer_type: CustomerType::classify(
                register_time,
                now,
                self.config.new_customer_days,
            ),
            date_sequence,
            tags,
            recent_zero_days,
            has_recent_zeros,
        })
    }
}
