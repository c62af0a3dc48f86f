//! Classification, anomaly and ordering rules shared by both engines

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use drift_store::is_anomaly_tag;

/// Tail days are missing attribution or vendor data
pub const MISSING_ATTRIBUTION_TAG: &str = "err_归因缺失";

/// The pipeline is missing two or more days of the trailing week
pub const MISSING_DATA_TAG: &str = "err_缺数";

/// A single-source platform has reported nothing for a week
pub const SILENT_WEEK_TAG: &str = "err_最近7天无数据";

/// Pseudo-platform attribution tags are filed under
pub const ATTRIBUTION_PLATFORM: &str = "attribution";

/// Thresholds for classification and the tail-zero detector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Tenants registered less than this many days ago are `new`
    pub new_customer_days: i64,
    /// Trailing entries the tail-zero detector scans
    pub recent_zero_window: usize,
    /// Zero entries within the window that raise the anomaly tag
    pub recent_zero_threshold: usize,
    /// Trailing entries a single-source platform must be silent for
    pub silence_window: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            new_customer_days: 30,
            recent_zero_window: 3,
            recent_zero_threshold: 1,
            silence_window: 7,
        }
    }
}

impl EngineConfig {
    /// Whether `count` zero days within the window is anomalous
    pub fn is_anomalous(&self, count: usize) -> bool {
        self.recent_zero_threshold > 0 && count >= self.recent_zero_threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    New,
    Old,
    Unknown,
}

impl CustomerType {
    /// `new` strictly inside the window, `old` otherwise, `unknown` without a registration
    pub fn classify(
        register_time: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        new_customer_days: i64,
    ) -> Self {
        match register_time {
            Some(t) if now - t < Duration::days(new_customer_days) => CustomerType::New,
            Some(_) => CustomerType::Old,
            None => CustomerType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerType::New => "new",
            CustomerType::Old => "old",
            CustomerType::Unknown => "unknown",
        }
    }
}

/// Defaults, then system tags, then user tags; first occurrence wins
pub fn merge_tags<'a>(groups: impl IntoIterator<Item = &'a [String]>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for group in groups {
        for tag in group {
            if !merged.contains(tag) {
                merged.push(tag.clone());
            }
        }
    }
    merged
}

/// Sort key for tenants within a partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rank {
    pub anomalous: bool,
    pub recent_zero_days: usize,
    pub magnitude: i64,
    pub tenant_id: i64,
}

impl Rank {
    pub fn new(tags: &[String], recent_zero_days: usize, magnitude: i64, tenant_id: i64) -> Self {
        Self {
            anomalous: tags.iter().any(|t| is_anomaly_tag(t)),
            recent_zero_days,
            magnitude: magnitude.saturating_abs(),
            tenant_id,
        }
    }

    /// Anomalous first, then more zero days, then larger magnitude, then tenant id
    pub fn cmp_priority(&self, other: &Self) -> Ordering {
        other
            .anomalous
            .cmp(&self.anomalous)
            .then_with(|| other.recent_zero_days.cmp(&self.recent_zero_days))
            .then_with(|| other.magnitude.cmp(&self.magnitude))
            .then_with(|| self.tenant_id.cmp(&other.tenant_id))
    }
}
