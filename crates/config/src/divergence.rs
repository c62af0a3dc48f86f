//! Divergence thresholds

use serde::Deserialize;

/// Classification and anomaly thresholds
///
/// # Example
///
/// ```toml
/// [divergence]
/// new_customer_days = 30
/// recent_zero_window = 3
/// recent_zero_threshold = 1
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DivergenceConfig {
    /// Tenants registered less than this many days ago are new
    pub new_customer_days: i64,
    /// Trailing days scanned for missing data
    pub recent_zero_window: usize,
    /// Missing days within the window that flag the tenant
    pub recent_zero_threshold: usize,
}

impl Default for DivergenceConfig {
    fn default() -> Self {
        Self {
            new_customer_days: 30,
            recent_zero_window: 3,
            recent_zero_threshold: 1,
        }
    }
}
