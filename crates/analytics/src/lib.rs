//! Drift Analytics - divergence and attribution views
//!
//! Both engines read through the cached sources, lay each tenant's data over
//! the same 90-day axis ending today and merge system anomaly tags with the
//! tenant's default and user tags.
//!
//! - [`DivergenceEngine`]: vendor-reported vs pipeline-computed, per platform
//! - [`AttributionAggregator`]: attributed orders pivoted by ad platform
//!
//! # Usage
//!
//! ```ignore
//! let engine = DivergenceEngine::new(sources, tags, cache, clock, EngineConfig::default());
//! let platform = Platform::lookup("googleAds")?;
//! let report = engine.alter_data(false, &platform, None).await?;
//! ```

pub mod attribution;
pub mod axis;
pub mod divergence;
pub mod error;
pub mod quality;
pub mod rules;

#[cfg(test)]
mod testkit;

#[cfg(test)]
mod quality_test;

pub use attribution::{
    AttributionAggregator, AttributionDateEntry, AttributionReport, AttributionTenantView,
    GroupedAttribution, PlatformTotal,
};
pub use axis::{AXIS_DAYS, DIFF_WINDOW, DateAxis};
pub use divergence::{AlterDataReport, DateEntry, DivergenceEngine, TenantView};
pub use error::{AnalyticsError, Result};
pub use quality::{NoiseKind, QualitySummary};
pub use rules::{
    ATTRIBUTION_PLATFORM, CustomerType, EngineConfig, MISSING_ATTRIBUTION_TAG, MISSING_DATA_TAG,
    SILENT_WEEK_TAG,
};
