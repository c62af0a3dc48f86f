//! Platform registry
//!
//! The dashboard names platforms the way vendor connectors do (`googleAds`);
//! the warehouse's attributed tables use canonical ad-platform names
//! (`Google`). Some platforms have no vendor-reported source and are compared
//! against nothing ("wm only").

use serde::Serialize;

use crate::error::{Result, SourceError};
use crate::sql;

/// How a platform's divergence is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Vendor API aggregates against pipeline aggregates
    DualSource,
    /// Pipeline aggregates only
    WmOnly,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DualSource => "dual_source",
            Self::WmOnly => "wm_only",
        }
    }
}

/// Which warehouse query serves the pipeline side of a platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarehouseQuery {
    /// Attributed ad spend filtered by canonical platform
    AttributedSpend,
    /// Post-purchase survey responses (Knocommerce)
    SurveyResponses,
    /// A fixed single-source query
    Single(&'static str),
}

/// A registered platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// External (connector) name
    pub external: &'static str,
    /// Warehouse canonical name
    pub canonical: &'static str,
    pub data_type: DataType,
    pub warehouse: WarehouseQuery,
}

const fn dual(external: &'static str, canonical: &'static str) -> Platform {
    Platform {
        external,
        canonical,
        data_type: DataType::DualSource,
        warehouse: WarehouseQuery::AttributedSpend,
    }
}

const fn wm_only(external: &'static str, query: &'static str) -> Platform {
    Platform {
        external,
        canonical: external,
        data_type: DataType::WmOnly,
        warehouse: WarehouseQuery::Single(query),
    }
}

const PLATFORMS: &[Platform] = &[
    dual("googleAds", "Google"),
    dual("facebookMarketing", "Facebook"),
    dual("tiktokMarketing", "Tiktok"),
    dual("snapchatMarketing", "Snapchat"),
    dual("pinterest", "Pinterest"),
    dual("applovin", "Applovin"),
    dual("bingAds", "Bing"),
    Platform {
        external: "knocommerce",
        canonical: "knocommerce",
        data_type: DataType::DualSource,
        warehouse: WarehouseQuery::SurveyResponses,
    },
    wm_only("amazonVendorPartner", sql::AMAZON_VENDOR_SHIPPED_UNITS),
    wm_only("fairing", sql::FAIRING_RESPONSES),
    wm_only("amazonAds", sql::AMAZON_ADS_SPEND),
    wm_only("applovinLog", sql::APPLOVIN_LOG_ORDERS),
    wm_only("shopify", sql::SHOPIFY_ORDERS),
];

/// Tenants whose `applovinLog` connection is not recorded in the warehouse
pub const APPLOVIN_LOG_TENANTS: &[i64] = &[150090];

impl Platform {
    /// Look up a platform by external name
    pub fn lookup(external: &str) -> Result<Platform> {
        PLATFORMS
            .iter()
            .find(|p| p.external == external)
            .copied()
            .ok_or_else(|| SourceError::UnknownPlatform(external.to_string()))
    }

    /// Every registered platform
    pub fn all() -> &'static [Platform] {
        PLATFORMS
    }

    pub fn is_wm_only(&self) -> bool {
        self.data_type == DataType::WmOnly
    }

    /// Tenants connected to this platform outside the connection table
    pub fn manual_connections(&self) -> &'static [i64] {
        match self.external {
            "applovinLog" => APPLOVIN_LOG_TENANTS,
            _ => &[],
        }
    }
}
