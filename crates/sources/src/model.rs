//! Rows exchanged between sources and the engines
//!
//! Warehouse rows are decoded leniently: day columns may arrive as `DATE`,
//! `VARCHAR` or `DATETIME`; measures as integers, decimals or floats.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One tenant's value for one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyMetric {
    pub tenant_id: i64,
    pub date: NaiveDate,
    pub value: i64,
}

impl DailyMetric {
    pub fn new(tenant_id: i64, date: NaiveDate, value: i64) -> Self {
        Self {
            tenant_id,
            date,
            value,
        }
    }
}

/// A daily value broken down by ad platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformMetric {
    pub tenant_id: i64,
    pub date: NaiveDate,
    pub platform: String,
    pub value: i64,
}

/// A tenant from the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub tenant_id: i64,
    pub name: String,
    pub register_time: DateTime<Utc>,
}

/// A platform a tenant has connected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantConnection {
    pub tenant_id: i64,
    pub platform: String,
}

// =============================================================================
// Warehouse rows
// =============================================================================

/// Vendor-reported daily aggregate
#[derive(Debug, Deserialize)]
pub(crate) struct ApiRow {
    pub tenant_id: i64,
    #[serde(deserialize_with = "calendar_day")]
    pub raw_date: NaiveDate,
    #[serde(deserialize_with = "measure")]
    pub ad_spend: i64,
}

/// Pipeline-computed daily aggregate
#[derive(Debug, Deserialize)]
pub(crate) struct OverviewRow {
    pub tenant_id: i64,
    #[serde(deserialize_with = "calendar_day")]
    pub event_date: NaiveDate,
    #[serde(deserialize_with = "measure")]
    pub value: i64,
}

/// Single-source daily aggregate
#[derive(Debug, Deserialize)]
pub(crate) struct WmRow {
    pub tenant_id: i64,
    #[serde(deserialize_with = "calendar_day")]
    pub raw_date: NaiveDate,
    #[serde(deserialize_with = "measure")]
    pub data: i64,
}

/// Attributed orders per ad platform
#[derive(Debug, Deserialize)]
pub(crate) struct AttributionRow {
    pub tenant_id: i64,
    #[serde(deserialize_with = "calendar_day")]
    pub raw_date: NaiveDate,
    pub ads_platform: String,
    #[serde(deserialize_with = "measure")]
    pub data: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TenantRow {
    pub tenant_id: i64,
    #[serde(default)]
    pub main_client_name: Option<String>,
    #[serde(deserialize_with = "timestamp")]
    pub register_time: DateTime<Utc>,
}

impl From<ApiRow> for DailyMetric {
    fn from(row: ApiRow) -> Self {
        DailyMetric::new(row.tenant_id, row.raw_date, row.ad_spend)
    }
}

impl From<OverviewRow> for DailyMetric {
    fn from(row: OverviewRow) -> Self {
        DailyMetric::new(row.tenant_id, row.event_date, row.value)
    }
}

impl From<WmRow> for DailyMetric {
    fn from(row: WmRow) -> Self {
        DailyMetric::new(row.tenant_id, row.raw_date, row.data)
    }
}

impl From<AttributionRow> for PlatformMetric {
    fn from(row: AttributionRow) -> Self {
        PlatformMetric {
            tenant_id: row.tenant_id,
            date: row.raw_date,
            platform: row.ads_platform,
            value: row.data,
        }
    }
}

impl From<TenantRow> for Tenant {
    fn from(row: TenantRow) -> Self {
        Tenant {
            tenant_id: row.tenant_id,
            name: row.main_client_name.unwrap_or_default(),
            register_time: row.register_time,
        }
    }
}

// =============================================================================
// Lenient decoders
// =============================================================================

/// Parse the leading `YYYY-MM-DD` of a day or timestamp string
pub fn parse_calendar_day(text: &str) -> Option<NaiveDate> {
    let head = text.get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Parse a timestamp in RFC 3339, `YYYY-MM-DD[T ]HH:MM:SS` (taken as UTC) or bare-date form
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn calendar_day<'de, D: Deserializer<'de>>(de: D) -> Result<NaiveDate, D::Error> {
    let text = String::deserialize(de)?;
    parse_calendar_day(&text)
        .ok_or_else(|| serde::de::Error::custom(format!("not a calendar day: {:?}", text)))
}

fn timestamp<'de, D: Deserializer<'de>>(de: D) -> Result<DateTime<Utc>, D::Error> {
    let text = String::deserialize(de)?;
    parse_timestamp(&text)
        .ok_or_else(|| serde::de::Error::custom(format!("not a timestamp: {:?}", text)))
}

/// Integer measure; null is zero, decimals are rounded
fn measure<'de, D: Deserializer<'de>>(de: D) -> Result<i64, D::Error> {
    match serde_json::Value::deserialize(de)? {
        serde_json::Value::Null => Ok(0),
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .ok_or_else(|| serde::de::Error::custom(format!("measure out of range: {}", n))),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(|f| f.round() as i64)
            .map_err(|_| serde::de::Error::custom(format!("not a number: {:?}", s))),
        other => Err(serde::de::Error::custom(format!(
            "unexpected measure: {}",
            other
        ))),
    }
}
