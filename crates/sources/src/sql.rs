//! Warehouse query templates
//!
//! Values are bound through `{{name}}` placeholders: `{{ads_platform}}`,
//! `{{raw_platform}}`, `{{tenant_id}}`. Day columns are cast to text so every
//! backend returns the same `YYYY-MM-DD` shape.

// =============================================================================
// Vendor-reported (api) side
// =============================================================================

pub const API_DATA: &str = r#"
select
    tenant_id,
    cast(raw_date as varchar) as raw_date,
    cast(sum(if(RAW_PLATFORM in ('knocommerce'), ORDERS, AD_SPEND) ) as bigint) as ad_spend
from
    platform_offline.integration_api_data_view
where RAW_PLATFORM = {{raw_platform}}
and RAW_DATE > utc_date() - interval 90 day
group by 1, 2
"#;

pub const API_DATA_FOR_TENANT: &str = r#"
select
    tenant_id,
    cast(raw_date as varchar) as raw_date,
    cast(sum(if(RAW_PLATFORM in ('knocommerce'), ORDERS, AD_SPEND) ) as bigint) as ad_spend
from
    platform_offline.integration_api_data_view
where RAW_PLATFORM = {{raw_platform}}
  and tenant_id = {{tenant_id}}
and RAW_DATE > utc_date() - interval 90 day
group by 1, 2
"#;

// =============================================================================
// Pipeline (warehouse) side
// =============================================================================

pub const OVERVIEW_DATA: &str = r#"
select
    tenant_id,
    cast(event_date as varchar) as event_date,
    cast(sum(ad_spend) as bigint) as value
from platform_offline.dws_view_analytics_ads_ad_level_metrics_attrs_latest
where event_date > utc_date() - interval 90 day
  and json_overlaps(attr_model_array, json_array(0, 3))
  and attr_enhanced in (1, 4)
  and ADS_PLATFORM = {{ads_platform}}
group by 1, 2
"#;

pub const OVERVIEW_DATA_FOR_TENANT: &str = r#"
select
    tenant_id,
    cast(event_date as varchar) as event_date,
    cast(sum(ad_spend) as bigint) as value
from platform_offline.dws_view_analytics_ads_ad_level_metrics_attrs_latest
where event_date > utc_date() - interval 90 day
  and json_overlaps(attr_model_array, json_array(0, 3))
  and attr_enhanced in (1, 4)
  and ADS_PLATFORM = {{ads_platform}}
  and tenant_id = {{tenant_id}}
group by 1, 2
"#;

pub const KNOCOMMERCE_RESPONSES: &str = r#"
select
  tenant_id,
  cast(date(response_provided_at) as varchar) as event_date,
  count(order_id) as value
  from platform_offline.dwd_view_post_survey_response_v20250910jz
where platform = 'knocommerce'
and response_provided_at > utc_timestamp() - interval 90 day
group by 1, 2;
"#;

pub const KNOCOMMERCE_RESPONSES_FOR_TENANT: &str = r#"
select
  tenant_id,
  cast(date(response_provided_at) as varchar) as event_date,
  count(order_id) as value
  from platform_offline.dwd_view_post_survey_response_v20250910jz
where platform = 'knocommerce'
  and tenant_id = {{tenant_id}}
and response_provided_at > utc_timestamp() - interval 90 day
group by 1, 2;
"#;

// =============================================================================
// Single-source platforms
// =============================================================================

pub const AMAZON_VENDOR_SHIPPED_UNITS: &str = r#"
select
	tenant_id,
	cast(stat_date as varchar) as raw_date,
	sum(shipped_units) as data
from
	platform_offline.amazon_vendor_zip_code_daily_report
where stat_date > utc_date() - interval 90 day
group by 1, 2
"#;

pub const FAIRING_RESPONSES: &str = r#"
select
    tenant_id,
    cast(date(response_provided_at) as varchar) as raw_date,
    count(1) as data
from
    platform_offline.dwd_view_post_survey_response_latest
where response_provided_at > utc_timestamp() - interval 90 day
group by 1, 2
"#;

pub const AMAZON_ADS_SPEND: &str = r#"select
    tenant_id,
    cast(event_date as varchar) as raw_date,
    cast(sum(ad_spend) as bigint) as data
from platform_offline.dws_view_amazon_ads_country_level_metrics_latest
where EVENT_DATE > utc_date() - interval 90 day
group by 1, 2"#;

pub const APPLOVIN_LOG_ORDERS: &str = r#"
select
	tenant_id,
	cast(date(src_event_time) as varchar) as raw_date,
	count(1) as data
from
	platform_offline.dwd_attr_3p_ref_order_join_source_v20250721jz
where src_source = 'Applovin'
  and date(src_event_time) > utc_date() - interval 90 day
group by 1, 2
"#;

pub const SHOPIFY_ORDERS: &str = r#"
select
    tenant_id,
    cast(date(order_create_time) as varchar) as raw_date,
    count(order_id) as data
from
    platform_offline.dwd_view_portrait_order_dim_shopify_latest
where order_create_time > utc_date() - interval 90 day
group by 1, 2"#;

// =============================================================================
// Attribution
// =============================================================================

pub const ATTRIBUTION: &str = r#"
select tenant_id,
       cast(event_date as varchar)     as raw_date,
       ads_platform,
       sum(attr_orders + extra_orders) as data
from platform_offline.dws_view_analytics_ads_ad_level_metrics_attrs_latest
where (event_date >= utc_date() - interval 60 day)
  and json_overlaps(attr_model_array, json_array(0, 3))
  and attr_enhanced in (1, 4)
group by 1, 2, 3
"#;

pub const ATTRIBUTION_FOR_TENANT: &str = r#"
select tenant_id,
       cast(event_date as varchar)     as raw_date,
       ads_platform,
       sum(attr_orders + extra_orders) as data
from platform_offline.dws_view_analytics_ads_ad_level_metrics_attrs_latest
where (event_date >= utc_date() - interval 60 day)
  and json_overlaps(attr_model_array, json_array(0, 3))
  and attr_enhanced in (1, 4)
  and tenant_id = {{tenant_id}}
group by 1, 2, 3
"#;

// =============================================================================
// Tenant directory
// =============================================================================

pub const ALL_TENANTS: &str = r#"
select
    tenant_id,
    main_client_name,
    register_time
from
    platform_offline.dwd_view_analytics_non_testing_tenants
"#;

pub const TENANT_PLATFORMS: &str = r#"
select tenant_id,
       platform
from platform_offline.account_connection_unnest_account_level_with_no_testing
group by 1, 2
"#;
