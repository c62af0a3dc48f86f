//! Tests for the cached adapters

use super::*;
use chrono::NaiveDate;
use drift_query::{MemoryBackend, QueryResult};
use drift_store::{Clock, FixedClock, KvStore, MemoryStore};
use serde_json::json;

const API_TABLE: &str = "integration_api_data_view";
const OVERVIEW_MARKER: &str = "sum(ad_spend) as bigint) as value";
const ATTRIBUTION_MARKER: &str = "attr_orders";
const SURVEY_TABLE: &str = "post_survey_response_v20250910jz";
const FAIRING_TABLE: &str = "post_survey_response_latest";

struct Fixture {
    backend: Arc<MemoryBackend>,
    store: Arc<MemoryStore>,
    clock: FixedClock,
    executor: QueryExecutor,
    cache: Arc<CacheLayer>,
}

fn fixture() -> Fixture {
    let clock = FixedClock::at_date(day(30));
    let store = Arc::new(MemoryStore::with_clock(Arc::new(clock.clone())));
    let cache = Arc::new(CacheLayer::new(store.clone(), Arc::new(clock.clone())));
    let backend = Arc::new(MemoryBackend::new());
    Fixture {
        executor: QueryExecutor::from_arc(backend.clone()),
        backend,
        store,
        clock,
        cache,
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
}

fn google() -> Platform {
    Platform::lookup("googleAds").unwrap()
}

// =============================================================================
// Vendor-reported
// =============================================================================

#[tokio::test]
async fn test_api_fetch_decodes_and_caches() {
    let f = fixture();
    f.backend.respond(
        API_TABLE,
        QueryResult::from_json_rows(vec![
            json!({"tenant_id": 1001, "raw_date": "2025-01-29", "ad_spend": 100}),
            json!({"tenant_id": 1001, "raw_date": "2025-01-30", "ad_spend": "50.0"}),
        ]),
    );
    let source = ApiDataSource::new(f.executor.clone(), f.cache.clone());

    let first = source.fetch(false, &google(), None).await.unwrap();
    assert!(!first.from_cache);
    assert_eq!(
        first.data,
        vec![
            DailyMetric::new(1001, day(29), 100),
            DailyMetric::new(1001, day(30), 50),
        ]
    );
    assert_eq!(first.create_time, f.clock.now());

    let second = source.fetch(false, &google(), None).await.unwrap();
    assert!(second.from_cache);
    assert_eq!(second.data, first.data);
    assert_eq!(f.backend.execution_count(), 1);
    assert!(f.store.exists("bcache:apidata_googleAds").await.unwrap());
}

#[tokio::test]
async fn test_api_binds_external_name() {
    let f = fixture();
    let source = ApiDataSource::new(f.executor.clone(), f.cache.clone());
    source.fetch(false, &google(), None).await.unwrap();

    let executed = f.backend.executed();
    assert_eq!(
        executed[0].args,
        vec![drift_query::ParamValue::Text("googleAds".into())]
    );
}

#[tokio::test]
async fn test_refresh_refetches_and_restamps() {
    let f = fixture();
    let source = ApiDataSource::new(f.executor.clone(), f.cache.clone());
    let first = source.fetch(false, &google(), None).await.unwrap();

    f.clock.advance(chrono::Duration::minutes(5));
    let second = source.fetch(true, &google(), None).await.unwrap();
    assert!(!second.from_cache);
    assert!(second.create_time > first.create_time);
    assert_eq!(f.backend.execution_count(), 2);
}

#[tokio::test]
async fn test_empty_result_is_cached() {
    let f = fixture();
    let source = ApiDataSource::new(f.executor.clone(), f.cache.clone());
    let first = source.fetch(false, &google(), None).await.unwrap();
    assert!(first.data.is_empty());

    let second = source.fetch(false, &google(), None).await.unwrap();
    assert!(second.from_cache);
    assert_eq!(f.backend.execution_count(), 1);
}

#[tokio::test]
async fn test_tenant_fetch_uses_own_key() {
    let f = fixture();
    let source = ApiDataSource::new(f.executor.clone(), f.cache.clone());
    source.fetch(false, &google(), Some(7)).await.unwrap();
    assert!(f.store.exists("bcache:apidata_googleAds_7").await.unwrap());
    assert!(!f.store.exists("bcache:apidata_googleAds").await.unwrap());

    let executed = f.backend.executed();
    assert!(executed[0].args.contains(&drift_query::ParamValue::Int(7)));
}

#[tokio::test]
async fn test_invalidate_drops_only_its_entry() {
    let f = fixture();
    let source = ApiDataSource::new(f.executor.clone(), f.cache.clone());
    source.fetch(false, &google(), None).await.unwrap();
    source.fetch(false, &google(), Some(7)).await.unwrap();

    assert!(source.invalidate(&google(), Some(7)).await.unwrap());
    assert!(!source.invalidate(&google(), Some(7)).await.unwrap());
    assert!(!f.store.exists("bcache:apidata_googleAds_7").await.unwrap());
    assert!(f.store.exists("bcache:apidata_googleAds").await.unwrap());

    let refetched = source.fetch(false, &google(), Some(7)).await.unwrap();
    assert!(!refetched.from_cache);
    assert_eq!(f.backend.execution_count(), 3);
}

#[tokio::test]
async fn test_failure_leaves_cache_untouched() {
    let f = fixture();
    let source = ApiDataSource::new(f.executor.clone(), f.cache.clone());
    f.backend.fail_with("warehouse down");

    let err = source.fetch(false, &google(), None).await.unwrap_err();
    assert!(matches!(err, SourceError::Query(_)));
    assert!(!f.store.exists("bcache:apidata_googleAds").await.unwrap());

    f.backend.recover();
    assert!(source.fetch(false, &google(), None).await.is_ok());
}

#[tokio::test]
async fn test_refresh_failure_keeps_previous_entry() {
    let f = fixture();
    let source = ApiDataSource::new(f.executor.clone(), f.cache.clone());
    let first = source.fetch(false, &google(), None).await.unwrap();

    f.backend.fail_with("warehouse down");
    assert!(source.fetch(true, &google(), None).await.is_err());

    f.backend.recover();
    let again = source.fetch(false, &google(), None).await.unwrap();
    assert!(again.from_cache);
    assert_eq!(again.create_time, first.create_time);
}

// =============================================================================
// Pipeline-computed
// =============================================================================

#[tokio::test]
async fn test_warehouse_keyed_by_canonical() {
    let f = fixture();
    f.backend.respond(
        OVERVIEW_MARKER,
        QueryResult::from_json_rows(vec![json!({
            "tenant_id": 1001, "event_date": "2025-01-30", "value": 250
        })]),
    );
    let source = WarehouseSource::new(f.executor.clone(), f.cache.clone());
    let fetched = source.fetch(false, &google(), None).await.unwrap();

    assert_eq!(fetched.data, vec![DailyMetric::new(1001, day(30), 250)]);
    assert!(f.store.exists("bcache:overview_Google").await.unwrap());
    assert_eq!(
        f.backend.executed()[0].args,
        vec![drift_query::ParamValue::Text("Google".into())]
    );
}

#[tokio::test]
async fn test_survey_platform_uses_response_query() {
    let f = fixture();
    f.backend.respond(
        SURVEY_TABLE,
        QueryResult::from_json_rows(vec![json!({
            "tenant_id": 5, "event_date": "2025-01-28", "value": 3
        })]),
    );
    let source = WarehouseSource::new(f.executor.clone(), f.cache.clone());
    let kno = Platform::lookup("knocommerce").unwrap();

    let fetched = source.fetch(false, &kno, Some(5)).await.unwrap();
    assert_eq!(fetched.data, vec![DailyMetric::new(5, day(28), 3)]);
    assert!(f.backend.executed()[0].sql.contains(SURVEY_TABLE));
}

// =============================================================================
// Single-source
// =============================================================================

#[tokio::test]
async fn test_wm_only_filters_tenant_from_shared_entry() {
    let f = fixture();
    f.backend.respond(
        FAIRING_TABLE,
        QueryResult::from_json_rows(vec![
            json!({"tenant_id": 1, "raw_date": "2025-01-30", "data": 4}),
            json!({"tenant_id": 2, "raw_date": "2025-01-30", "data": 9}),
        ]),
    );
    let source = WmOnlySource::new(f.executor.clone(), f.cache.clone());
    let fairing = Platform::lookup("fairing").unwrap();

    let one = source.fetch(false, &fairing, Some(2)).await.unwrap();
    assert_eq!(one.data, vec![DailyMetric::new(2, day(30), 9)]);

    let all = source.fetch(false, &fairing, None).await.unwrap();
    assert!(all.from_cache);
    assert_eq!(all.data.len(), 2);
    assert_eq!(f.backend.execution_count(), 1);

    // A tenant-scoped invalidation drops the shared entry
    assert!(source.invalidate(&fairing, Some(2)).await.unwrap());
    assert!(!f.store.exists("bcache:wmdata_fairing").await.unwrap());
}

#[tokio::test]
async fn test_wm_only_rejects_dual_source_platform() {
    let f = fixture();
    let source = WmOnlySource::new(f.executor.clone(), f.cache.clone());
    let err = source.fetch(false, &google(), None).await.unwrap_err();
    assert!(matches!(err, SourceError::UnknownPlatform(_)));
    assert_eq!(f.backend.execution_count(), 0);
}

// =============================================================================
// Attribution
// =============================================================================

#[tokio::test]
async fn test_attribution_rows_and_keys() {
    let f = fixture();
    f.backend.respond(
        ATTRIBUTION_MARKER,
        QueryResult::from_json_rows(vec![
            json!({"tenant_id": 1, "raw_date": "2025-01-30", "ads_platform": "Google", "data": 10}),
            json!({"tenant_id": 1, "raw_date": "2025-01-30", "ads_platform": "Facebook", "data": 6}),
        ]),
    );
    let source = AttributionSource::new(f.executor.clone(), f.cache.clone());

    let all = source.fetch(false, None).await.unwrap();
    assert_eq!(all.data.len(), 2);
    assert_eq!(all.data[0].platform, "Google");
    assert!(f.store.exists("bcache:attribution_data").await.unwrap());

    source.fetch(false, Some(1)).await.unwrap();
    assert!(f.store.exists("bcache:attribution_data_1").await.unwrap());
}
