//! Integration tests for the read endpoints, CORS and the dashboard fallback
//!
//! The warehouse is an in-memory backend answering by SQL marker; the store is
//! in memory with the clock pinned to 2025-01-30.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::{Duration, NaiveDate};
use serde_json::{Value, json};
use tower::ServiceExt;

use drift_analytics::{AttributionAggregator, DivergenceEngine, EngineConfig};
use drift_api::{AppState, build_router};
use drift_query::{MemoryBackend, QueryExecutor, QueryResult};
use drift_sources::DataSources;
use drift_store::{CacheLayer, DefaultTags, FixedClock, MemoryStore, TagStore};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    day(2025, 1, 30)
}

struct TestApp {
    backend: Arc<MemoryBackend>,
    state: AppState,
}

impl TestApp {
    fn new() -> Self {
        let clock = FixedClock::at_date(today());
        let store = Arc::new(MemoryStore::with_clock(Arc::new(clock.clone())));
        let cache = Arc::new(CacheLayer::new(store.clone(), Arc::new(clock.clone())));
        let tags = TagStore::new(store, Arc::new(clock.clone()), DefaultTags::empty());
        let backend = Arc::new(MemoryBackend::new());
        let sources = DataSources::new(QueryExecutor::from_arc(backend.clone()), cache.clone());

        let engine = DivergenceEngine::new(
            sources.clone(),
            tags.clone(),
            cache.clone(),
            Arc::new(clock.clone()),
            EngineConfig::default(),
        );
        let aggregator = AttributionAggregator::new(
            sources,
            tags.clone(),
            Arc::new(clock),
            EngineConfig::default(),
        );

        Self {
            backend,
            state: AppState::new(engine, aggregator, tags, cache),
        }
    }

    fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    fn tenants(&self, ids: &[i64]) {
        let rows = ids
            .iter()
            .map(|id| {
                json!({
                    "tenant_id": id,
                    "main_client_name": format!("tenant {}", id),
                    "register_time": "2023-06-01 00:00:00",
                })
            })
            .collect();
        self.backend
            .respond("non_testing_tenants", QueryResult::from_json_rows(rows));
    }

    fn api_rows(&self, rows: &[(i64, NaiveDate, i64)]) {
        let rows = rows
            .iter()
            .map(|(t, d, v)| json!({"tenant_id": t, "raw_date": d.to_string(), "ad_spend": v}))
            .collect();
        self.backend
            .respond("integration_api_data_view", QueryResult::from_json_rows(rows));
    }

    fn warehouse_rows(&self, rows: &[(i64, NaiveDate, i64)]) {
        let rows = rows
            .iter()
            .map(|(t, d, v)| json!({"tenant_id": t, "event_date": d.to_string(), "value": v}))
            .collect();
        self.backend.respond(
            "sum(ad_spend) as bigint) as value",
            QueryResult::from_json_rows(rows),
        );
    }

    fn attribution_rows(&self, rows: &[(i64, NaiveDate, &str, i64)]) {
        let rows = rows
            .iter()
            .map(|(t, d, p, v)| {
                json!({"tenant_id": t, "raw_date": d.to_string(), "ads_platform": p, "data": v})
            })
            .collect();
        self.backend
            .respond("attr_orders", QueryResult::from_json_rows(rows));
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Operations
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let response = app.router().oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({"status": "ok", "message": "data divergence service is running"})
    );
}

#[tokio::test]
async fn test_preflight_returns_204_with_cors_headers() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/tags")
        .header(header::ORIGIN, "http://dashboard.local")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_cors_on_regular_responses() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://dashboard.local")
        .body(Body::empty())
        .unwrap();

    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_dashboard_fallback() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>dashboard</html>").unwrap();
    std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();

    let app = TestApp::new();
    let router = build_router(app.state.clone().with_static_dir(dir.path()));

    let response = router.clone().oneshot(get("/tenants/42")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"<html>dashboard</html>");

    let response = router.clone().oneshot(get("/app.js")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // unknown API paths stay JSON 404s
    let response = router.oneshot(get("/api/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

// =============================================================================
// Alter data
// =============================================================================

#[tokio::test]
async fn test_alter_data_requires_known_platform() {
    let app = TestApp::new();

    for uri in [
        "/api/alter-data",
        "/api/alter-data?platform=",
        "/api/alter-data?platform=myspace",
        "/api/alter-data?platform=googleAds&tenantId=0",
        "/api/alter-data?platform=googleAds&needRefresh=maybe",
    ] {
        let response = app.router().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        let body = body_json(response).await;
        assert_eq!(body["success"], false, "{}", uri);
        assert!(body["message"].is_string(), "{}", uri);
    }
    assert_eq!(app.backend.execution_count(), 0);
}

#[tokio::test]
async fn test_alter_data_report() {
    let app = TestApp::new();
    app.tenants(&[1001]);
    app.api_rows(&[(1001, today(), 100), (1001, today() - Duration::days(1), 80)]);
    app.warehouse_rows(&[(1001, today(), 90), (1001, today() - Duration::days(2), 50)]);

    let response = app
        .router()
        .oneshot(get("/api/alter-data?platform=googleAds&needRefresh=true"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["global_tags"], json!([]));

    let data = &body["data"];
    assert_eq!(data["data_type"], "dual_source");
    assert_eq!(data["new_tenants"], json!([]));

    let tenant = &data["old_tenants"][0];
    assert_eq!(tenant["tenant_id"], 1001);
    assert_eq!(tenant["last_30_day_diff"], 40);
    assert_eq!(tenant["customer_type"], "old");
    assert_eq!(tenant["tags"], json!(["err_归因缺失"]));
    assert_eq!(tenant["missing_data_days"], 1);
    assert_eq!(tenant["has_missing_data"], false);
    assert_eq!(tenant["has_noise_data"], false);

    let sequence = tenant["date_sequence"].as_array().unwrap();
    assert_eq!(sequence.len(), 90);
    assert_eq!(
        sequence[89],
        json!({
            "date": "2025-01-30",
            "api_data": 100,
            "data": 90,
            "is_missing": false,
            "is_noise": false
        })
    );
    assert_eq!(sequence[88]["is_missing"], true);
}

#[tokio::test]
async fn test_alter_data_single_tenant_and_global_tags() {
    let app = TestApp::new();
    app.tenants(&[1, 2]);
    app.api_rows(&[(1, today(), 5), (2, today(), 5)]);
    app.warehouse_rows(&[(1, today(), 5), (2, today(), 5)]);
    app.state.tags.add(2, "googleAds", "watch").await.unwrap();

    let response = app
        .router()
        .oneshot(get("/api/alter-data?platform=googleAds&tenantId=2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let old = body["data"]["old_tenants"].as_array().unwrap();
    assert_eq!(old.len(), 1);
    assert_eq!(old[0]["tenant_id"], 2);
    assert_eq!(old[0]["tags"], json!(["watch"]));
    assert_eq!(body["global_tags"], json!(["watch"]));
    app.state.tags.settle().await;
}

#[tokio::test]
async fn test_upstream_failure_is_500_without_detail() {
    let app = TestApp::new();
    app.backend.fail_with("Access denied for user 'reader'@'10.0.0.7'");

    let response = app
        .router()
        .oneshot(get("/api/alter-data?platform=googleAds"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(!body["message"].as_str().unwrap().contains("10.0.0.7"));
}

#[tokio::test]
async fn test_remove_data_shows_in_report() {
    let app = TestApp::new();
    app.tenants(&[7]);
    app.api_rows(&[(7, today(), 3)]);
    app.warehouse_rows(&[(7, today(), 3)]);

    let response = app
        .router()
        .oneshot(json_request(
            Method::POST,
            "/api/remove-data",
            json!({"tenant_id": 7, "platform": "googleAds", "values": {"2025-01-30": 2}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["days"], 1);

    let response = app
        .router()
        .oneshot(get("/api/alter-data?platform=googleAds"))
        .await
        .unwrap();
    let body = body_json(response).await;
    let sequence = body["data"]["old_tenants"][0]["date_sequence"]
        .as_array()
        .unwrap();
    assert_eq!(sequence[89]["remove_data"], 2);
    assert!(sequence[88].get("remove_data").is_none());
}

#[tokio::test]
async fn test_cache_invalidation_refetches_on_next_read() {
    let app = TestApp::new();
    app.tenants(&[1]);
    app.api_rows(&[(1, today(), 10)]);
    app.warehouse_rows(&[(1, today(), 10)]);

    app.router()
        .oneshot(get("/api/alter-data?platform=googleAds"))
        .await
        .unwrap();
    let before = app.backend.execution_count();

    let response = app
        .router()
        .oneshot(json_request(
            Method::DELETE,
            "/api/alter-data/cache?platform=googleAds",
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "cache invalidated");
    assert_eq!(body["data"], json!({"platform": "googleAds", "dropped": 2}));
    assert_eq!(app.backend.execution_count(), before);

    app.api_rows(&[(1, today(), 70)]);
    let response = app
        .router()
        .oneshot(get("/api/alter-data?platform=googleAds"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"]["old_tenants"][0]["date_sequence"][89]["api_data"], 70);

    let response = app
        .router()
        .oneshot(json_request(
            Method::DELETE,
            "/api/alter-data/cache?platform=myspace",
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_remove_data_validation() {
    let app = TestApp::new();
    for body in [
        json!({"tenant_id": 0, "platform": "googleAds", "values": {}}),
        json!({"tenant_id": 1, "platform": "myspace", "values": {}}),
        json!({"tenant_id": 1, "platform": "googleAds", "values": {"yesterday": 1}}),
        json!({"platform": "googleAds"}),
    ] {
        let response = app
            .router()
            .oneshot(json_request(Method::POST, "/api/remove-data", body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", body);
    }
}

// =============================================================================
// Attribution
// =============================================================================

#[tokio::test]
async fn test_attribution_endpoints() {
    let app = TestApp::new();
    app.tenants(&[1, 2]);
    app.attribution_rows(&[
        (1, today(), "Google", 4),
        (1, today() - Duration::days(1), "Meta", 2),
        (2, today(), "Google", 1),
    ]);

    let response = app.router().oneshot(get("/api/attribution")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["tenants"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["platforms"], json!(["Google", "Meta"]));

    let response = app
        .router()
        .oneshot(get("/api/attribution/1?needRefresh=true"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let tenants = body["data"]["tenants"].as_array().unwrap();
    assert_eq!(tenants.len(), 1);
    assert_eq!(tenants[0]["tenant_id"], 1);

    let response = app
        .router()
        .oneshot(get("/api/attribution-data/grouped"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["new_customers"], json!([]));
    assert_eq!(body["data"]["old_customers"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_attribution_tenant_must_be_positive() {
    let app = TestApp::new();
    for uri in ["/api/attribution/0", "/api/attribution/abc"] {
        let response = app.router().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
}
