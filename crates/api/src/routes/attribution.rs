//! Attribution routes
//!
//! # Routes
//!
//! - `GET /api/attribution` - every tenant with attributed orders
//! - `GET /api/attribution/{tenantId}` - one tenant
//! - `GET /api/attribution-data/grouped` - new and old customers, unknown left out

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};

use drift_analytics::{AttributionReport, GroupedAttribution};

use crate::error::Result;
use crate::state::AppState;
use crate::types::{ApiResponse, RefreshParams, require_tenant_id};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/attribution", get(all_tenants))
        .route("/attribution/{tenant_id}", get(one_tenant))
        .route("/attribution-data/grouped", get(grouped))
}

type RefreshQuery = std::result::Result<Query<RefreshParams>, QueryRejection>;

async fn all_tenants(
    State(state): State<AppState>,
    params: RefreshQuery,
) -> Result<Json<ApiResponse<AttributionReport>>> {
    let Query(params) = params?;
    let report = state.attribution.all(params.need_refresh).await?;
    Ok(Json(ApiResponse::new(report)))
}

async fn one_tenant(
    State(state): State<AppState>,
    tenant_id: std::result::Result<Path<i64>, PathRejection>,
    params: RefreshQuery,
) -> Result<Json<ApiResponse<AttributionReport>>> {
    let Path(tenant_id) = tenant_id?;
    let tenant_id = require_tenant_id(tenant_id)?;
    let Query(params) = params?;

    let report = state
        .attribution
        .tenant(params.need_refresh, tenant_id)
        .await?;
    Ok(Json(ApiResponse::new(report)))
}

async fn grouped(
    State(state): State<AppState>,
    params: RefreshQuery,
) -> Result<Json<ApiResponse<GroupedAttribution>>> {
    let Query(params) = params?;
    let grouped = state.attribution.grouped(params.need_refresh).await?;
    Ok(Json(ApiResponse::new(grouped)))
}
