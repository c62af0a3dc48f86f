//! Divergence route
//!
//! # Routes
//!
//! - `GET /api/alter-data?platform=googleAds&needRefresh=false&tenantId=1001`
//! - `DELETE /api/alter-data/cache?platform=googleAds&tenantId=1001` - drop the
//!   cached source entries so the next read fetches, without fetching now

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use drift_analytics::AlterDataReport;
use drift_sources::Platform;

use crate::error::{ApiError, Result};
use crate::state::AppState;
use crate::types::{ApiResponse, require_tenant_id};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/alter-data", get(alter_data))
        .route("/alter-data/cache", delete(invalidate_cache))
}

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AlterDataParams {
    pub platform: Option<String>,
    #[serde(default, rename = "needRefresh")]
    pub need_refresh: bool,
    #[serde(rename = "tenantId")]
    pub tenant_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CacheInvalidated {
    pub platform: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<i64>,
    /// Cached entries that existed and were dropped
    pub dropped: usize,
}

#[derive(Debug, Serialize)]
pub struct AlterDataResponse {
    pub success: bool,
    pub data: AlterDataReport,
    /// Every tag in use on the platform, for the dashboard's filter
    pub global_tags: Vec<String>,
}

impl AlterDataParams {
    /// Registered platform and optional positive tenant
    fn target(&self) -> Result<(Platform, Option<i64>)> {
        let name = self
            .platform
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ApiError::validation("platform", "is required"))?;
        let platform = Platform::lookup(name)?;
        let tenant_id = self.tenant_id.map(require_tenant_id).transpose()?;
        Ok((platform, tenant_id))
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn alter_data(
    State(state): State<AppState>,
    params: std::result::Result<Query<AlterDataParams>, QueryRejection>,
) -> Result<Json<AlterDataResponse>> {
    let Query(params) = params?;
    let (platform, tenant_id) = params.target()?;

    let data = state
        .divergence
        .alter_data(params.need_refresh, &platform, tenant_id)
        .await?;
    let global_tags = state.tags.universe(platform.external).await?;

    Ok(Json(AlterDataResponse {
        success: true,
        data,
        global_tags,
    }))
}

async fn invalidate_cache(
    State(state): State<AppState>,
    params: std::result::Result<Query<AlterDataParams>, QueryRejection>,
) -> Result<Json<ApiResponse<CacheInvalidated>>> {
    let Query(params) = params?;
    let (platform, tenant_id) = params.target()?;

    let dropped = state.divergence.invalidate(&platform, tenant_id).await?;

    Ok(Json(
        ApiResponse::new(CacheInvalidated {
            platform: platform.external.to_string(),
            tenant_id,
            dropped,
        })
        .with_message("cache invalidated"),
    ))
}
