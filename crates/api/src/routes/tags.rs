//! Tag routes
//!
//! # Routes
//!
//! - `POST /api/tags` - add or renew a tag for 30 days
//! - `DELETE /api/tags` - remove a tag; removing an absent tag succeeds
//! - `GET /api/tags/{tenant_id}/{platform}` - defaults plus live user tags
//! - `GET /api/tags/{platform}` - the platform's tag universe
//!
//! Mutations answer with the universe as it stands after the write. Platforms
//! are registry names or `attribution`; anything else is `UNKNOWN_PLATFORM`.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use drift_store::sort_tags;

use crate::error::Result;
use crate::state::AppState;
use crate::types::{ApiResponse, TagRequest, require_tag_platform, require_tenant_id};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tags", post(add_tag).delete(remove_tag))
        .route("/tags/{platform}", get(platform_tags))
        .route("/tags/{tenant_id}/{platform}", get(tenant_tags))
}

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct TagChange {
    pub tenant_id: i64,
    pub platform: String,
    pub tag_name: String,
    /// Universe after the change
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TenantTags {
    pub tenant_id: i64,
    pub platform: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PlatformTags {
    pub platform: String,
    pub tags: Vec<String>,
}

// =============================================================================
// Handlers
// =============================================================================

async fn add_tag(
    State(state): State<AppState>,
    body: std::result::Result<Json<TagRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<TagChange>>> {
    let Json(req) = body?;
    let (tenant_id, platform, tag_name) = req.validate()?;

    state.tags.add(tenant_id, platform, tag_name).await?;
    let tags = state.tags.universe(platform).await?;

    Ok(Json(
        ApiResponse::new(TagChange {
            tenant_id,
            platform: platform.to_string(),
            tag_name: tag_name.to_string(),
            tags,
        })
        .with_message("tag added"),
    ))
}

async fn remove_tag(
    State(state): State<AppState>,
    body: std::result::Result<Json<TagRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<TagChange>>> {
    let Json(req) = body?;
    let (tenant_id, platform, tag_name) = req.validate()?;

    state.tags.remove(tenant_id, platform, tag_name).await?;
    let tags = state.tags.universe(platform).await?;

    Ok(Json(
        ApiResponse::new(TagChange {
            tenant_id,
            platform: platform.to_string(),
            tag_name: tag_name.to_string(),
            tags,
        })
        .with_message("tag removed"),
    ))
}

async fn tenant_tags(
    State(state): State<AppState>,
    path: std::result::Result<Path<(i64, String)>, PathRejection>,
) -> Result<Json<ApiResponse<TenantTags>>> {
    let Path((tenant_id, platform)) = path?;
    let tenant_id = require_tenant_id(tenant_id)?;
    let platform = require_tag_platform(&platform)?;

    let mut tags = state.tags.tags_for(tenant_id, platform).await?;
    sort_tags(&mut tags);

    Ok(Json(ApiResponse::new(TenantTags {
        tenant_id,
        platform: platform.to_string(),
        tags,
    })))
}

async fn platform_tags(
    State(state): State<AppState>,
    path: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<ApiResponse<PlatformTags>>> {
    let Path(platform) = path?;
    let platform = require_tag_platform(&platform)?;
    let tags = state.tags.universe(platform).await?;

    Ok(Json(ApiResponse::new(PlatformTags {
        platform: platform.to_string(),
        tags,
    })))
}
