//! Remove-data route
//!
//! # Routes
//!
//! - `POST /api/remove-data` - replace the per-day side values for `(tenant, platform)`

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use drift_sources::Platform;

use crate::error::Result;
use crate::state::AppState;
use crate::types::{ApiResponse, RemoveDataRequest, require_platform, require_tenant_id};

pub fn routes() -> Router<AppState> {
    Router::new().route("/remove-data", post(save_remove_data))
}

#[derive(Debug, Serialize)]
pub struct RemoveDataSaved {
    pub tenant_id: i64,
    pub platform: String,
    pub days: usize,
}

async fn save_remove_data(
    State(state): State<AppState>,
    body: std::result::Result<Json<RemoveDataRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<RemoveDataSaved>>> {
    let Json(req) = body?;
    let tenant_id = require_tenant_id(req.tenant_id)?;
    // Keyed by the external name, the same one the divergence report reads
    let platform = Platform::lookup(require_platform(&req.platform)?)?;

    state
        .cache
        .save_remove_data(tenant_id, platform.external, &req.values)
        .await?;

    tracing::info!(
        tenant_id,
        platform = platform.external,
        days = req.values.len(),
        "remove data saved"
    );

    Ok(Json(
        ApiResponse::new(RemoveDataSaved {
            tenant_id,
            platform: platform.external.to_string(),
            days: req.values.len(),
        })
        .with_message("remove data saved"),
    ))
}
