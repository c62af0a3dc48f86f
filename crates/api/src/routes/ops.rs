//! Operations routes
//!
//! Liveness only; it does not check the warehouse or the store.

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}

/// GET /health
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "data divergence service is running",
    })
}
