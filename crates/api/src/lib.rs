//! Drift API
//!
//! JSON HTTP facade over the divergence engine, the attribution aggregator
//! and the tag store. Also serves the built dashboard for every other path.
//!
//! # Usage
//!
//! ```ignore
//! use drift_api::{AppState, build_router};
//!
//! let state = AppState::new(engine, aggregator, tags, cache).with_static_dir("frontend/dist");
//! let app = build_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```
//!
//! # Endpoints
//!
//! ## Divergence
//! - `GET /api/alter-data?platform=&needRefresh=&tenantId=` - vendor vs pipeline per tenant
//! - `DELETE /api/alter-data/cache?platform=&tenantId=` - drop cached source entries
//!
//! ## Attribution
//! - `GET /api/attribution` - every tenant
//! - `GET /api/attribution/{tenantId}` - one tenant
//! - `GET /api/attribution-data/grouped` - split into new and old customers
//!
//! ## Tags
//! - `POST /api/tags`, `DELETE /api/tags` - add or remove a tag
//! - `GET /api/tags/{tenant_id}/{platform}` - one tenant's tags
//! - `GET /api/tags/{platform}` - every tag in use on a platform
//!
//! ## Other
//! - `POST /api/remove-data` - per-day side values shown next to the series
//! - `GET /health` - liveness

pub mod error;
pub mod routes;
pub mod state;
pub mod types;

// Re-exports
pub use error::{ApiError, Result};
pub use routes::build_router;
pub use state::AppState;
pub use types::{ApiResponse, RefreshParams, RemoveDataRequest, TagRequest};
