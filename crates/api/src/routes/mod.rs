//! API routes
//!
//! Domain-grouped HTTP route handlers.

pub mod alter_data;
pub mod attribution;
pub mod ops;
pub mod remove_data;
pub mod tags;

use axum::extract::Request;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{Method, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::state::AppState;

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// Build the complete router: API, health, CORS and the dashboard fallback
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(alter_data::routes())
        .merge(attribution::routes())
        .merge(tags::routes())
        .merge(remove_data::routes())
        .fallback(api_not_found);

    let router = Router::new().merge(ops::routes()).nest("/api", api);

    // Everything outside /api and /health is the single-page dashboard
    let router = match &state.static_dir {
        Some(dir) => router.fallback_service(
            ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))),
        ),
        None => router,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(preflight))
        .with_state(state)
}

/// Answer every `OPTIONS` request with 204 before it reaches routing
async fn preflight(request: Request, next: Next) -> Response {
    if request.method() != Method::OPTIONS {
        return next.run(request).await;
    }
    (
        StatusCode::NO_CONTENT,
        [
            (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS),
            (ACCESS_CONTROL_ALLOW_HEADERS, "*"),
        ],
    )
        .into_response()
}

async fn api_not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}
