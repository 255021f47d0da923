//! Router configuration for the gateway.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Slack above the upload cap for multipart boundaries and the small form
/// fields. The exact cap is enforced per file by the upload handler.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    let upload_limit = usize::try_from(state.gateway.config().max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", get(handlers::banner))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/convert", post(handlers::convert_url))
        .route(
            "/convert/upload",
            post(handlers::convert_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
