//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{get_conversion_status, health, ready, start_conversion};
use crate::state::AppState;

/// Multipart form overhead allowed on top of the upload ceiling.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let body_limit = state.config.max_upload_bytes() + FORM_OVERHEAD_BYTES;

    let mut api_routes = Router::new()
        .route("/convert", post(start_conversion))
        .route("/convert/:request_id", get(get_conversion_status))
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    if let Some(handle) = metrics_handle {
        api_routes = api_routes.route("/metrics", get(move || async move { handle.render() }));
    }

    Router::new()
        .nest("/api", api_routes)
        // Uploads are read into memory by the multipart extractor, so the
        // body limit is the upload ceiling plus form overhead
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
