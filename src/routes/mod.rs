//! HTTP routes for the relay

pub mod chat;
pub mod container_file;
pub mod health;
pub mod metrics;
pub mod playground;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderValue, Response, StatusCode},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::error::{AppError, AppResult};
use crate::AppState;

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let relay_routes = Router::new()
        .route("/api/playground", post(playground::relay))
        .route(
            "/api/playground/container-file",
            get(container_file::download),
        )
        .route("/api/chat", post(chat::chat));

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/live", get(health::liveness_check))
        .route("/metrics", get(metrics::prometheus_metrics));

    // No compression layer: it would buffer the incremental text stream.
    Router::new()
        .merge(public_routes)
        .merge(relay_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Wrap a streamed body with the headers every relay stream carries.
pub(crate) fn text_stream_response(body: Body) -> AppResult<Response<Body>> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CACHE_CONTROL, "no-cache")
        .header("X-Accel-Buffering", HeaderValue::from_static("no"))
        .body(body)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build response: {}", e)))
}
