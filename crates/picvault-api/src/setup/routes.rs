//! Route configuration and setup

use crate::constants::{API_PREFIX, HEALTH_PATH, MAX_CONCURRENT_REQUESTS};
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{delete, get, post},
    Router,
};
use picvault_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Headroom for multipart framing and text fields on top of the image itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Router {
    let body_limit = config.max_upload_size_bytes + MULTIPART_OVERHEAD_BYTES;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route(HEALTH_PATH, get(handlers::health::liveness_check))
        .route(
            &format!("{}/images", API_PREFIX),
            post(handlers::images::upload_image).get(handlers::images::list_images),
        )
        .route(
            &format!("{}/images/{{id}}", API_PREFIX),
            delete(handlers::images::delete_image),
        )
        .route(
            &format!("{}/users", API_PREFIX),
            post(handlers::users::register_user),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
