//! HTTP router construction.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api;
use crate::state::AppState;

/// Build the application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/api/fetch_stock_data", get(api::fetch_stock_data))
        .fallback(api::invalid_endpoint)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
