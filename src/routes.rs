//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `/links/*` - Link API (see [`crate::api::routes::link_routes`])
//! - `GET /health` - Store and cache reachability (public)
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Caller identification** - Optional Bearer token
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::health_handler;
use crate::api::middleware::{auth, tracing};
use crate::state::AppState;
use axum::routing::get;
use axum::{Router, middleware};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Builds the router with all routes and middleware except path normalization.
///
/// Integration tests drive this router directly.
pub fn build_router(state: AppState) -> Router {
    let link_router = api::routes::link_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth::layer,
    ));

    Router::new()
        .merge(link_router)
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(tracing::layer())
}

/// Constructs the application router served by [`crate::server::run`].
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(build_router(state))
}
