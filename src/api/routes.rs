//! API route configuration.
//!
//! Every route sees the caller attached by [`crate::api::middleware::auth`];
//! mutating handlers pass it on to the link service's access policy.

use crate::api::handlers::{
    delete_link_handler, expired_links_handler, popular_handler, redirect_handler,
    regenerate_link_handler, search_handler, shorten_handler, stats_handler, update_link_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Link routes.
///
/// # Endpoints
///
/// - `POST   /links/shorten`           - Create a short link
/// - `GET    /links/search`            - Find live links by target URL
/// - `GET    /links/expired`           - List dead links awaiting purge
/// - `GET    /links/popular`           - Most used codes
/// - `GET    /links/{code}`            - Redirect (307)
/// - `PUT    /links/{code}`            - Change the target URL
/// - `DELETE /links/{code}`            - Delete a link
/// - `POST   /links/{code}/regenerate` - Issue a new code
/// - `GET    /links/{code}/stats`      - Usage statistics
pub fn link_routes() -> Router<AppState> {
    Router::new()
        .route("/links/shorten", post(shorten_handler))
        .route("/links/search", get(search_handler))
        .route("/links/expired", get(expired_links_handler))
        .route("/links/popular", get(popular_handler))
        .route(
            "/links/{code}",
            get(redirect_handler)
                .put(update_link_handler)
                .delete(delete_link_handler),
        )
        .route("/links/{code}/regenerate", post(regenerate_link_handler))
        .route("/links/{code}/stats", get(stats_handler))
}
