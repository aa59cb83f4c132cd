//! Handlers for usage statistics, search and maintenance listings.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde_json::json;
use validator::Validate;

use crate::api::dto::links::{LinkListResponse, LinkResponse, SearchQuery};
use crate::api::dto::stats::{PopularItem, PopularQuery, PopularResponse, StatsResponse};
use crate::domain::entities::Link;
use crate::error::AppError;
use crate::state::AppState;

fn link_list(state: &AppState, links: Vec<Link>) -> LinkListResponse {
    let items: Vec<LinkResponse> = links
        .into_iter()
        .map(|link| {
            let short_url = state.short_url(&link.code);
            LinkResponse::new(link, short_url)
        })
        .collect();

    LinkListResponse {
        total: items.len(),
        items,
    }
}

/// Returns usage statistics for one link.
///
/// # Endpoint
///
/// `GET /links/{code}/stats`
///
/// # Errors
///
/// Returns 404 Not Found if the short code doesn't exist.
/// Returns 410 Gone if the link expired (it is deleted on the way).
pub async fn stats_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<StatsResponse>, AppError> {
    let stats = state.link_service.stats(&code).await?;

    Ok(Json(stats.into()))
}

/// Finds live links pointing at exactly the given URL.
///
/// # Endpoint
///
/// `GET /links/search?original_url=...`
///
/// # Errors
///
/// Returns 404 Not Found if no live link matches.
pub async fn search_handler(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<LinkListResponse>, AppError> {
    query.validate()?;

    let links = state.link_service.search(&query.original_url).await?;
    if links.is_empty() {
        return Err(AppError::not_found(
            "No short link for this URL",
            json!({ "original_url": query.original_url }),
        ));
    }

    Ok(Json(link_list(&state, links)))
}

/// Lists dead links still present in the store.
///
/// # Endpoint
///
/// `GET /links/expired`
///
/// Listing does not delete anything.
pub async fn expired_links_handler(
    State(state): State<AppState>,
) -> Result<Json<LinkListResponse>, AppError> {
    let links = state.link_service.list_expired().await?;

    Ok(Json(link_list(&state, links)))
}

/// Returns the most used codes.
///
/// # Endpoint
///
/// `GET /links/popular?limit=10`
///
/// # Query Parameters
///
/// - `limit` (optional): Number of entries (default: 10, max: 100)
///
/// # Errors
///
/// Returns 503 Service Unavailable if the ranking cannot be read.
pub async fn popular_handler(
    State(state): State<AppState>,
    Query(query): Query<PopularQuery>,
) -> Result<Json<PopularResponse>, AppError> {
    query.validate()?;

    let entries = state.link_service.popular(query.limit()).await?;
    let items = entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| PopularItem {
            rank: index + 1,
            short_url: state.short_url(&entry.code),
            code: entry.code,
            use_count: entry.score,
        })
        .collect();

    Ok(Json(PopularResponse { items }))
}
