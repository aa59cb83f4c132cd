//! Handlers for link management endpoints (create, update, regenerate, delete).

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use validator::Validate;

use crate::api::dto::links::{CreateLinkRequest, LinkResponse, UpdateLinkRequest};
use crate::application::services::CreateLink;
use crate::domain::caller::Caller;
use crate::error::AppError;
use crate::state::AppState;

/// Creates a short link.
///
/// # Endpoint
///
/// `POST /links/shorten`
///
/// # Request Body
///
/// ```json
/// {
///   "original_url": "https://example.com",
///   "expires_at": "2030-01-01T00:00:00Z",  // optional, default now + 15 days
///   "custom_alias": "my-link"              // optional
/// }
/// ```
///
/// # Response
///
/// `201 Created` with the stored link.
///
/// # Errors
///
/// Returns 400 Bad Request if validation fails.
/// Returns 409 Conflict if the custom alias is held by a live link.
pub async fn shorten_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<LinkResponse>), AppError> {
    payload.validate()?;

    let request = CreateLink {
        target_url: payload.original_url,
        expires_at: payload.expires_at,
        custom_alias: payload.custom_alias,
    };

    let link = state.link_service.create(&caller, request).await?;
    let short_url = state.short_url(&link.code);

    Ok((StatusCode::CREATED, Json(LinkResponse::new(link, short_url))))
}

/// Points a link at a new destination.
///
/// # Endpoint
///
/// `PUT /links/{code}`
///
/// # Cache
///
/// The cached snapshot is replaced, so the next redirect uses the new target.
///
/// # Errors
///
/// Returns 403 Forbidden for guest callers.
/// Returns 404 Not Found if the link doesn't exist, 410 Gone if it expired.
pub async fn update_link_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<UpdateLinkRequest>,
) -> Result<Json<LinkResponse>, AppError> {
    payload.validate()?;

    let link = state
        .link_service
        .update(&caller, &code, &payload.original_url)
        .await?;
    let short_url = state.short_url(&link.code);

    Ok(Json(LinkResponse::new(link, short_url)))
}

/// Moves a generated link to a fresh code.
///
/// # Endpoint
///
/// `POST /links/{code}/regenerate`
///
/// # Errors
///
/// Returns 409 Conflict for custom aliases, which are never replaced.
pub async fn regenerate_link_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<LinkResponse>, AppError> {
    let link = state.link_service.regenerate(&caller, &code).await?;
    let short_url = state.short_url(&link.code);

    Ok(Json(LinkResponse::new(link, short_url)))
}

/// Deletes a link.
///
/// # Endpoint
///
/// `DELETE /links/{code}`
///
/// # Behavior
///
/// The record is removed from the store together with its cached snapshot
/// and ranking entry. The code may be reused by a later creation.
///
/// # Errors
///
/// Returns 404 Not Found if the link doesn't exist or is already deleted.
pub async fn delete_link_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<StatusCode, AppError> {
    state.link_service.delete(&caller, &code).await?;

    Ok(StatusCode::NO_CONTENT)
}
