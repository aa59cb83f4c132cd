//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};

use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short code to its target URL.
///
/// # Endpoint
///
/// `GET /links/{code}`
///
/// # Request Flow
///
/// 1. Look up the code in the cache, falling back to the store on a miss
/// 2. Purge the link if its deadline has passed
/// 3. Record one use with a single atomic store update
/// 4. Refresh the popularity ranking
/// 5. Return 307 Temporary Redirect
///
/// # Errors
///
/// Returns 404 Not Found if the short code doesn't exist.
/// Returns 410 Gone if the link expired (it is deleted on the way).
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let target_url = state.link_service.resolve(&code).await?;

    Ok(Redirect::temporary(&target_url))
}
