//! Bearer token caller identification middleware.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_auth::AuthBearer;

use crate::domain::caller::Caller;
use crate::{error::AppError, state::AppState};

/// Attaches the request's [`Caller`] as a request extension.
///
/// # Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Identification Flow
///
/// 1. No `Authorization` header: the request continues as [`Caller::Guest`]
/// 2. Extract the Bearer token
/// 3. Match its digest against the configured tokens
/// 4. Continue as [`Caller::Authenticated`]
///
/// Whether a caller may mutate a link is decided later by the link
/// service's access policy, not here.
///
/// # Errors
///
/// Returns `401 Unauthorized` if:
/// - The header is present but not a Bearer token
/// - The token is not one of the configured tokens
pub async fn layer(
    State(st): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let caller = if parts.headers.contains_key(header::AUTHORIZATION) {
        let AuthBearer(token) = AuthBearer::from_request_parts(&mut parts, &())
            .await
            .map_err(|_| {
                AppError::unauthorized(
                    "Unauthorized",
                    serde_json::json!({"reason": "Authorization header is invalid"}),
                )
            })?;

        st.auth_service.identify(&token)?
    } else {
        Caller::Guest
    };

    tracing::debug!(caller = caller.subject(), "Caller identified");
    parts.extensions.insert(caller);

    Ok(next.run(Request::from_parts(parts, body)).await)
}
