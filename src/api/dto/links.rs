//! DTOs for link creation and management endpoints.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::entities::Link;
use crate::utils::code_generator::validate_custom_alias;
use crate::utils::url_validator::MAX_URL_LENGTH;

/// `validator` length bounds are `u64`; mirror of [`MAX_URL_LENGTH`].
const MAX_URL_LENGTH_U64: u64 = MAX_URL_LENGTH as u64;

fn alias_rules(alias: &str) -> Result<(), ValidationError> {
    validate_custom_alias(alias).map_err(|e| {
        ValidationError::new("invalid_alias").with_message(Cow::Owned(e.to_string()))
    })
}

/// Request body for `POST /links/shorten`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLinkRequest {
    /// The URL to shorten (must be valid HTTP/HTTPS).
    #[validate(url(message = "Invalid URL format"))]
    #[validate(length(max = MAX_URL_LENGTH_U64))]
    pub original_url: String,

    /// Optional deadline; defaults to 15 days from now.
    pub expires_at: Option<DateTime<Utc>>,

    /// Optional user-chosen code used instead of a generated one.
    #[validate(custom(function = "alias_rules"))]
    pub custom_alias: Option<String>,
}

/// Request body for `PUT /links/{code}`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLinkRequest {
    #[validate(url(message = "Invalid URL format"))]
    #[validate(length(max = MAX_URL_LENGTH_U64))]
    pub original_url: String,
}

/// JSON representation of a link.
#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub code: String,
    pub original_url: String,
    pub short_url: String,
    pub custom_alias: bool,
    pub use_count: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl LinkResponse {
    pub fn new(link: Link, short_url: String) -> Self {
        Self {
            code: link.code,
            original_url: link.target_url,
            short_url,
            custom_alias: link.custom_alias,
            use_count: link.use_count,
            created_at: link.created_at,
            expires_at: link.expires_at,
        }
    }
}

/// A list of links with its length.
#[derive(Debug, Serialize)]
pub struct LinkListResponse {
    pub total: usize,
    pub items: Vec<LinkResponse>,
}

/// Query for `GET /links/search`.
#[derive(Debug, Deserialize, Validate)]
pub struct SearchQuery {
    #[validate(length(min = 1, max = MAX_URL_LENGTH_U64))]
    pub original_url: String,
}
