//! Shared state injected into every HTTP handler.

use std::sync::Arc;

use crate::application::services::{AuthService, LinkService};
use crate::domain::repositories::LinkRepository;

/// Store-erased link service used by the HTTP layer.
pub type SharedLinkService = Arc<LinkService<dyn LinkRepository>>;

#[derive(Clone)]
pub struct AppState {
    pub link_service: SharedLinkService,
    pub auth_service: Arc<AuthService>,
    /// Prefix of rendered short URLs, without a trailing slash.
    pub base_url: String,
}

impl AppState {
    pub fn new(
        link_service: SharedLinkService,
        auth_service: Arc<AuthService>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            link_service,
            auth_service,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Full short URL for `code`.
    pub fn short_url(&self, code: &str) -> String {
        format!("{}/links/{}", self.base_url, code)
    }
}
