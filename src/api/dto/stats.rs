//! DTOs for usage statistics and popularity endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::entities::LinkStats;

/// Usage snapshot of one link.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub code: String,
    pub original_url: String,
    pub use_count: i64,
    pub created_at: DateTime<Utc>,
    /// Absent until the first redirect.
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<LinkStats> for StatsResponse {
    fn from(stats: LinkStats) -> Self {
        Self {
            code: stats.code,
            original_url: stats.target_url,
            use_count: stats.use_count,
            created_at: stats.created_at,
            last_used_at: stats.last_used_at,
            expires_at: stats.expires_at,
        }
    }
}

/// Query for `GET /links/popular`.
#[derive(Debug, Deserialize, Validate)]
pub struct PopularQuery {
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
}

impl PopularQuery {
    pub const DEFAULT_LIMIT: usize = 10;

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }
}

/// One ranked code.
#[derive(Debug, Serialize)]
pub struct PopularItem {
    pub rank: usize,
    pub code: String,
    pub short_url: String,
    pub use_count: i64,
}

#[derive(Debug, Serialize)]
pub struct PopularResponse {
    pub items: Vec<PopularItem>,
}
