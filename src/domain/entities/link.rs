//! Link entity representing a short code mapped to a target URL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A short link with its usage metadata.
///
/// The record is the unit stored by [`crate::domain::repositories::LinkRepository`]
/// and snapshotted by [`crate::infrastructure::cache::LinkCache`]. A link whose
/// `expires_at` lies in the past is dead: it is never handed out by lookups and
/// is deleted the next time it is observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub code: String,
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub use_count: i64,
    pub last_used_at: Option<DateTime<Utc>>,
    /// `true` when `code` was chosen by the caller rather than generated.
    pub custom_alias: bool,
}

impl Link {
    /// Creates a new Link instance.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        code: String,
        target_url: String,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
        use_count: i64,
        last_used_at: Option<DateTime<Utc>>,
        custom_alias: bool,
    ) -> Self {
        Self {
            code,
            target_url,
            created_at,
            expires_at,
            use_count,
            last_used_at,
            custom_alias,
        }
    }

    /// Returns true if the deadline has passed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|deadline| deadline < now)
    }

    /// Returns true if the link has passed its expiry time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns true if the link has been redirected at least once.
    pub fn has_been_used(&self) -> bool {
        self.last_used_at.is_some()
    }
}

/// Input data for creating a new link.
///
/// `use_count` always starts at zero and `last_used_at` is absent; neither can
/// be supplied on creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLink {
    pub code: String,
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub custom_alias: bool,
}

impl NewLink {
    /// Materializes the stored record for this input.
    pub fn into_link(self) -> Link {
        Link::new(
            self.code,
            self.target_url,
            self.created_at,
            self.expires_at,
            0,
            None,
            self.custom_alias,
        )
    }
}

/// A single atomic change applied to a stored link.
///
/// Each variant is executed by the store as one statement so concurrent
/// changes to the same code never lose updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkUpdate {
    /// `use_count += 1`, `last_used_at = at`.
    RecordUse { at: DateTime<Utc> },
    /// Rewrites the destination.
    SetTarget(String),
    /// Moves the record to a new code, keeping every other field.
    Rekey(String),
}

impl LinkUpdate {
    /// Applies the change to an in-memory record.
    pub fn apply(&self, link: &mut Link) {
        match self {
            LinkUpdate::RecordUse { at } => {
                link.use_count += 1;
                link.last_used_at = Some(*at);
            }
            LinkUpdate::SetTarget(url) => link.target_url = url.clone(),
            LinkUpdate::Rekey(code) => link.code = code.clone(),
        }
    }
}

/// Usage snapshot returned by the stats operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    pub code: String,
    pub target_url: String,
    pub use_count: i64,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Link> for LinkStats {
    fn from(link: Link) -> Self {
        Self {
            code: link.code,
            target_url: link.target_url,
            use_count: link.use_count,
            created_at: link.created_at,
            last_used_at: link.last_used_at,
            expires_at: link.expires_at,
        }
    }
}

/// A code and its score in the popularity ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularityEntry {
    pub code: String,
    pub score: i64,
}

impl PopularityEntry {
    pub fn new(code: impl Into<String>, score: i64) -> Self {
        Self {
            code: code.into(),
            score,
        }
    }
}
