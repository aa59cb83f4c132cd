//! Repository trait for short link data access.

use crate::domain::entities::{Link, LinkUpdate, NewLink};
use crate::error::LinkError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable store of links keyed by `code`.
///
/// The store is the source of truth for every field, `use_count` included.
/// Uniqueness of `code` is enforced by the backend itself, not by a
/// lookup-then-insert sequence, so concurrent creations cannot both succeed.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryLinkRepository`] - In-process implementation
/// - Test mocks available with `cfg(test)`
///
/// # Errors
///
/// Every method returns [`LinkError::StoreUnavailable`] when the backend
/// cannot be reached.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Persists a new link.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::AlreadyExists`] if the code is already stored.
    async fn create(&self, new_link: NewLink) -> Result<Link, LinkError>;

    /// Fetches a link by code, dead or alive.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::NotFound`] if no record has this code.
    async fn get(&self, code: &str) -> Result<Link, LinkError>;

    /// Returns whether a record with this code is physically present.
    async fn exists(&self, code: &str) -> Result<bool, LinkError>;

    /// Applies one change atomically and returns the post-update record.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::NotFound`] if the code is absent.
    /// Returns [`LinkError::AlreadyExists`] if a [`LinkUpdate::Rekey`] target is taken.
    async fn update(&self, code: &str, update: LinkUpdate) -> Result<Link, LinkError>;

    /// Removes a link.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::NotFound`] if the code is absent.
    async fn delete(&self, code: &str) -> Result<(), LinkError>;

    /// Removes the record under `code` only if it is dead at `as_of`.
    ///
    /// The liveness check and the removal are one atomic step, so a live link
    /// stored under a reused code is never removed. Returns `false` when the
    /// code is absent or its current record is live.
    async fn delete_expired(&self, code: &str, as_of: DateTime<Utc>) -> Result<bool, LinkError>;

    /// Lists every stored link whose `expires_at` is before `as_of`.
    async fn list_expired(&self, as_of: DateTime<Utc>) -> Result<Vec<Link>, LinkError>;

    /// Lists every stored link pointing at exactly `target_url`.
    async fn find_by_target(&self, target_url: &str) -> Result<Vec<Link>, LinkError>;

    /// Lists the `limit` most used links, highest `use_count` first, ties by code.
    async fn most_used(&self, limit: usize) -> Result<Vec<Link>, LinkError>;

    /// Checks if the backend is reachable.
    async fn health_check(&self) -> bool;
}
