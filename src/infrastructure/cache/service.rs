//! Cache capability traits and error types.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::entities::{Link, PopularityEntry};

/// Errors that can occur during cache operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    ConnectionError(String),
    #[error("Cache operation error: {0}")]
    OperationError(String),
    #[error("Cache operation timed out")]
    Timeout,
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Snapshot cache for code → link lookups.
///
/// Entries may be stale; the store stays authoritative. A `None` from
/// [`LinkCache::get`] is a miss and must be followed by a store lookup, never
/// read as "not found".
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache with TTL support
/// - [`crate::infrastructure::cache::MemoryLinkCache`] - In-process `moka` cache
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
#[async_trait]
pub trait LinkCache: Send + Sync {
    /// Retrieves a snapshot whose TTL has not elapsed.
    async fn get(&self, code: &str) -> CacheResult<Option<Link>>;

    /// Stores a snapshot of `link` under its code for at most `ttl`.
    async fn put(&self, link: &Link, ttl: Duration) -> CacheResult<()>;

    /// Removes the snapshot for `code`, if any.
    ///
    /// Used when a link is deleted, re-keyed or modified.
    async fn invalidate(&self, code: &str) -> CacheResult<()>;

    /// Checks if the cache backend is healthy.
    async fn health_check(&self) -> bool;
}

/// Ranked set of codes ordered by descending score.
///
/// Scores mirror `use_count` as of the last sync and may lag the store.
#[async_trait]
pub trait PopularityIndex: Send + Sync {
    /// Inserts `code` or replaces its score.
    async fn bump(&self, code: &str, score: i64) -> CacheResult<()>;

    /// Returns at most `n` entries, highest score first.
    async fn top_n(&self, n: usize) -> CacheResult<Vec<PopularityEntry>>;

    /// Drops `code` from the ranking.
    async fn remove(&self, code: &str) -> CacheResult<()>;

    /// Replaces the whole ranking with `entries`.
    async fn rebuild(&self, entries: Vec<PopularityEntry>) -> CacheResult<()>;
}
