//! No-op cache implementation for testing or disabled caching.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::service::{CacheResult, LinkCache, PopularityIndex};
use crate::domain::entities::{Link, PopularityEntry};

/// A cache implementation that does nothing.
///
/// Every lookup is a miss and the popularity ranking is always empty.
/// Both capabilities can be disabled independently by wiring this type into
/// either slot of the link service.
pub struct NullCache;

impl NullCache {
    /// Creates a new NullCache instance.
    pub fn new() -> Self {
        debug!("Using NullCache (caching disabled)");
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkCache for NullCache {
    async fn get(&self, _code: &str) -> CacheResult<Option<Link>> {
        Ok(None)
    }

    async fn put(&self, _link: &Link, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn invalidate(&self, _code: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[async_trait]
impl PopularityIndex for NullCache {
    async fn bump(&self, _code: &str, _score: i64) -> CacheResult<()> {
        Ok(())
    }

    async fn top_n(&self, _n: usize) -> CacheResult<Vec<PopularityEntry>> {
        Ok(Vec::new())
    }

    async fn remove(&self, _code: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn rebuild(&self, _entries: Vec<PopularityEntry>) -> CacheResult<()> {
        Ok(())
    }
}
