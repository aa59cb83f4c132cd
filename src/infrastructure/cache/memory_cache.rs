//! In-process cache implementations.

use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::Expiry;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use super::service::{CacheResult, LinkCache, PopularityIndex};
use crate::domain::entities::{Link, PopularityEntry};

#[derive(Clone)]
struct CachedLink {
    link: Link,
    ttl: Duration,
}

/// Expires each entry after the TTL it was stored with.
struct PerEntryTtl;

impl Expiry<String, CachedLink> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedLink,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedLink,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Bounded in-process snapshot cache backed by `moka`.
///
/// Entries past their TTL are never returned by `get`; eviction of the
/// underlying memory happens lazily inside `moka`.
pub struct MemoryLinkCache {
    inner: Cache<String, CachedLink>,
}

impl MemoryLinkCache {
    pub fn new(max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        debug!(max_capacity, "MemoryLinkCache initialized");
        Self { inner }
    }
}

#[async_trait]
impl LinkCache for MemoryLinkCache {
    async fn get(&self, code: &str) -> CacheResult<Option<Link>> {
        match self.inner.get(code).await {
            Some(cached) => {
                debug!("Cache HIT: {}", code);
                Ok(Some(cached.link))
            }
            None => {
                debug!("Cache MISS: {}", code);
                Ok(None)
            }
        }
    }

    async fn put(&self, link: &Link, ttl: Duration) -> CacheResult<()> {
        self.inner
            .insert(
                link.code.clone(),
                CachedLink {
                    link: link.clone(),
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn invalidate(&self, code: &str) -> CacheResult<()> {
        self.inner.invalidate(code).await;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[derive(Default)]
struct Ranking {
    scores: HashMap<String, i64>,
    order: BTreeSet<(Reverse<i64>, String)>,
}

impl Ranking {
    fn upsert(&mut self, code: &str, score: i64) {
        if let Some(previous) = self.scores.insert(code.to_string(), score) {
            self.order.remove(&(Reverse(previous), code.to_string()));
        }
        self.order.insert((Reverse(score), code.to_string()));
    }

    fn remove(&mut self, code: &str) {
        if let Some(previous) = self.scores.remove(code) {
            self.order.remove(&(Reverse(previous), code.to_string()));
        }
    }
}

/// In-process popularity ranking.
///
/// Ordered by descending score, ties broken by ascending code.
#[derive(Default)]
pub struct MemoryPopularityIndex {
    ranking: RwLock<Ranking>,
}

impl MemoryPopularityIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PopularityIndex for MemoryPopularityIndex {
    async fn bump(&self, code: &str, score: i64) -> CacheResult<()> {
        self.ranking.write().await.upsert(code, score);
        Ok(())
    }

    async fn top_n(&self, n: usize) -> CacheResult<Vec<PopularityEntry>> {
        let ranking = self.ranking.read().await;
        Ok(ranking
            .order
            .iter()
            .take(n)
            .map(|(Reverse(score), code)| PopularityEntry::new(code.clone(), *score))
            .collect())
    }

    async fn remove(&self, code: &str) -> CacheResult<()> {
        self.ranking.write().await.remove(code);
        Ok(())
    }

    async fn rebuild(&self, entries: Vec<PopularityEntry>) -> CacheResult<()> {
        let mut fresh = Ranking::default();
        for entry in entries {
            fresh.upsert(&entry.code, entry.score);
        }
        *self.ranking.write().await = fresh;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn link(code: &str) -> Link {
        Link::new(
            code.to_string(),
            "https://example.com".to_string(),
            Utc::now(),
            None,
            0,
            None,
            false,
        )
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = MemoryLinkCache::new(100);
        cache
            .put(&link("abc123"), Duration::from_secs(60))
            .await
            .unwrap();

        let cached = cache.get("abc123").await.unwrap();
        assert_eq!(cached.unwrap().code, "abc123");
    }

    #[tokio::test]
    async fn test_miss_for_unknown_code() {
        let cache = MemoryLinkCache::new(100);
        assert!(cache.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entry_not_returned_after_ttl() {
        let cache = MemoryLinkCache::new(100);
        cache
            .put(&link("short"), Duration::from_millis(50))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(cache.get("short").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = MemoryLinkCache::new(100);
        cache
            .put(&link("gone"), Duration::from_secs(60))
            .await
            .unwrap();
        cache.invalidate("gone").await.unwrap();

        assert!(cache.get("gone").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_top_n_orders_by_score_then_code() {
        let index = MemoryPopularityIndex::new();
        index.bump("bbb", 3).await.unwrap();
        index.bump("aaa", 3).await.unwrap();
        index.bump("ccc", 5).await.unwrap();
        index.bump("ddd", 1).await.unwrap();

        let top = index.top_n(3).await.unwrap();
        assert_eq!(
            top,
            vec![
                PopularityEntry::new("ccc", 5),
                PopularityEntry::new("aaa", 3),
                PopularityEntry::new("bbb", 3),
            ]
        );
    }

    #[tokio::test]
    async fn test_bump_replaces_score() {
        let index = MemoryPopularityIndex::new();
        index.bump("abc", 1).await.unwrap();
        index.bump("abc", 4).await.unwrap();

        let top = index.top_n(10).await.unwrap();
        assert_eq!(top, vec![PopularityEntry::new("abc", 4)]);
    }

    #[tokio::test]
    async fn test_remove_and_rebuild() {
        let index = MemoryPopularityIndex::new();
        index.bump("abc", 1).await.unwrap();
        index.remove("abc").await.unwrap();
        assert!(index.top_n(10).await.unwrap().is_empty());

        index
            .rebuild(vec![
                PopularityEntry::new("x", 2),
                PopularityEntry::new("y", 9),
            ])
            .await
            .unwrap();
        let top = index.top_n(1).await.unwrap();
        assert_eq!(top, vec![PopularityEntry::new("y", 9)]);
    }
}
