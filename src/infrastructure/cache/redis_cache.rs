//! Redis-backed cache implementation.

use super::service::{CacheError, CacheResult, LinkCache, PopularityIndex};
use crate::domain::entities::{Link, PopularityEntry};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::time::Duration;
use tracing::{debug, info};

/// Sorted set holding the popularity ranking.
const POPULARITY_KEY: &str = "links:popular";

/// Redis cache implementing both the snapshot and the ranking capability.
///
/// Snapshots are JSON-encoded [`Link`] values stored with `PSETEX`; the
/// ranking is a sorted set scored by `use_count`. Uses connection pooling via
/// `ConnectionManager` for efficient connection reuse. Backend errors are
/// returned as [`CacheError`] so the caller decides how to degrade.
pub struct RedisCache {
    client: ConnectionManager,
    key_prefix: String,
}

impl RedisCache {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the connection cannot
    /// be established, or the PING health check fails.
    pub async fn connect(redis_url: &str) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("Connected to Redis");

        Ok(Self {
            client: manager,
            key_prefix: "link:".to_string(),
        })
    }

    /// Constructs the full Redis key with namespace prefix.
    fn build_key(&self, code: &str) -> String {
        format!("{}{}", self.key_prefix, code)
    }
}

/// Snapshot lifetime in whole milliseconds, `None` when nothing is left.
///
/// Sub-second lifetimes stay sub-second so a snapshot never outlives the
/// link it describes.
fn ttl_millis(ttl: Duration) -> Option<u64> {
    let ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
    (ms > 0).then_some(ms)
}

fn op_error(e: redis::RedisError) -> CacheError {
    CacheError::OperationError(e.to_string())
}

#[async_trait]
impl LinkCache for RedisCache {
    async fn get(&self, code: &str) -> CacheResult<Option<Link>> {
        let key = self.build_key(code);
        let mut conn = self.client.clone();

        let raw = conn
            .get::<_, Option<String>>(&key)
            .await
            .map_err(op_error)?;

        match raw {
            Some(json) => {
                debug!("Cache HIT: {}", code);
                serde_json::from_str(&json)
                    .map(Some)
                    .map_err(|e| CacheError::OperationError(format!("Corrupt snapshot: {}", e)))
            }
            None => {
                debug!("Cache MISS: {}", code);
                Ok(None)
            }
        }
    }

    async fn put(&self, link: &Link, ttl: Duration) -> CacheResult<()> {
        let Some(ttl_ms) = ttl_millis(ttl) else {
            debug!("Cache SKIP: {} (TTL below 1ms)", link.code);
            return Ok(());
        };
        let key = self.build_key(&link.code);
        let mut conn = self.client.clone();

        let json = serde_json::to_string(link)
            .map_err(|e| CacheError::OperationError(format!("Encode failed: {}", e)))?;

        conn.pset_ex::<_, _, ()>(&key, json, ttl_ms)
            .await
            .map_err(op_error)?;

        debug!("Cache SET: {} (TTL: {}ms)", link.code, ttl_ms);
        Ok(())
    }

    async fn invalidate(&self, code: &str) -> CacheResult<()> {
        let key = self.build_key(code);
        let mut conn = self.client.clone();

        let deleted = conn.del::<_, i32>(&key).await.map_err(op_error)?;
        if deleted > 0 {
            debug!("Cache INVALIDATE: {}", code);
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }
}

#[async_trait]
impl PopularityIndex for RedisCache {
    async fn bump(&self, code: &str, score: i64) -> CacheResult<()> {
        let mut conn = self.client.clone();
        conn.zadd::<_, _, _, ()>(POPULARITY_KEY, code, score)
            .await
            .map_err(op_error)
    }

    async fn top_n(&self, n: usize) -> CacheResult<Vec<PopularityEntry>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.client.clone();
        let stop = isize::try_from(n - 1).unwrap_or(isize::MAX);
        let rows = conn
            .zrevrange_withscores::<_, Vec<(String, f64)>>(POPULARITY_KEY, 0, stop)
            .await
            .map_err(op_error)?;

        Ok(rows
            .into_iter()
            .map(|(code, score)| PopularityEntry::new(code, score as i64))
            .collect())
    }

    async fn remove(&self, code: &str) -> CacheResult<()> {
        let mut conn = self.client.clone();
        conn.zrem::<_, _, ()>(POPULARITY_KEY, code)
            .await
            .map_err(op_error)
    }

    async fn rebuild(&self, entries: Vec<PopularityEntry>) -> CacheResult<()> {
        let mut pipe = redis::pipe();
        pipe.atomic().del(POPULARITY_KEY).ignore();
        for entry in &entries {
            pipe.zadd(POPULARITY_KEY, &entry.code, entry.score).ignore();
        }

        let mut conn = self.client.clone();
        pipe.query_async::<()>(&mut conn).await.map_err(op_error)
    }
}
