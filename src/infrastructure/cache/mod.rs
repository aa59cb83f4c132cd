//! Caching layer in front of the link store.
//!
//! Two independent capabilities, each swappable on its own:
//! - [`LinkCache`] - code → link snapshots with a TTL
//! - [`PopularityIndex`] - codes ranked by use count
//!
//! Implementations:
//! - [`RedisCache`] - Production Redis-backed cache (both capabilities)
//! - [`MemoryLinkCache`] / [`MemoryPopularityIndex`] - In-process cache
//! - [`NullCache`] - No-op implementation for testing/disabled caching

mod memory_cache;
mod null_cache;
mod redis_cache;
mod service;

pub use memory_cache::{MemoryLinkCache, MemoryPopularityIndex};
pub use null_cache::NullCache;
pub use redis_cache::RedisCache;
pub use service::{CacheError, CacheResult, LinkCache, PopularityIndex};
