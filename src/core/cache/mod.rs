//! Key/value cache abstraction
//!
//! One capability, three interchangeable backends:
//! - [`NoopCache`] - writes succeed, reads miss; disables caching
//! - [`MemoryCache`] - process-local map, typed reads, no expiry
//! - [`RemoteCache`] - redis, values encoded through [`Cacheable`]
//!
//! [`Cache`] is the closed set of backends callers hold; the
//! [`CacheRegistry`] builds it from a [`CacheConfig`] and keeps one live
//! connection per remote target.
//!
//! Reads fail with [`CacheError::Miss`] (or `TypeMismatch`) when nothing usable
//! is stored; check [`CacheError::is_miss`] before treating an error as fatal.

mod codec;
mod config;
mod error;
mod memory;
mod noop;
mod registry;
mod remote;

pub use codec::Cacheable;
pub use config::{CacheConfig, CacheKind, RedisConfig, DEFAULT_REDIS_HOST, DEFAULT_REDIS_PORT};
pub use error::{CacheError, CacheResult};
pub use memory::{MemoryCache, UNBOUNDED_TTL};
pub use noop::NoopCache;
pub use registry::{CacheRegistry, DEFAULT_CONNECT_TIMEOUT};
pub use remote::{RemoteCache, RemoteTarget};

use std::sync::Arc;
use std::time::Duration;

/// TTL meaning "never expires"
pub const NO_EXPIRY: Duration = Duration::ZERO;

/// A cache backend
#[derive(Debug, Clone)]
pub enum Cache {
    Noop(NoopCache),
    Memory(Arc<MemoryCache>),
    Remote(Arc<RemoteCache>),
}

impl Cache {
    /// Store a value that never expires
    pub async fn put<V: Cacheable>(&self, key: &str, value: &V) -> CacheResult<()> {
        self.put_with_ttl(key, value, NO_EXPIRY).await
    }

    /// Store a value for `ttl` ([`NO_EXPIRY`] for no limit)
    pub async fn put_with_ttl<V: Cacheable>(
        &self,
        key: &str,
        value: &V,
        ttl: Duration,
    ) -> CacheResult<()> {
        match self {
            Cache::Noop(c) => c.put_with_ttl(key, value, ttl),
            Cache::Memory(c) => c.put_with_ttl(key, value, ttl),
            Cache::Remote(c) => c.put_with_ttl(key, value, ttl).await,
        }
    }

    /// Read the value stored under `key` as a `V`
    pub async fn fetch<V: Cacheable>(&self, key: &str) -> CacheResult<V> {
        match self {
            Cache::Noop(c) => c.fetch(key),
            Cache::Memory(c) => c.fetch(key),
            Cache::Remote(c) => c.fetch(key).await,
        }
    }

    /// Read a value together with its remaining TTL
    pub async fn fetch_with_ttl<V: Cacheable>(&self, key: &str) -> CacheResult<(V, Duration)> {
        match self {
            Cache::Noop(c) => c.fetch_with_ttl(key),
            Cache::Memory(c) => c.fetch_with_ttl(key),
            Cache::Remote(c) => c.fetch_with_ttl(key).await,
        }
    }

    /// Remove a key, returning the number of entries removed
    pub async fn delete(&self, key: &str) -> CacheResult<u64> {
        match self {
            Cache::Noop(c) => c.delete(key),
            Cache::Memory(c) => c.delete(key),
            Cache::Remote(c) => c.delete(key).await,
        }
    }

    pub fn kind(&self) -> CacheKind {
        match self {
            Cache::Noop(_) => CacheKind::None,
            Cache::Memory(_) => CacheKind::Memory,
            Cache::Remote(_) => CacheKind::Redis,
        }
    }
}

impl From<Arc<MemoryCache>> for Cache {
    fn from(cache: Arc<MemoryCache>) -> Self {
        Cache::Memory(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_through_enum() {
        let cache = Cache::from(Arc::new(MemoryCache::new()));
        cache.put("k", &7u64).await.unwrap();

        let (value, ttl) = cache.fetch_with_ttl::<u64>("k").await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(ttl, UNBOUNDED_TTL);

        assert!(cache.fetch::<String>("k").await.unwrap_err().is_miss());
        assert_eq!(cache.delete("k").await.unwrap(), 1);
        assert!(cache.fetch::<u64>("k").await.unwrap_err().is_miss());
    }

    #[tokio::test]
    async fn test_noop_through_enum() {
        let cache = Cache::Noop(NoopCache);
        cache.put("k", &7u64).await.unwrap();
        assert!(cache.fetch::<u64>("k").await.unwrap_err().is_miss());
        assert_eq!(cache.kind(), CacheKind::None);
    }
}
