//! No-op cache: writes vanish, reads always miss

use super::{CacheError, CacheResult, Cacheable};
use std::time::Duration;

/// Cache that stores nothing
///
/// Disables caching without touching call sites.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl NoopCache {
    pub fn put_with_ttl<V: Cacheable>(
        &self,
        _key: &str,
        _value: &V,
        _ttl: Duration,
    ) -> CacheResult<()> {
        Ok(())
    }

    pub fn fetch<V: Cacheable>(&self, key: &str) -> CacheResult<V> {
        Err(CacheError::miss(key))
    }

    pub fn fetch_with_ttl<V: Cacheable>(&self, key: &str) -> CacheResult<(V, Duration)> {
        Err(CacheError::miss(key))
    }

    pub fn delete(&self, _key: &str) -> CacheResult<u64> {
        Ok(0)
    }
}
