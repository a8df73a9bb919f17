//! In-process cache backed by a shared map
//!
//! Values are stored as-is (no encoding) and read back through a typed
//! accessor; reading a key as a different type than it was stored with is a
//! `TypeMismatch`. Entries never expire on their own: they live until deleted
//! or until the process exits, whatever TTL they were stored with.

use super::{CacheError, CacheResult, Cacheable};
use parking_lot::RwLock;
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Remaining TTL reported for every entry (about 290 years)
pub const UNBOUNDED_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 290);

struct MemoryEntry {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

/// Map-backed cache shared by all requests of a process
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value; the TTL is accepted but not enforced
    pub fn put_with_ttl<V: Cacheable>(
        &self,
        key: &str,
        value: &V,
        _ttl: Duration,
    ) -> CacheResult<()> {
        let entry = MemoryEntry {
            value: Arc::new(value.clone()),
            type_name: type_name::<V>(),
        };
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }

    pub fn fetch<V: Cacheable>(&self, key: &str) -> CacheResult<V> {
        let entries = self.entries.read();
        let entry = entries.get(key).ok_or_else(|| CacheError::miss(key))?;
        entry
            .value
            .downcast_ref::<V>()
            .cloned()
            .ok_or_else(|| CacheError::TypeMismatch {
                key: key.to_string(),
                stored: entry.type_name,
                requested: type_name::<V>(),
            })
    }

    pub fn fetch_with_ttl<V: Cacheable>(&self, key: &str) -> CacheResult<(V, Duration)> {
        let value = self.fetch(key)?;
        Ok((value, UNBOUNDED_TTL))
    }

    /// Remove a key, returning how many entries were removed (0 or 1)
    pub fn delete(&self, key: &str) -> CacheResult<u64> {
        Ok(self.entries.write().remove(key).map_or(0, |_| 1))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.len())
            .finish()
    }
}
