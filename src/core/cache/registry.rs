//! Process-wide registry of cache backends
//!
//! Created once at startup and handed to whatever needs a cache. Remote
//! backends are keyed by their canonical `host:port/db` target: the first
//! caller for a target pays for the connection, later callers share it. The
//! in-process map is created on first use and shared the same way.

use super::{
    Cache, CacheConfig, CacheError, CacheKind, CacheResult, MemoryCache, NoopCache, RemoteCache,
    RemoteTarget,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// How long a first connection to a remote target may take
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

type RemoteSlot = Arc<OnceCell<Arc<RemoteCache>>>;

/// Registry of live cache backends
pub struct CacheRegistry {
    // One cell per target; a slow target only blocks its own callers
    remotes: Mutex<HashMap<String, RemoteSlot>>,
    memory: Mutex<Option<Arc<MemoryCache>>>,
    connect_timeout: Duration,
}

impl Default for CacheRegistry {
    fn default() -> Self {
        CacheRegistry {
            remotes: Mutex::new(HashMap::new()),
            memory: Mutex::new(None),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Return the backend selected by `config`, creating it on first use
    pub async fn open(&self, config: &CacheConfig) -> CacheResult<Cache> {
        match config.kind {
            CacheKind::None => Ok(Cache::Noop(NoopCache)),
            CacheKind::Memory => Ok(Cache::Memory(self.memory())),
            CacheKind::Redis => {
                let target = RemoteTarget::from(&config.redis_or_default());
                Ok(Cache::Remote(self.remote(target).await?))
            }
        }
    }

    /// The shared in-process map
    pub fn memory(&self) -> Arc<MemoryCache> {
        let mut slot = self.memory.lock();
        Arc::clone(slot.get_or_insert_with(|| Arc::new(MemoryCache::new())))
    }

    /// The remote backend for `target`, connecting if none exists yet
    ///
    /// Concurrent callers for one target share a single connection attempt.
    /// A failed or timed out attempt leaves the target unconnected, so the
    /// next caller dials again.
    pub async fn remote(&self, target: RemoteTarget) -> CacheResult<Arc<RemoteCache>> {
        let key = target.canonical();
        let slot = Arc::clone(self.remotes.lock().entry(key.clone()).or_default());

        if let Some(existing) = slot.get() {
            debug!("Reusing redis cache for {}", key);
            return Ok(Arc::clone(existing));
        }

        let timeout = self.connect_timeout;
        let cache = slot
            .get_or_try_init(|| async {
                info!("Initializing redis cache for {}", key);
                match tokio::time::timeout(timeout, RemoteCache::connect(target)).await {
                    Ok(connected) => connected.map(Arc::new),
                    Err(_) => {
                        warn!("Connecting redis cache for {} timed out after {:?}", key, timeout);
                        Err(CacheError::ConnectTimeout {
                            target: key.clone(),
                            timeout,
                        })
                    }
                }
            })
            .await?;
        Ok(Arc::clone(cache))
    }

    /// Number of remote targets connected so far
    pub fn remote_count(&self) -> usize {
        self.remotes
            .lock()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}
