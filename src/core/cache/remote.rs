//! Redis-backed cache
//!
//! Values are encoded to bytes with [`Cacheable`] before transmission. An
//! absent key is always reported as a miss; every other failure is surfaced
//! as a backend error.

use super::{CacheError, CacheResult, Cacheable, RedisConfig, NO_EXPIRY};
use redis::aio::ConnectionManager;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Connection target of a remote backend
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteTarget {
    pub host: String,
    pub port: u16,
    pub db: i64,
}

impl RemoteTarget {
    /// Canonical `host:port/db` form, the registry key for this target
    pub fn canonical(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.db)
    }

    fn url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }
}

impl From<&RedisConfig> for RemoteTarget {
    fn from(cfg: &RedisConfig) -> Self {
        RemoteTarget {
            host: cfg.host.clone(),
            port: cfg.port,
            db: cfg.db,
        }
    }
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Cache backed by a redis database
///
/// The connection manager reconnects on its own; one instance per target is
/// shared through the [`CacheRegistry`](super::CacheRegistry).
#[derive(Clone)]
pub struct RemoteCache {
    target: RemoteTarget,
    conn: ConnectionManager,
}

impl RemoteCache {
    /// Connect to the target and verify it answers a PING
    pub async fn connect(target: RemoteTarget) -> CacheResult<Self> {
        debug!("Connecting redis cache at {}", target);
        let client = redis::Client::open(target.url().as_str())?;
        let mut conn = ConnectionManager::new(client).await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(RemoteCache { target, conn })
    }

    pub fn target(&self) -> &RemoteTarget {
        &self.target
    }

    pub async fn put_with_ttl<V: Cacheable>(
        &self,
        key: &str,
        value: &V,
        ttl: Duration,
    ) -> CacheResult<()> {
        let bytes = value.encode()?;
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(bytes);
        if ttl != NO_EXPIRY {
            // sub-millisecond TTLs round up so they never turn into "no expiry"
            cmd.arg("PX").arg(ttl.as_millis().max(1) as u64);
        }
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    pub async fn fetch<V: Cacheable>(&self, key: &str) -> CacheResult<V> {
        let mut conn = self.conn.clone();
        let reply: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        decode_reply(key, reply)
    }

    /// Fetch a value and the backend's own remaining TTL for it
    pub async fn fetch_with_ttl<V: Cacheable>(&self, key: &str) -> CacheResult<(V, Duration)> {
        let value = self.fetch(key).await?;
        let mut conn = self.conn.clone();
        let pttl: i64 = redis::cmd("PTTL").arg(key).query_async(&mut conn).await?;
        Ok((value, ttl_from_pttl(key, pttl)?))
    }

    pub async fn delete(&self, key: &str) -> CacheResult<u64> {
        let mut conn = self.conn.clone();
        let removed: u64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(removed)
    }
}

impl fmt::Debug for RemoteCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCache")
            .field("target", &self.target)
            .finish()
    }
}

/// Map a GET reply to a value; nil is a miss
fn decode_reply<V: Cacheable>(key: &str, reply: Option<Vec<u8>>) -> CacheResult<V> {
    match reply {
        Some(bytes) => V::decode(&bytes).map_err(|err| err.for_key(key)),
        None => Err(CacheError::miss(key)),
    }
}

/// Map a PTTL reply: -2 means the key is gone, -1 means no expiry
fn ttl_from_pttl(key: &str, pttl: i64) -> CacheResult<Duration> {
    match pttl {
        -2 => Err(CacheError::miss(key)),
        -1 => Ok(NO_EXPIRY),
        ms if ms >= 0 => Ok(Duration::from_millis(ms as u64)),
        other => Err(CacheError::Config(format!(
            "unexpected PTTL reply {} for key {}",
            other, key
        ))),
    }
}
