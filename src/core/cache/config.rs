//! Cache backend selection
//!
//! ```toml
//! [cache]
//! kind = "redis"      # none | memory | redis
//!
//! [cache.redis]
//! host = "localhost"
//! port = 6379
//! db = 0
//! ```

use super::CacheError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_REDIS_HOST: &str = "localhost";
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// Which backend to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    /// Caching disabled
    #[serde(alias = "nil")]
    None,
    /// Process-local map
    #[serde(alias = "in-process")]
    Memory,
    /// Remote redis database
    #[default]
    #[serde(alias = "remote")]
    Redis,
}

impl FromStr for CacheKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "nil" => Ok(CacheKind::None),
            "memory" | "in-process" => Ok(CacheKind::Memory),
            "redis" | "remote" => Ok(CacheKind::Redis),
            _ => Err(CacheError::UnsupportedKind(s.to_string())),
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheKind::None => "none",
            CacheKind::Memory => "memory",
            CacheKind::Redis => "redis",
        };
        f.write_str(name)
    }
}

/// Redis connection parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub db: i64,
}

fn default_host() -> String {
    DEFAULT_REDIS_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_REDIS_PORT
}

impl Default for RedisConfig {
    fn default() -> Self {
        RedisConfig {
            host: default_host(),
            port: DEFAULT_REDIS_PORT,
            db: 0,
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub kind: CacheKind,
    #[serde(default, alias = "redis-config", alias = "redis_config")]
    pub redis: Option<RedisConfig>,
}

impl CacheConfig {
    pub fn none() -> Self {
        CacheConfig {
            kind: CacheKind::None,
            redis: None,
        }
    }

    pub fn memory() -> Self {
        CacheConfig {
            kind: CacheKind::Memory,
            redis: None,
        }
    }

    pub fn redis(redis: RedisConfig) -> Self {
        CacheConfig {
            kind: CacheKind::Redis,
            redis: Some(redis),
        }
    }

    /// Redis parameters, falling back to the defaults
    pub fn redis_or_default(&self) -> RedisConfig {
        self.redis.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("none".parse::<CacheKind>().unwrap(), CacheKind::None);
        assert_eq!("Memory".parse::<CacheKind>().unwrap(), CacheKind::Memory);
        assert_eq!("redis".parse::<CacheKind>().unwrap(), CacheKind::Redis);
    }

    #[test]
    fn test_unknown_kind_is_error() {
        let err = "memcached".parse::<CacheKind>().unwrap_err();
        assert!(matches!(err, CacheError::UnsupportedKind(k) if k == "memcached"));
    }

    #[test]
    fn test_unknown_kind_fails_to_deserialize() {
        let result: Result<CacheConfig, _> = serde_json::from_str(r#"{"kind": "memcached"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults() {
        let cfg: CacheConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.kind, CacheKind::Redis);
        let redis = cfg.redis_or_default();
        assert_eq!(redis.host, "localhost");
        assert_eq!(redis.port, 6379);
        assert_eq!(redis.db, 0);
    }

    #[test]
    fn test_parse_toml() {
        let cfg: CacheConfig = toml::from_str(
            r#"
            kind = "redis"

            [redis]
            host = "cache.internal"
            db = 3
            "#,
        )
        .unwrap();
        let redis = cfg.redis.unwrap();
        assert_eq!(redis.host, "cache.internal");
        assert_eq!(redis.port, 6379);
        assert_eq!(redis.db, 3);
    }
}
