//! Settings file for building an [`Authorizer`]
//!
//! ```toml
//! policy_path = "policy.json"
//! principals_path = "principals.json"
//! cache_key_prefix = "principal"
//! request_timeout_ms = 2000
//!
//! [cache]
//! kind = "memory"
//! ```

use crate::cache::{CacheConfig, CacheError, CacheRegistry};
use crate::gate::Authorizer;
use crate::policy::AuthPolicy;
use crate::principal::{StaticPrincipalStore, DEFAULT_KEY_PREFIX};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("error reading settings file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("error loading principals from {path}: {source}")]
    Principals {
        path: PathBuf,
        source: anyhow::Error,
    },
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

/// Authorizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Policy document; the built-in policy is used when unset or unreadable
    #[serde(default)]
    pub policy_path: Option<PathBuf>,

    /// JSON array of principals serving as the system of record
    #[serde(default)]
    pub principals_path: Option<PathBuf>,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default = "default_key_prefix")]
    pub cache_key_prefix: String,

    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            policy_path: None,
            principals_path: None,
            cache: CacheConfig::default(),
            cache_key_prefix: default_key_prefix(),
            request_timeout_ms: None,
        }
    }
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn policy(&self) -> AuthPolicy {
        match &self.policy_path {
            Some(path) => AuthPolicy::load_or_default(path),
            None => AuthPolicy::default(),
        }
    }

    /// Build an authorizer, opening its cache through `registry`
    pub async fn authorizer(&self, registry: &CacheRegistry) -> Result<Authorizer, ConfigError> {
        let cache = registry.open(&self.cache).await?;
        info!("using {} cache", cache.kind());

        let mut authorizer =
            Authorizer::new(self.policy(), cache).with_key_prefix(self.cache_key_prefix.clone());

        if let Some(path) = &self.principals_path {
            let store = StaticPrincipalStore::from_file(path).map_err(|source| {
                ConfigError::Principals {
                    path: path.clone(),
                    source,
                }
            })?;
            info!("loaded {} principals from {}", store.len(), path.display());
            authorizer = authorizer.with_store(Arc::new(store));
        }

        if let Some(limit) = self.request_timeout() {
            authorizer = authorizer.with_timeout(limit);
        }
        Ok(authorizer)
    }
}
