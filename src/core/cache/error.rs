//! Cache error taxonomy
//!
//! A miss (absent key, or a stored value of another type) is kept apart from
//! backend failures so callers can fall through to another source on a miss
//! and surface everything else.

use std::time::Duration;
use thiserror::Error;

/// Cache operation result type
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache operation errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// No value is stored for the key
    #[error("cache-miss: no cached value found for key {key}")]
    Miss { key: String },

    /// A value is stored but it is not of the requested type
    #[error("cache value for key {key} of type {stored} cannot be read as {requested}")]
    TypeMismatch {
        key: String,
        stored: &'static str,
        requested: &'static str,
    },

    /// Value could not be encoded or decoded
    #[error("cache codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// Remote backend failure (connectivity, protocol)
    #[error("cache backend error: {0}")]
    Backend(#[from] redis::RedisError),

    /// First connection to a remote target took too long
    #[error("connecting cache backend {target} timed out after {timeout:?}")]
    ConnectTimeout { target: String, timeout: Duration },

    /// Backend kind not recognised
    #[error("cache type {0} not supported")]
    UnsupportedKind(String),

    /// Invalid backend configuration
    #[error("invalid cache configuration: {0}")]
    Config(String),
}

impl CacheError {
    pub(crate) fn miss(key: &str) -> Self {
        CacheError::Miss {
            key: key.to_string(),
        }
    }

    /// Attach `key` to a type mismatch raised by a codec
    pub(crate) fn for_key(self, key: &str) -> Self {
        match self {
            CacheError::TypeMismatch {
                stored, requested, ..
            } => CacheError::TypeMismatch {
                key: key.to_string(),
                stored,
                requested,
            },
            other => other,
        }
    }

    /// True for errors that mean "nothing usable is cached"
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::Miss { .. } | CacheError::TypeMismatch { .. })
    }
}
