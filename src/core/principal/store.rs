//! System-of-record capability
//!
//! The last tier of principal resolution. Implementations are injected; this
//! crate assumes nothing about what stores the records.

use super::Principal;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use thiserror::Error;

/// System-of-record failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no principal record for subject {0}")]
    NotFound(String),

    #[error("principal store unavailable: {0}")]
    Unavailable(String),

    #[error("principal store error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Source of authoritative principal records
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn fetch_principal(&self, subject: &str) -> Result<Principal, StoreError>;
}

/// Store answering from a fixed set of records
#[derive(Debug, Default)]
pub struct StaticPrincipalStore {
    records: RwLock<HashMap<String, Principal>>,
}

impl StaticPrincipalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from records keyed by their `id`
    pub fn from_records(records: impl IntoIterator<Item = Principal>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Load records from a JSON array of principals
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let records: Vec<Principal> = serde_json::from_slice(&bytes)?;
        Ok(Self::from_records(records))
    }

    pub fn insert(&self, record: Principal) {
        self.records.write().insert(record.id.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl PrincipalStore for StaticPrincipalStore {
    async fn fetch_principal(&self, subject: &str) -> Result<Principal, StoreError> {
        self.records
            .read()
            .get(subject)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(subject.to_string()))
    }
}

/// Store backed by an async closure
pub struct FnPrincipalStore<F>(F);

/// Adapt an async closure into a [`PrincipalStore`]
///
/// ```
/// use authgate::principal::{store_fn, Principal, StoreError};
///
/// let store = store_fn(|subject: String| async move {
///     Ok::<_, StoreError>(Principal::new(subject))
/// });
/// # let _ = store;
/// ```
pub fn store_fn<F, Fut>(f: F) -> FnPrincipalStore<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Principal, StoreError>> + Send,
{
    FnPrincipalStore(f)
}

#[async_trait]
impl<F, Fut> PrincipalStore for FnPrincipalStore<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Principal, StoreError>> + Send,
{
    async fn fetch_principal(&self, subject: &str) -> Result<Principal, StoreError> {
        (self.0)(subject.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_static_store_lookup() {
        let mut record = Principal::new("u1");
        record.login = "jane".to_string();
        let store = StaticPrincipalStore::from_records([record]);

        assert_eq!(store.fetch_principal("u1").await.unwrap().login, "jane");
        assert!(matches!(
            store.fetch_principal("u2").await,
            Err(StoreError::NotFound(s)) if s == "u2"
        ));
    }

    #[tokio::test]
    async fn test_static_store_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "u1", "login": "jane@example.com", "groups": ["eng"]}}]"#
        )
        .unwrap();

        let store = StaticPrincipalStore::from_file(file.path()).unwrap();
        assert_eq!(store.len(), 1);
        let record = store.fetch_principal("u1").await.unwrap();
        assert_eq!(record.groups, vec!["eng"]);
    }

    #[tokio::test]
    async fn test_closure_store() {
        let store = store_fn(|subject: String| async move {
            if subject == "down" {
                Err(StoreError::Unavailable("maintenance".to_string()))
            } else {
                Ok(Principal::new(subject))
            }
        });

        assert_eq!(store.fetch_principal("u1").await.unwrap().id, "u1");
        assert!(store.fetch_principal("down").await.is_err());
    }
}
