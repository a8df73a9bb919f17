//! Principal resolution cascade
//!
//! ```text
//! subject header ─► cache ──hit──────────────────► principal
//!                     │ miss
//!                     ▼
//!               token claims ──login present───────► principal ─► persist
//!                     │ no login
//!                     ▼
//!              system of record ─► roles ─► merge ─► 119s window ─► persist
//! ```
//!
//! The persist is detached: its outcome never changes the resolution result.

use super::claims::{principal_from_claims, TokenClaims};
use super::{Principal, PrincipalStore};
use crate::cache::Cache;
use crate::error::{AuthError, AuthResult};
use crate::policy::JwtConfig;
use crate::request::RequestAttributes;
use crate::roles::RolesConfig;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Cache key prefix principals are stored under
pub const DEFAULT_KEY_PREFIX: &str = "principal";

/// Trust window in seconds forced on a principal completed from the system of record
pub const MERGED_TRUST_WINDOW_SECS: i64 = 119;

/// Tier that produced a principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Cache,
    Claims,
    SystemOfRecord,
}

/// A resolved principal and its pending cache write
#[derive(Debug)]
pub struct Resolved {
    pub principal: Principal,
    pub source: ResolutionSource,
    /// Detached persist task, absent for cache hits and skipped writes
    pub persist: Option<JoinHandle<()>>,
}

/// Resolves the principal behind a request
#[derive(Clone)]
pub struct PrincipalResolver {
    cache: Cache,
    key_prefix: String,
    jwt: JwtConfig,
    roles: Arc<RolesConfig>,
    store: Option<Arc<dyn PrincipalStore>>,
}

impl PrincipalResolver {
    pub fn new(cache: Cache, jwt: JwtConfig, roles: Arc<RolesConfig>) -> Self {
        PrincipalResolver {
            cache,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            jwt,
            roles,
            store: None,
        }
    }

    /// Use `store` for principals whose token lacks a login
    pub fn with_store(mut self, store: Arc<dyn PrincipalStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Store principals under `prefix::subject`; an empty prefix uses the bare subject
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn cache_key(&self, subject: &str) -> String {
        if self.key_prefix.is_empty() {
            subject.to_string()
        } else {
            format!("{}::{}", self.key_prefix, subject)
        }
    }

    /// Resolve the request's principal, aborting if `cancel` fires first
    pub async fn resolve<A>(&self, attrs: &A, cancel: &CancellationToken) -> AuthResult<Resolved>
    where
        A: RequestAttributes + ?Sized,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AuthError::Cancelled),
            result = self.run(attrs) => result,
        }
    }

    async fn run<A>(&self, attrs: &A) -> AuthResult<Resolved>
    where
        A: RequestAttributes + ?Sized,
    {
        let subject = attribute(attrs, &self.jwt.sub_claim_header)
            .ok_or(AuthError::MissingAttribute("subject"))?;
        let key = self.cache_key(subject);

        if let Some(principal) = self.lookup(&key).await {
            return Ok(Resolved {
                principal,
                source: ResolutionSource::Cache,
                persist: None,
            });
        }

        let token = attribute(attrs, &self.jwt.id_token_header)
            .ok_or(AuthError::MissingAttribute("token"))?;
        let claims = TokenClaims::parse(token)?;
        let mut principal = principal_from_claims(claims, subject, &self.roles, Utc::now())?;
        let mut source = ResolutionSource::Claims;

        if principal.login.is_empty() {
            let mut record = match &self.store {
                Some(store) => store.fetch_principal(subject).await?,
                None => principal.clone(),
            };
            if record.id != principal.id {
                warn!(
                    "system of record returned principal {} for subject {}, not merged",
                    record.id, subject
                );
            }

            record.apply_grant(self.roles.derive_roles(&record.groups));
            principal.merge(&record);
            principal.expiry = Some(Utc::now() + Duration::seconds(MERGED_TRUST_WINDOW_SECS));
            source = ResolutionSource::SystemOfRecord;
        }

        principal.raw_token = token.to_string();
        let persist = self.persist(key, &principal);

        Ok(Resolved {
            principal,
            source,
            persist,
        })
    }

    /// Cached principal for `key`, if present and unexpired
    async fn lookup(&self, key: &str) -> Option<Principal> {
        match self.cache.fetch_with_ttl::<Principal>(key).await {
            Ok((principal, _)) if principal.is_expired_at(Utc::now()) => {
                debug!("cache hit expired: key={}, expiry={:?}", key, principal.expiry);
                None
            }
            Ok((principal, ttl)) => {
                debug!(
                    "cache hit: key={}, ttl={:?}, expiry={:?}",
                    key, ttl, principal.expiry
                );
                Some(principal)
            }
            Err(e) if e.is_miss() => {
                debug!("cache miss: key={}", key);
                None
            }
            Err(e) => {
                warn!("cache lookup failed for {}: {}", key, e);
                None
            }
        }
    }

    /// Spawn the cache write for `principal`, TTL bounded by its expiry
    fn persist(&self, key: String, principal: &Principal) -> Option<JoinHandle<()>> {
        let expiry = principal.expiry?;
        let ttl = match (expiry - Utc::now()).to_std() {
            Ok(ttl) if !ttl.is_zero() => ttl,
            _ => {
                debug!("principal {} already expired, not cached", principal.id);
                return None;
            }
        };

        debug!("caching principal key={}, ttl={:?}", key, ttl);
        let cache = self.cache.clone();
        let principal = principal.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = cache.put_with_ttl(&key, &principal, ttl).await {
                warn!("error caching principal for external id {}: {}", principal.id, e);
            }
        }))
    }
}

/// Non-empty attribute value
fn attribute<'a, A>(attrs: &'a A, name: &str) -> Option<&'a str>
where
    A: RequestAttributes + ?Sized,
{
    if name.is_empty() {
        return None;
    }
    attrs.attribute(name).filter(|value| !value.is_empty())
}

impl std::fmt::Debug for PrincipalResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrincipalResolver")
            .field("cache", &self.cache.kind())
            .field("key_prefix", &self.key_prefix)
            .field("store", &self.store.is_some())
            .finish_non_exhaustive()
    }
}
