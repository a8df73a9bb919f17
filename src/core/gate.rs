//! Request authorization: resolve the principal, match it, enforce the effect

use crate::cache::Cache;
use crate::error::{AuthError, AuthResult};
use crate::policy::{apply_actions, AuthPolicy, Effect, HeaderMutation, PolicyItem};
use crate::principal::{Principal, PrincipalResolver, PrincipalStore, ResolutionSource};
use crate::request::AuthRequest;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// An allowed request
#[derive(Debug, Serialize)]
pub struct Authorized {
    pub principal: Principal,
    pub policy: PolicyItem,
    pub source: ResolutionSource,
    /// Pending cache write of the principal
    #[serde(skip)]
    pub persist: Option<JoinHandle<()>>,
}

/// Authorizes requests against one policy document
#[derive(Debug, Clone)]
pub struct Authorizer {
    policy: Arc<AuthPolicy>,
    resolver: PrincipalResolver,
    timeout: Option<Duration>,
}

impl Authorizer {
    pub fn new(policy: AuthPolicy, cache: Cache) -> Self {
        if policy.config.jwt.validate_jwt_signature {
            warn!(
                "validateJwtSignature is set but this authorizer does not verify token signatures"
            );
        }

        let resolver = PrincipalResolver::new(
            cache,
            policy.config.jwt.clone(),
            Arc::new(policy.config.roles.clone()),
        );
        Authorizer {
            policy: Arc::new(policy),
            resolver,
            timeout: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn PrincipalStore>) -> Self {
        self.resolver = self.resolver.with_store(store);
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.resolver = self.resolver.with_key_prefix(prefix);
        self
    }

    /// Fail requests whose resolution and matching take longer than `limit`
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn policy(&self) -> &AuthPolicy {
        &self.policy
    }

    pub fn resolver(&self) -> &PrincipalResolver {
        &self.resolver
    }

    /// Decide whether `request` may proceed
    ///
    /// Only a matched rule with [`Effect::Allow`] yields `Ok`. Every other
    /// outcome is an [`AuthError`] carrying the reason.
    pub async fn authorize(
        &self,
        request: &AuthRequest,
        cancel: &CancellationToken,
    ) -> AuthResult<Authorized> {
        debug!("processing auth for {} {}", request.method, request.path);

        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.decide(request, cancel))
                .await
                .unwrap_or(Err(AuthError::Timeout(limit))),
            None => self.decide(request, cancel).await,
        };

        if let Err(e) = &outcome {
            error!("{} {} rejected: {}", request.method, request.path, e);
        }
        outcome
    }

    async fn decide(
        &self,
        request: &AuthRequest,
        cancel: &CancellationToken,
    ) -> AuthResult<Authorized> {
        let resolved = self.resolver.resolve(request, cancel).await?;
        let principal = resolved.principal;

        let item = self
            .policy
            .policies
            .match_request(&principal, &request.method, &request.path)?;

        if item.effect != Effect::Allow {
            return Err(AuthError::Denied {
                login: principal.login,
                method: request.method.clone(),
                path: request.path.clone(),
                policy: item.name.clone(),
                effect: item.effect,
            });
        }

        Ok(Authorized {
            policy: item.clone(),
            principal,
            source: resolved.source,
            persist: resolved.persist,
        })
    }

    /// Run the document's pre actions on the request headers
    pub fn apply_pre_actions<H: HeaderMutation + ?Sized>(&self, headers: &mut H) -> AuthResult<()> {
        Ok(apply_actions(&self.policy.pre_actions, headers)?)
    }

    /// Run the document's post actions on the request headers
    pub fn apply_post_actions<H: HeaderMutation + ?Sized>(
        &self,
        headers: &mut H,
    ) -> AuthResult<()> {
        Ok(apply_actions(&self.policy.post_actions, headers)?)
    }
}

/// Pass only administrators and super administrators
pub fn require_admin(principal: &Principal) -> AuthResult<()> {
    if principal.is_admin || principal.is_super_admin {
        Ok(())
    } else {
        Err(AuthError::NotAdmin(principal.alias.clone()))
    }
}

/// Pass administrators, or a principal acting as itself
///
/// `requested` is the alias named by the request, e.g. the `{alias}`
/// segment of `/users/{alias}/settings`.
pub fn require_admin_or_alias(principal: &Principal, requested: &str) -> AuthResult<()> {
    if principal.is_admin || principal.is_super_admin || principal.alias == requested {
        Ok(())
    } else {
        Err(AuthError::AliasMismatch {
            alias: principal.alias.clone(),
            requested: requested.to_string(),
        })
    }
}
