//! Error types for request authorization

use crate::cache::CacheError;
use crate::policy::{Effect, PolicyError};
use crate::principal::{ClaimError, ClaimsPrincipalError, StoreError};
use std::time::Duration;
use thiserror::Error;

/// Authorization result type
pub type AuthResult<T> = Result<T, AuthError>;

/// Reasons a request is rejected
///
/// Every variant is terminal for the request that produced it.
#[derive(Error, Debug)]
pub enum AuthError {
    /// A required request attribute was absent
    #[error("no {0} value found in request")]
    MissingAttribute(&'static str),

    /// Token could not be read
    #[error("error loading principal from claims in token: {0}")]
    Claims(#[from] ClaimError),

    /// Token `sub` disagrees with the subject attribute
    #[error("incorrect sub claim {actual} found in token, expected {expected}")]
    SubjectMismatch { expected: String, actual: String },

    /// Fallback lookup of an incomplete principal failed
    #[error("token didn't contain enough claims and fetching the principal failed: {0}")]
    SystemOfRecord(#[from] StoreError),

    /// Cache failure where the cache was the only option
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// No policy matched
    #[error("{0}")]
    NotAuthorized(PolicyError),

    /// A policy matched with an effect other than allow
    #[error("access to {method} {path} for {login} denied by auth policy {policy} ({effect})")]
    Denied {
        login: String,
        method: String,
        path: String,
        policy: String,
        effect: Effect,
    },

    #[error("{0:?} not authorized to make this request as it is not an administrator user")]
    NotAdmin(String),

    #[error("{alias:?} not authorized to make a request on behalf of {requested:?}")]
    AliasMismatch { alias: String, requested: String },

    /// Header action failed
    #[error("policy action failed: {0}")]
    Action(PolicyError),

    #[error("request cancelled")]
    Cancelled,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl From<PolicyError> for AuthError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::NoMatch { .. } => AuthError::NotAuthorized(err),
            other => AuthError::Action(other),
        }
    }
}

impl From<ClaimsPrincipalError> for AuthError {
    fn from(err: ClaimsPrincipalError) -> Self {
        match err {
            ClaimsPrincipalError::Claims(e) => AuthError::Claims(e),
            ClaimsPrincipalError::SubjectMismatch { expected, actual } => {
                AuthError::SubjectMismatch { expected, actual }
            }
        }
    }
}

impl AuthError {
    /// True for rejections decided by the policy rather than a resolution failure
    pub fn is_policy_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::NotAuthorized(_)
                | AuthError::Denied { .. }
                | AuthError::NotAdmin(_)
                | AuthError::AliasMismatch { .. }
        )
    }
}
