//! Principals and how they are resolved
//!
//! - [`Principal`] - identity record and its merge rule
//! - [`TokenClaims`] - claims read from an identity token, unverified
//! - [`PrincipalStore`] - injected system of record
//! - [`PrincipalResolver`] - cache, claims, system-of-record cascade

pub(crate) mod claims;
#[allow(clippy::module_inception)]
mod principal;
mod resolver;
mod store;

pub use claims::{
    alias_from_login, principal_from_claims, ClaimError, ClaimsPrincipalError, TokenClaims,
    DEFAULT_CLAIMS_TTL_SECS,
};
pub use principal::{Principal, RawClaims};
pub use resolver::{
    PrincipalResolver, ResolutionSource, Resolved, DEFAULT_KEY_PREFIX, MERGED_TRUST_WINDOW_SECS,
};
pub use store::{store_fn, FnPrincipalStore, PrincipalStore, StaticPrincipalStore, StoreError};
