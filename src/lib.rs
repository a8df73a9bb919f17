//! # authgate - principal resolution and HTTP policy authorization
//!
//! `authgate` decides whether the caller behind an HTTP request may proceed:
//!
//! - **Principal resolution**: cache, then identity-token claims, then an
//!   injected system of record, merged into one [`Principal`]
//! - **Role mapping**: identity-provider groups become application roles
//! - **Policy matching**: an ordered rule list, first match wins
//! - **Pluggable cache**: disabled, in-process or redis, one connection per target
//!
//! Token signatures are not verified: the proxy that attached the token
//! header is the trust boundary.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use authgate::cache::{CacheConfig, CacheRegistry};
//! use authgate::{AuthPolicy, AuthRequest, Authorizer};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = CacheRegistry::new();
//! let cache = registry.open(&CacheConfig::memory()).await?;
//! let authorizer = Authorizer::new(AuthPolicy::from_file("policy.json")?, cache);
//!
//! let request = AuthRequest::new("GET", "/api/v1/dbs")
//!     .with_header("x-amzn-oidc-identity", "sub-1")
//!     .with_header("x-amzn-oidc-data", "eyJ...");
//! let authorized = authorizer.authorize(&request, &CancellationToken::new()).await?;
//! println!("{} allowed by {}", authorized.principal.login, authorized.policy.name);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;

pub use crate::core::{cache, gate, policy, principal, request, roles};

pub use crate::config::{ConfigError, Settings};
pub use crate::core::cache::{Cache, CacheError, CacheRegistry};
pub use crate::core::gate::{require_admin, require_admin_or_alias, Authorized, Authorizer};
pub use crate::core::policy::{AuthPolicy, Effect, Policies, PolicyItem};
pub use crate::core::principal::{
    Principal, PrincipalResolver, PrincipalStore, ResolutionSource, StoreError,
};
pub use crate::core::request::{AuthRequest, RequestAttributes};
pub use crate::core::roles::{RoleSet, RolesConfig, EVERYONE};
pub use crate::error::{AuthError, AuthResult};
