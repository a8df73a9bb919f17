//! Policy document: token headers, role mapping, actions and rules

use super::{Effect, Policies, PolicyAction, PolicyError, PolicyItem, WILDCARD};
use crate::roles::{RoleSet, RolesConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, error};

/// Request headers carrying the identity token and its subject
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JwtConfig {
    /// Header holding the encoded identity token
    pub id_token_header: String,
    pub access_token_header: String,
    /// Header holding the token's `sub` claim
    pub sub_claim_header: String,
    /// Accepted for compatibility; signatures are never verified here
    pub validate_jwt_signature: bool,
    pub jwks: Vec<String>,
    pub jwks_uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub jwt: JwtConfig,
    pub roles: RolesConfig,
}

/// Complete authorization policy document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthPolicy {
    #[serde(default)]
    pub config: PolicyConfig,

    #[serde(rename = "preActions", default)]
    pub pre_actions: Vec<PolicyAction>,

    #[serde(rename = "authrPolicy", default)]
    pub policies: Policies,

    #[serde(rename = "postActions", default)]
    pub post_actions: Vec<PolicyAction>,
}

impl Default for AuthPolicy {
    /// Admins may do anything, everyone else is denied
    fn default() -> Self {
        AuthPolicy {
            config: PolicyConfig {
                jwt: JwtConfig {
                    id_token_header: "x-jwt-data".to_string(),
                    ..Default::default()
                },
                roles: RolesConfig::default(),
            },
            pre_actions: Vec::new(),
            policies: Policies::new([
                PolicyItem::new(
                    "default_allow_all_to_admins",
                    WILDCARD,
                    WILDCARD,
                    Effect::Allow,
                    RoleSet::from_roles(["admin"]),
                ),
                PolicyItem::new(
                    "default_deny_all_to_all",
                    WILDCARD,
                    WILDCARD,
                    Effect::Deny,
                    RoleSet::everyone(),
                ),
            ]),
            post_actions: Vec::new(),
        }
    }
}

impl AuthPolicy {
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let policy: AuthPolicy = serde_json::from_str(json)?;
        debug!("loaded {} policies", policy.policies.len());
        Ok(policy)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Load a document, falling back to [`AuthPolicy::default`] on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::from_file(path).unwrap_or_else(|e| {
            error!(
                "error reading auth policy file {}: {}; using default policy",
                path.display(),
                e
            );
            Self::default()
        })
    }

    pub fn to_json(&self) -> Result<String, PolicyError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
