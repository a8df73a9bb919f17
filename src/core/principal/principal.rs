//! Principal identity record and the cross-source merge rule

use crate::cache::Cacheable;
use crate::roles::{RoleGrant, RoleSet};
use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Claims of the token a principal was built from, kept for extensions
///
/// Serialized as a JSON object for human-readable formats and as a JSON
/// string inside binary formats, which cannot carry self-describing values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawClaims(pub Map<String, Value>);

impl RawClaims {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for RawClaims {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            self.0.serialize(serializer)
        } else {
            let text = serde_json::to_string(&self.0).map_err(serde::ser::Error::custom)?;
            serializer.serialize_str(&text)
        }
    }
}

impl<'de> Deserialize<'de> for RawClaims {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            Ok(RawClaims(Map::deserialize(deserializer)?))
        } else {
            let text = String::deserialize(deserializer)?;
            serde_json::from_str(&text)
                .map(RawClaims)
                .map_err(D::Error::custom)
        }
    }
}

/// Resolved identity of a caller plus its derived authorization attributes
///
/// `roles`, `is_admin` and `is_super_admin` are always derived from `groups`
/// through [`RolesConfig::derive_roles`](crate::roles::RolesConfig::derive_roles);
/// nothing read from a token sets them directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    /// External subject (`sub` claim)
    pub id: String,

    /// Short user name derived from `login`
    #[serde(default)]
    pub alias: String,

    #[serde(default)]
    pub login: String,

    #[serde(rename = "fname", default)]
    pub first_name: String,

    #[serde(rename = "lname", default)]
    pub last_name: String,

    #[serde(default)]
    pub email: String,

    /// Identity-provider groups, in provider order
    #[serde(default)]
    pub groups: Vec<String>,

    #[serde(rename = "managerId", default)]
    pub manager_id: String,

    #[serde(rename = "managerName", default)]
    pub manager_name: String,

    #[serde(rename = "claims", default)]
    pub raw_claims: RawClaims,

    #[serde(default)]
    pub roles: RoleSet,

    /// Token the principal was resolved from
    #[serde(rename = "raw", default)]
    pub raw_token: String,

    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,

    #[serde(rename = "isSuperAdmin", default)]
    pub is_super_admin: bool,

    /// End of the window in which this snapshot is trusted; `None` is unset
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl Cacheable for Principal {}

fn first_non_empty(primary: &mut String, secondary: &str) {
    if primary.is_empty() {
        secondary.clone_into(primary);
    }
}

impl Principal {
    /// Create a principal with only its subject set
    pub fn new(id: impl Into<String>) -> Self {
        Principal {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Replace roles and admin flags with a derived grant
    pub fn apply_grant(&mut self, grant: RoleGrant) {
        self.roles = grant.roles;
        self.is_admin = grant.is_admin;
        self.is_super_admin = grant.is_super_admin;
    }

    /// Fill gaps in this principal from `secondary`
    ///
    /// Nothing happens unless both have the same `id`. Empty scalar fields take
    /// the secondary's value and the admin flags are OR'd. When this principal
    /// has no groups, its groups, roles and admin flags are replaced wholesale
    /// by the secondary's. `expiry` is taken from the secondary only when unset.
    ///
    /// # Examples
    ///
    /// ```
    /// use authgate::Principal;
    ///
    /// let mut from_token = Principal::new("sub-1");
    /// let mut from_store = Principal::new("sub-1");
    /// from_store.login = "jane@example.com".to_string();
    ///
    /// from_token.merge(&from_store);
    /// assert_eq!(from_token.login, "jane@example.com");
    /// ```
    pub fn merge(&mut self, secondary: &Principal) {
        if self.id != secondary.id {
            return;
        }

        first_non_empty(&mut self.alias, &secondary.alias);
        first_non_empty(&mut self.login, &secondary.login);
        first_non_empty(&mut self.first_name, &secondary.first_name);
        first_non_empty(&mut self.last_name, &secondary.last_name);
        first_non_empty(&mut self.email, &secondary.email);
        first_non_empty(&mut self.manager_id, &secondary.manager_id);
        first_non_empty(&mut self.manager_name, &secondary.manager_name);
        first_non_empty(&mut self.raw_token, &secondary.raw_token);
        self.is_admin = self.is_admin || secondary.is_admin;
        self.is_super_admin = self.is_super_admin || secondary.is_super_admin;

        if self.groups.is_empty() {
            self.groups = secondary.groups.clone();
            self.roles = secondary.roles.clone();
            self.is_admin = secondary.is_admin;
            self.is_super_admin = secondary.is_super_admin;
        }

        if self.expiry.is_none() {
            self.expiry = secondary.expiry;
        }
    }

    /// By-value form of [`merge`](Self::merge)
    pub fn merged(mut self, secondary: &Principal) -> Self {
        self.merge(secondary);
        self
    }

    /// True once `expiry` has passed; an unset expiry never passes
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|expiry| expiry <= now)
    }
}
