//! Authorization rules and the first-match evaluator
//!
//! ```text
//! matcher           | subjects        | effect
//! ------------------+-----------------+-------
//! GET /api/v1/dbs   | *               | allow
//! *   /api/v1/dbs   | admin,managers  | allow
//! *   *             | *               | deny
//! ```
//!
//! Rules are evaluated in definition order and the first match wins. Method
//! and path are compared case-insensitively, or match anything when `*`.

use super::PolicyError;
use crate::principal::Principal;
use crate::roles::RoleSet;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, trace};

/// Method or path value matching anything
pub const WILDCARD: &str = "*";

/// Outcome of a matched rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::Allow => write!(f, "allow"),
            Effect::Deny => write!(f, "deny"),
        }
    }
}

/// One authorization rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyItem {
    /// Position in the document, assigned at load
    #[serde(skip)]
    pub priority: usize,

    pub name: String,

    #[serde(rename = "method", default)]
    pub http_method: String,

    #[serde(rename = "url", default)]
    pub http_path: String,

    pub effect: Effect,

    #[serde(default)]
    pub subjects: RoleSet,
}

impl PolicyItem {
    pub fn new(
        name: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
        effect: Effect,
        subjects: RoleSet,
    ) -> Self {
        PolicyItem {
            priority: 0,
            name: name.into(),
            http_method: method.into(),
            http_path: path.into(),
            effect,
            subjects,
        }
    }

    fn matches_method(&self, method: &str) -> bool {
        self.http_method == WILDCARD || eq_fold(&self.http_method, method)
    }

    fn matches_path(&self, path: &str) -> bool {
        self.http_path == WILDCARD || eq_fold(&self.http_path, path)
    }

    /// True if this rule applies to the request and principal
    pub fn matches(&self, principal: &Principal, method: &str, path: &str) -> bool {
        self.matches_method(method)
            && self.matches_path(path)
            && self.subjects.contains_set(&principal.roles)
    }
}

/// Case-insensitive equality over Unicode, not just ASCII
fn eq_fold(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Ordered rule list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Policies(Vec<PolicyItem>);

impl Policies {
    /// Build from rules in evaluation order, numbering their priorities
    pub fn new(items: impl IntoIterator<Item = PolicyItem>) -> Self {
        let items = items
            .into_iter()
            .enumerate()
            .map(|(priority, item)| PolicyItem { priority, ..item })
            .collect();
        Policies(items)
    }

    /// First rule matching the request
    ///
    /// Never falls back to an implicit effect: no match is
    /// [`PolicyError::NoMatch`].
    ///
    /// # Examples
    ///
    /// ```
    /// use authgate::policy::{Effect, Policies, PolicyItem};
    /// use authgate::{Principal, RoleSet};
    ///
    /// let policies = Policies::new([
    ///     PolicyItem::new("admins", "*", "*", Effect::Allow, RoleSet::from_roles(["admin"])),
    ///     PolicyItem::new("rest", "*", "*", Effect::Deny, RoleSet::everyone()),
    /// ]);
    ///
    /// let mut principal = Principal::new("sub-1");
    /// principal.roles = RoleSet::from_roles(["admin"]);
    /// let item = policies.match_request(&principal, "GET", "/x").unwrap();
    /// assert_eq!(item.effect, Effect::Allow);
    /// ```
    pub fn match_request(
        &self,
        principal: &Principal,
        method: &str,
        path: &str,
    ) -> Result<&PolicyItem, PolicyError> {
        for item in &self.0 {
            trace!(
                "matching {} {} {} to {} ({})",
                principal.login,
                method,
                path,
                item.name,
                item.priority
            );
            if item.matches(principal, method, path) {
                debug!(
                    "auth match found: {} {} {} to {} ({})",
                    principal.login, method, path, item.name, item.priority
                );
                return Ok(item);
            }
        }

        Err(PolicyError::NoMatch {
            login: principal.login.clone(),
            method: method.to_string(),
            path: path.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PolicyItem> {
        self.0.iter()
    }
}

impl<'de> Deserialize<'de> for Policies {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Policies::new(Vec::<PolicyItem>::deserialize(deserializer)?))
    }
}

impl FromIterator<PolicyItem> for Policies {
    fn from_iter<I: IntoIterator<Item = PolicyItem>>(iter: I) -> Self {
        Policies::new(iter)
    }
}

impl<'a> IntoIterator for &'a Policies {
    type Item = &'a PolicyItem;
    type IntoIter = std::slice::Iter<'a, PolicyItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
