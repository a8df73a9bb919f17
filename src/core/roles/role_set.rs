//! Role and group name sets
//!
//! A `RoleSet` holds role (or group) names. The reserved member `*` means
//! "everyone": a set holding it matches any principal, whatever is asked.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Reserved member that makes a set match anything
pub const EVERYONE: &str = "*";

/// Set of role names with wildcard-everyone semantics
///
/// Backed by a `BTreeSet` so iteration and serialization are always in
/// lexicographic order. Serializes as a plain list of names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<String>);

/// Groups conferring a role share the representation of roles
pub type GroupSet = RoleSet;

impl RoleSet {
    /// Create an empty set
    pub fn new() -> Self {
        RoleSet(BTreeSet::new())
    }

    /// Create a set holding only the everyone wildcard
    pub fn everyone() -> Self {
        Self::from_roles([EVERYONE])
    }

    /// Create a set from the given names
    pub fn from_roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RoleSet(roles.into_iter().map(Into::into).collect())
    }

    /// True if the set holds the wildcard, or any of the supplied names
    ///
    /// # Examples
    ///
    /// ```
    /// use authgate::RoleSet;
    ///
    /// let admins = RoleSet::from_roles(["admin"]);
    /// assert!(admins.contains(["viewer", "admin"]));
    /// assert!(!admins.contains(["viewer"]));
    ///
    /// let everyone = RoleSet::everyone();
    /// assert!(everyone.contains(Vec::<String>::new()));
    /// ```
    pub fn contains<I, S>(&self, names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.is_wildcard() {
            return true;
        }
        names.into_iter().any(|name| self.0.contains(name.as_ref()))
    }

    /// True if the set holds the wildcard, or shares any member with `other`
    pub fn contains_set(&self, other: &RoleSet) -> bool {
        if self.is_wildcard() {
            return true;
        }
        other.0.iter().any(|name| self.0.contains(name))
    }

    /// Literal membership test; the wildcard gets no special treatment
    pub fn has(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Add names to the set (idempotent)
    pub fn insert<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.extend(names.into_iter().map(Into::into));
    }

    /// True if the everyone wildcard is a member
    pub fn is_wildcard(&self) -> bool {
        self.0.contains(EVERYONE)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Members in lexicographic order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Members as a sorted list
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_roles(iter)
    }
}

impl<'a> IntoIterator for &'a RoleSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
