//! Mapping external group memberships to application roles

use super::{GroupSet, RoleSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Static role configuration, loaded with the policy document
///
/// `definitions` maps a role name to the groups that confer it. A role whose
/// group set holds the everyone wildcard is conferred on any principal that
/// belongs to at least one group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolesConfig {
    /// Roles whose holders are administrators
    #[serde(rename = "admins", default)]
    pub admin_roles: RoleSet,

    /// Roles whose holders are super administrators
    #[serde(rename = "superAdmins", default)]
    pub super_admin_roles: RoleSet,

    /// Role name -> groups conferring it
    #[serde(rename = "def", default)]
    pub definitions: HashMap<String, GroupSet>,
}

/// Roles and admin flags derived from a principal's groups
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleGrant {
    pub roles: RoleSet,
    pub is_super_admin: bool,
    pub is_admin: bool,
}

impl RolesConfig {
    /// Derive roles for the given groups
    ///
    /// Every definition whose group set intersects `groups` grants its role.
    /// Admin flags are raised when a granted role is a literal member of
    /// `admin_roles` / `super_admin_roles`. No groups means no roles.
    pub fn derive_roles<S: AsRef<str>>(&self, groups: &[S]) -> RoleGrant {
        let mut grant = RoleGrant::default();
        if groups.is_empty() {
            return grant;
        }

        for (role, members) in &self.definitions {
            if !members.contains(groups.iter().map(|g| g.as_ref())) {
                continue;
            }
            grant.roles.insert([role.as_str()]);
            if self.admin_roles.has(role) {
                grant.is_admin = true;
            }
            if self.super_admin_roles.has(role) {
                grant.is_super_admin = true;
            }
        }

        grant
    }
}
