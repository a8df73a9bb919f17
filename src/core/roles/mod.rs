//! Roles: role sets and the group -> role mapping

mod mapping;
mod role_set;

pub use mapping::{RoleGrant, RolesConfig};
pub use role_set::{GroupSet, RoleSet, EVERYONE};
