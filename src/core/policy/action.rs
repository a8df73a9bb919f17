//! Request mutations run before and after the authorization decision

use super::PolicyError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Action target naming the request headers
pub const HEADER_TARGET: &str = "header";

/// Header collection an action can edit
pub trait HeaderMutation {
    /// Replace all values of `name` with `value`
    fn set_header(&mut self, name: &str, value: &str);

    /// Append `value` to the values of `name`
    fn add_header(&mut self, name: &str, value: &str);

    fn remove_header(&mut self, name: &str);
}

/// Existing key equal to `name` ignoring ASCII case, else `name` itself
fn header_key<V>(headers: &HashMap<String, V>, name: &str) -> String {
    headers
        .keys()
        .find(|key| key.eq_ignore_ascii_case(name))
        .cloned()
        .unwrap_or_else(|| name.to_string())
}

impl HeaderMutation for HashMap<String, Vec<String>> {
    fn set_header(&mut self, name: &str, value: &str) {
        let key = header_key(self, name);
        self.insert(key, vec![value.to_string()]);
    }

    fn add_header(&mut self, name: &str, value: &str) {
        let key = header_key(self, name);
        self.entry(key).or_default().push(value.to_string());
    }

    fn remove_header(&mut self, name: &str) {
        let key = header_key(self, name);
        self.remove(&key);
    }
}

/// Single-valued headers; `add_header` keeps the first value
impl HeaderMutation for HashMap<String, String> {
    fn set_header(&mut self, name: &str, value: &str) {
        let key = header_key(self, name);
        self.insert(key, value.to_string());
    }

    fn add_header(&mut self, name: &str, value: &str) {
        let key = header_key(self, name);
        self.entry(key).or_insert_with(|| value.to_string());
    }

    fn remove_header(&mut self, name: &str) {
        let key = header_key(self, name);
        self.remove(&key);
    }
}

/// One pre or post action from a policy document
///
/// `{"type": "header", "fn": "Set", "params": ["x-team", "core"]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyAction {
    #[serde(rename = "type")]
    pub target: String,

    #[serde(rename = "fn")]
    pub function: String,

    #[serde(default)]
    pub params: Vec<String>,
}

impl PolicyAction {
    pub fn header(function: impl Into<String>, params: &[&str]) -> Self {
        PolicyAction {
            target: HEADER_TARGET.to_string(),
            function: function.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Run the action against a request's headers
    ///
    /// Actions on targets other than headers are skipped with a warning.
    pub fn apply<H: HeaderMutation + ?Sized>(&self, headers: &mut H) -> Result<(), PolicyError> {
        if self.target != HEADER_TARGET {
            warn!("unsupported action {} supplied, ignored", self.target);
            return Ok(());
        }

        match (self.function.as_str(), self.params.as_slice()) {
            ("Set", [name, value]) => headers.set_header(name, value),
            ("Add", [name, value]) => headers.add_header(name, value),
            ("Del", [name]) => headers.remove_header(name),
            _ => {
                return Err(PolicyError::UnsupportedAction(format!(
                    "{}.{} with {} params",
                    self.target,
                    self.function,
                    self.params.len()
                )))
            }
        }
        debug!("applied action {}.{} {:?}", self.target, self.function, self.params);
        Ok(())
    }
}

/// Apply actions in order, stopping at the first failure
pub fn apply_actions<H: HeaderMutation + ?Sized>(
    actions: &[PolicyAction],
    headers: &mut H,
) -> Result<(), PolicyError> {
    actions.iter().try_for_each(|action| action.apply(&mut *headers))
}
