//! Inbound request as seen by the authorizer

use std::collections::HashMap;

/// Named request attributes, typically headers
///
/// Lookups try the exact name first and fall back to an ASCII
/// case-insensitive match.
pub trait RequestAttributes: Send + Sync {
    /// First value of `name`, if present
    fn attribute(&self, name: &str) -> Option<&str>;
}

fn lookup<'a, V>(map: &'a HashMap<String, V>, name: &str) -> Option<&'a V> {
    map.get(name).or_else(|| {
        map.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

impl RequestAttributes for HashMap<String, String> {
    fn attribute(&self, name: &str) -> Option<&str> {
        lookup(self, name).map(String::as_str)
    }
}

impl RequestAttributes for HashMap<String, Vec<String>> {
    fn attribute(&self, name: &str) -> Option<&str> {
        lookup(self, name)?.first().map(String::as_str)
    }
}

/// Method, path and headers of one request
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    pub method: String,
    pub path: String,
    pub attributes: HashMap<String, Vec<String>>,
}

impl AuthRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        AuthRequest {
            method: method.into(),
            path: path.into(),
            attributes: HashMap::new(),
        }
    }

    /// Add a header value
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.entry(name.into()).or_default().push(value.into());
        self
    }
}

impl RequestAttributes for AuthRequest {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.attribute(name)
    }
}
