//! HTTP authorization policies
//!
//! A policy document ([`AuthPolicy`]) names the token headers, maps groups
//! to roles, lists header actions, and holds the ordered rules
//! ([`Policies`]) requests are matched against.

mod action;
mod document;
mod item;

pub use action::{apply_actions, HeaderMutation, PolicyAction, HEADER_TARGET};
pub use document::{AuthPolicy, JwtConfig, PolicyConfig};
pub use item::{Effect, Policies, PolicyItem, WILDCARD};

use std::path::PathBuf;
use thiserror::Error;

/// Policy loading and evaluation errors
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("error reading auth policy file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid auth policy document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported policy action: {0}")]
    UnsupportedAction(String),

    #[error("subject {login} not explicitly authorized to {method} {path}")]
    NoMatch {
        login: String,
        method: String,
        path: String,
    },
}
