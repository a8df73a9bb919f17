//! Authorization core
//!
//! Leaves first: [`roles`] and [`cache`], then [`principal`] resolution, the
//! [`policy`] matcher, and the [`gate`] tying them to a [`request`].

pub mod cache;
pub mod gate;
pub mod policy;
pub mod principal;
pub mod request;
pub mod roles;
