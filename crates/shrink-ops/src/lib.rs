//! High-level operations behind the `shrink` commands.
//!
//! Each `ops_*` module exposes a plain entry point that talks to the
//! configured registry and a `*_with` variant taking any [`Registry`], which
//! is what the tests drive.
//!
//! [`Registry`]: shrink_registry::client::Registry

pub mod ops_lock;
pub mod ops_outdated;
pub mod ops_resolve;
pub mod ops_tree;
pub mod ops_why;
