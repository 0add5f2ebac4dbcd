//! Core data types for the shrink dependency resolver.
//!
//! This crate defines the manifest model (`package.json` and the per-version
//! manifests published in registry documents), the resolver configuration,
//! and the shrinkwrap lockfile that resolution produces.
//!
//! This crate is intentionally free of async code and network I/O.

/// File name of the root manifest looked up in a project directory.
pub const MANIFEST_FILE: &str = "package.json";

/// File name of the generated lockfile.
pub const SHRINKWRAP_FILE: &str = "npm-shrinkwrap.json";

pub mod config;
pub mod lockfile;
pub mod manifest;
