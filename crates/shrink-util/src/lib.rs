//! Shared utilities for the shrink dependency resolver.
//!
//! This crate provides cross-cutting concerns used by all other shrink crates:
//! the unified error type, filesystem helpers, and terminal status/progress
//! indicators.

pub mod errors;
pub mod fs;
pub mod progress;
