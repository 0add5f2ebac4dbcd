//! Dependency resolution engine: manifest deduplication, the coalescing
//! worker queue, the per-resolver cache, and the hoisting optimizer.

pub mod cache;
pub mod dedupe;
pub mod graph;
pub mod optimize;
pub mod resolver;
