//! npm registry protocol: version range matching, registry document parsing,
//! release sets with dist-tag expansion, and the HTTP registry client.

pub mod client;
pub mod document;
pub mod download;
pub mod release;
pub mod repository;
pub mod version;
