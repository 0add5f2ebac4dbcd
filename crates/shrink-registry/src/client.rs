//! Registry client: the seam between the resolver and the registry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use shrink_core::config::ResolverConfig;
use shrink_util::errors::ShrinkError;

use crate::document;
use crate::download;
use crate::release::{Release, ReleaseSet};
use crate::repository::RegistryEndpoint;

/// Source of package metadata.
///
/// Implementations never cache; the resolver owns caching.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Fetch and normalize every published version and dist-tag of `name`.
    async fn releases(&self, name: &str) -> Result<ReleaseSet, ShrinkError>;

    /// Resolve `range` to one release of `name`.
    ///
    /// `Ok(None)` means the package exists but nothing satisfies the range.
    async fn release(&self, name: &str, range: &str) -> Result<Option<Release>, ShrinkError> {
        let set = self.releases(name).await?;
        Ok(set.select(range).cloned())
    }
}

/// HTTP client for an npm-compatible registry.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: Client,
    endpoint: RegistryEndpoint,
    retries: u32,
}

impl RegistryClient {
    pub fn new(endpoint: RegistryEndpoint, timeout: Duration) -> miette::Result<Self> {
        Ok(Self {
            http: download::build_client(timeout)?,
            endpoint,
            retries: download::MAX_RETRIES,
        })
    }

    /// Client for the registry and timeout named in `config`.
    pub fn from_config(config: &ResolverConfig) -> miette::Result<Self> {
        Self::new(RegistryEndpoint::new(&config.registry), config.timeout())
    }

    /// Override how many times transient failures are retried.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn endpoint(&self) -> &RegistryEndpoint {
        &self.endpoint
    }
}

#[async_trait]
impl Registry for RegistryClient {
    async fn releases(&self, name: &str) -> Result<ReleaseSet, ShrinkError> {
        let url = self.endpoint.package_url(name);
        tracing::debug!("GET {url}");
        let body = download::fetch_text(&self.http, &url, self.retries).await?;
        let doc = document::parse_document(name, &body)?;
        let set = ReleaseSet::from_document(name, doc)?;
        tracing::debug!("{name}: {} versions, {} tags", set.len(), set.tags().len());
        Ok(set)
    }
}
