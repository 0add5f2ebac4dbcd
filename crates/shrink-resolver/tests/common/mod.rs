//! In-memory registry for resolver tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use shrink_core::manifest::Manifest;
use shrink_registry::client::Registry;
use shrink_registry::release::{Release, ReleaseSet};
use shrink_util::errors::ShrinkError;

/// Serves canned release sets and counts every fetch.
#[derive(Default)]
pub struct FakeRegistry {
    published: HashMap<String, Vec<Release>>,
    tags: HashMap<String, Vec<(String, String)>>,
    failing: HashMap<String, ShrinkError>,
    delay: Duration,
    calls: Mutex<HashMap<String, usize>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

pub fn release(name: &str, version: &str, deps: &[(&str, &str)]) -> Release {
    let manifest = Manifest {
        name: name.to_string(),
        version: version.to_string(),
        dependencies: to_map(deps),
        ..Manifest::default()
    };
    Release {
        name: name.to_string(),
        version: version.to_string(),
        manifest,
        shasum: Some(format!("sha-{name}-{version}")),
        released: Some("2020-01-01T00:00:00.000Z".to_string()),
        tag: None,
    }
}

pub fn to_map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `name@version` depending on `deps`.
    pub fn version(mut self, name: &str, version: &str, deps: &[(&str, &str)]) -> Self {
        self.published
            .entry(name.to_string())
            .or_default()
            .push(release(name, version, deps));
        self
    }

    /// Publish a prepared release.
    pub fn publish(mut self, release: Release) -> Self {
        self.published
            .entry(release.name.clone())
            .or_default()
            .push(release);
        self
    }

    pub fn tag(mut self, name: &str, tag: &str, version: &str) -> Self {
        self.tags
            .entry(name.to_string())
            .or_default()
            .push((tag.to_string(), version.to_string()));
        self
    }

    pub fn failing(mut self, name: &str, error: ShrinkError) -> Self {
        self.failing.insert(name.to_string(), error);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Most fetches ever running at the same time.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn releases(&self, name: &str) -> Result<ReleaseSet, ShrinkError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default() += 1;
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if let Some(error) = self.failing.get(name) {
            return Err(error.clone());
        }
        let Some(releases) = self.published.get(name) else {
            return Err(ShrinkError::HttpStatus {
                code: 404,
                url: format!("fake://{name}"),
            });
        };
        let tags = self.tags.get(name).cloned().unwrap_or_default();
        Ok(ReleaseSet::from_releases(name, releases.clone(), tags))
    }
}
