//! Resolution cache scoped to one resolver instance.
//!
//! Holds every release set fetched so far (keyed by package name) and every
//! range already resolved against one (keyed by `name@range`). A warm cache
//! lets a second resolution of the same manifest run without any registry
//! call. Failures are never cached.

use std::collections::HashMap;
use std::sync::Arc;

use shrink_registry::release::{Release, ReleaseSet};

/// Outcome of looking a spec up in the cache.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    /// The range was resolved before, or resolves against a known release set.
    Hit(Release),
    /// The release set is known and nothing in it satisfies the range.
    Unsatisfiable,
    /// Nothing known about this package yet.
    Miss,
}

#[derive(Debug, Default)]
pub struct ResolutionCache {
    releases: HashMap<String, Arc<ReleaseSet>>,
    resolved: HashMap<String, Release>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `name@range` from cached data only.
    ///
    /// A newly computed answer against a cached release set is remembered
    /// under `key` as well.
    pub fn lookup(&mut self, key: &str, name: &str, range: &str) -> CacheLookup {
        if let Some(release) = self.resolved.get(key) {
            return CacheLookup::Hit(release.clone());
        }
        let Some(set) = self.releases.get(name) else {
            return CacheLookup::Miss;
        };
        match set.select(range) {
            Some(release) => {
                let release = release.clone();
                self.resolved.insert(key.to_string(), release.clone());
                CacheLookup::Hit(release)
            }
            None => CacheLookup::Unsatisfiable,
        }
    }

    pub fn insert_releases(&mut self, set: ReleaseSet) -> Arc<ReleaseSet> {
        let set = Arc::new(set);
        self.releases.insert(set.name().to_string(), set.clone());
        set
    }

    pub fn releases(&self, name: &str) -> Option<Arc<ReleaseSet>> {
        self.releases.get(name).cloned()
    }

    /// The latest known version of `name`, if its release set is cached.
    pub fn latest(&self, name: &str) -> Option<String> {
        self.releases
            .get(name)
            .and_then(|set| set.latest())
            .map(str::to_string)
    }

    /// Number of cached release sets.
    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.releases.clear();
        self.resolved.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shrink_core::manifest::Manifest;

    fn release(version: &str) -> Release {
        Release {
            name: "demo".into(),
            version: version.into(),
            manifest: Manifest::default(),
            shasum: None,
            released: None,
            tag: None,
        }
    }

    fn cache() -> ResolutionCache {
        let mut cache = ResolutionCache::new();
        cache.insert_releases(ReleaseSet::from_releases(
            "demo",
            [release("1.0.0"), release("1.2.0"), release("2.0.0")],
            [],
        ));
        cache
    }

    #[test]
    fn miss_for_unknown_package() {
        let mut cache = cache();
        assert!(matches!(cache.lookup("other@^1.0.0", "other", "^1.0.0"), CacheLookup::Miss));
    }

    #[test]
    fn resolves_against_cached_set() {
        let mut cache = cache();
        match cache.lookup("demo@^1.0.0", "demo", "^1.0.0") {
            CacheLookup::Hit(r) => assert_eq!(r.version, "1.2.0"),
            other => panic!("expected hit, got {other:?}"),
        }
        assert!(cache.resolved.contains_key("demo@^1.0.0"));
        assert!(matches!(
            cache.lookup("demo@^3.0.0", "demo", "^3.0.0"),
            CacheLookup::Unsatisfiable
        ));
        assert_eq!(cache.latest("demo").as_deref(), Some("2.0.0"));
    }

    #[test]
    fn clear_forgets_everything() {
        let mut cache = cache();
        cache.lookup("demo@^1.0.0", "demo", "^1.0.0");
        cache.clear();
        assert!(cache.is_empty());
        assert!(matches!(cache.lookup("demo@^1.0.0", "demo", "^1.0.0"), CacheLookup::Miss));
    }
}
