//! Normalized view of a package's published releases.

use std::collections::BTreeMap;

use shrink_core::manifest::Manifest;
use shrink_util::errors::ShrinkError;

use crate::document::RegistryDocument;
use crate::version;

/// One concrete published release of a package.
#[derive(Debug, Clone, PartialEq)]
pub struct Release {
    pub name: String,
    pub version: String,
    /// The manifest published with this version (dependency groups, license, author).
    pub manifest: Manifest,
    pub shasum: Option<String>,
    /// ISO-8601 publish time, when the registry reports one.
    pub released: Option<String>,
    /// Set on the pseudo-release a dist-tag expands into.
    pub tag: Option<String>,
}

impl Release {
    pub fn licenses(&self) -> Vec<String> {
        self.manifest.license_names()
    }

    pub fn author(&self) -> Option<String> {
        self.manifest
            .author
            .as_ref()
            .and_then(|a| a.name())
            .map(str::to_string)
    }
}

/// Every release of one package, keyed by version and by dist-tag name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReleaseSet {
    name: String,
    releases: BTreeMap<String, Release>,
    tags: BTreeMap<String, String>,
    latest: Option<String>,
}

impl ReleaseSet {
    /// Normalize a registry document into a release set.
    ///
    /// Each dist-tag becomes an extra lookup key whose release is an
    /// independent copy of the tagged version, annotated with the tag name.
    pub fn from_document(name: &str, doc: RegistryDocument) -> Result<Self, ShrinkError> {
        let published: BTreeMap<String, Option<String>> = doc
            .time
            .keys()
            .map(|v| (v.clone(), doc.published_at(v).map(str::to_string)))
            .collect();

        let Some(versions) = doc.versions else {
            return Err(ShrinkError::MalformedData {
                message: format!("Registry document for {name} has no versions field"),
            });
        };

        let mut releases = BTreeMap::new();
        for (version, vdoc) in versions {
            let release = Release {
                name: name.to_string(),
                version: version.clone(),
                shasum: vdoc.dist.and_then(|d| d.shasum),
                released: published.get(&version).cloned().flatten(),
                manifest: vdoc.manifest,
                tag: None,
            };
            releases.insert(version, release);
        }

        let mut set = Self {
            name: name.to_string(),
            releases,
            tags: BTreeMap::new(),
            latest: None,
        };
        for (tag, version) in doc.dist_tags {
            set.add_tag(&tag, &version);
        }
        set.latest = set
            .tags
            .get("latest")
            .cloned()
            .or_else(|| set.highest().map(str::to_string));
        Ok(set)
    }

    /// Build a set directly from releases, e.g. for an offline mirror.
    pub fn from_releases(
        name: &str,
        releases: impl IntoIterator<Item = Release>,
        tags: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let mut set = Self {
            name: name.to_string(),
            releases: releases
                .into_iter()
                .map(|r| (r.version.clone(), r))
                .collect(),
            tags: BTreeMap::new(),
            latest: None,
        };
        for (tag, version) in tags {
            set.add_tag(&tag, &version);
        }
        set.latest = set
            .tags
            .get("latest")
            .cloned()
            .or_else(|| set.highest().map(str::to_string));
        set
    }

    fn add_tag(&mut self, tag: &str, version: &str) {
        // A tag never shadows a real version key.
        if self.releases.get(tag).is_some_and(|r| r.tag.is_none()) {
            return;
        }
        let Some(target) = self.releases.get(version) else {
            tracing::debug!("{}: dist-tag {tag} points at unknown version {version}", self.name);
            return;
        };
        let mut copy = target.clone();
        copy.tag = Some(tag.to_string());
        self.releases.insert(tag.to_string(), copy);
        self.tags.insert(tag.to_string(), version.to_string());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a release by exact version or dist-tag name.
    pub fn get(&self, key: &str) -> Option<&Release> {
        self.releases.get(key)
    }

    /// Published version strings, excluding dist-tag keys.
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.releases
            .values()
            .filter(|r| r.tag.is_none())
            .map(|r| r.version.as_str())
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// The `latest` dist-tag, or the highest published version without one.
    pub fn latest(&self) -> Option<&str> {
        self.latest.as_deref()
    }

    fn highest(&self) -> Option<&str> {
        self.versions()
            .filter_map(|raw| version::parse_version(raw).map(|v| (v, raw)))
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, raw)| raw)
    }

    /// Resolve `range` to one release.
    ///
    /// An exact key (a published version or a dist-tag name) wins without
    /// range comparison; otherwise the highest satisfying version is chosen.
    /// `None` means nothing satisfies the range, which is not an error here.
    pub fn select(&self, range: &str) -> Option<&Release> {
        let key = range.trim();
        if let Some(release) = self.releases.get(key) {
            return Some(release);
        }
        let best = version::max_satisfying(self.versions(), key)?;
        self.releases.get(best)
    }

    pub fn len(&self) -> usize {
        self.versions().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_document;

    const DOC: &str = r#"{
      "name": "demo",
      "dist-tags": { "latest": "1.2.0", "next": "2.0.0" },
      "versions": {
        "1.0.0": { "name": "demo", "version": "1.0.0" },
        "1.2.0": { "name": "demo", "version": "1.2.0", "dependencies": { "dep": "^1.0.0" } },
        "2.0.0": { "name": "demo", "version": "2.0.0" }
      },
      "time": {
        "created": "2020-01-01T00:00:00.000Z",
        "modified": "2021-01-01T00:00:00.000Z",
        "1.0.0": "2020-01-01T00:00:00.000Z",
        "1.2.0": "2020-06-01T00:00:00.000Z"
      }
    }"#;

    fn set() -> ReleaseSet {
        ReleaseSet::from_document("demo", parse_document("demo", DOC).unwrap()).unwrap()
    }

    #[test]
    fn selects_highest_satisfying() {
        let set = set();
        assert_eq!(set.select("^1.0.0").unwrap().version, "1.2.0");
        assert!(set.select("^3.0.0").is_none());
    }

    #[test]
    fn exact_key_wins() {
        let set = set();
        assert_eq!(set.select("1.0.0").unwrap().version, "1.0.0");
        let next = set.select("next").unwrap();
        assert_eq!(next.version, "2.0.0");
        assert_eq!(next.tag.as_deref(), Some("next"));
    }

    #[test]
    fn tag_copies_are_independent() {
        let mut set = set();
        if let Some(tagged) = set.releases.get_mut("latest") {
            tagged.manifest.description = Some("tag-only note".into());
        }
        assert!(set.get("1.2.0").unwrap().manifest.description.is_none());
        assert!(set.get("1.2.0").unwrap().tag.is_none());
        assert_eq!(set.get("latest").unwrap().manifest.dependencies["dep"], "^1.0.0");
    }

    #[test]
    fn versions_exclude_tags_and_latest_follows_tag() {
        let set = set();
        let versions: Vec<&str> = set.versions().collect();
        assert_eq!(versions, vec!["1.0.0", "1.2.0", "2.0.0"]);
        assert_eq!(set.latest(), Some("1.2.0"));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn release_times_skip_pseudo_keys() {
        let set = set();
        assert_eq!(
            set.get("1.2.0").unwrap().released.as_deref(),
            Some("2020-06-01T00:00:00.000Z")
        );
        assert!(set.get("2.0.0").unwrap().released.is_none());
    }

    #[test]
    fn latest_falls_back_to_highest_version() {
        let releases = ["0.9.0", "1.1.0"].map(|v| Release {
            name: "x".into(),
            version: v.into(),
            manifest: Manifest::default(),
            shasum: None,
            released: None,
            tag: None,
        });
        let set = ReleaseSet::from_releases("x", releases, []);
        assert_eq!(set.latest(), Some("1.1.0"));
    }
}
