//! Raw registry document (`GET /<name>`) parsing.

use std::collections::BTreeMap;

use serde::Deserialize;
use shrink_core::manifest::Manifest;
use shrink_util::errors::ShrinkError;

/// A package document as served by the registry.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryDocument {
    #[serde(default)]
    pub name: Option<String>,

    /// Version string → published manifest. Required.
    #[serde(default)]
    pub versions: Option<BTreeMap<String, VersionDocument>>,

    /// Version string → ISO-8601 publish time, plus `created`/`modified`.
    #[serde(default)]
    pub time: BTreeMap<String, serde_json::Value>,

    #[serde(default, rename = "dist-tags")]
    pub dist_tags: BTreeMap<String, String>,
}

/// One published version inside a [`RegistryDocument`].
#[derive(Debug, Clone, Deserialize)]
pub struct VersionDocument {
    #[serde(flatten)]
    pub manifest: Manifest,

    #[serde(default)]
    pub dist: Option<Dist>,
}

/// Tarball metadata of a published version.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dist {
    #[serde(default)]
    pub shasum: Option<String>,
}

/// Keys of the `time` map that are not versions.
const TIME_PSEUDO_KEYS: [&str; 3] = ["created", "modified", "unpublished"];

impl RegistryDocument {
    /// Publish time of `version`, ignoring the `created`/`modified` pseudo-keys.
    pub fn published_at(&self, version: &str) -> Option<&str> {
        if TIME_PSEUDO_KEYS.contains(&version) {
            return None;
        }
        self.time.get(version).and_then(|t| t.as_str())
    }
}

/// Parse a registry response body for package `name`.
///
/// Invalid JSON is a [`ShrinkError::Parse`]; valid JSON without a usable
/// `versions` object is a [`ShrinkError::MalformedData`].
pub fn parse_document(name: &str, body: &str) -> Result<RegistryDocument, ShrinkError> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| ShrinkError::Parse {
        message: format!("Invalid JSON in registry response for {name}: {e}"),
    })?;

    let doc: RegistryDocument =
        serde_json::from_value(value).map_err(|e| ShrinkError::MalformedData {
            message: format!("Unexpected registry document shape for {name}: {e}"),
        })?;

    if doc.versions.is_none() {
        return Err(ShrinkError::MalformedData {
            message: format!("Registry document for {name} has no versions field"),
        });
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_document() {
        let body = r#"{
          "name": "left-pad",
          "dist-tags": { "latest": "1.3.0" },
          "versions": {
            "1.3.0": {
              "name": "left-pad",
              "version": "1.3.0",
              "license": "WTFPL",
              "dist": { "shasum": "5b8a3a7765dfe001261dde915589e782f8c94d1e" }
            }
          },
          "time": {
            "modified": "2022-06-19T00:00:00.000Z",
            "1.3.0": "2018-04-09T01:50:29.513Z"
          }
        }"#;
        let doc = parse_document("left-pad", body).unwrap();
        let versions = doc.versions.as_ref().unwrap();
        assert_eq!(versions.len(), 1);
        let v = &versions["1.3.0"];
        assert_eq!(v.manifest.version, "1.3.0");
        assert_eq!(
            v.dist.as_ref().and_then(|d| d.shasum.as_deref()),
            Some("5b8a3a7765dfe001261dde915589e782f8c94d1e")
        );
        assert_eq!(doc.published_at("1.3.0"), Some("2018-04-09T01:50:29.513Z"));
        assert_eq!(doc.published_at("modified"), None);
        assert_eq!(doc.dist_tags["latest"], "1.3.0");
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let err = parse_document("x", "{ nope").unwrap_err();
        assert!(matches!(err, ShrinkError::Parse { .. }), "got: {err}");
    }

    #[test]
    fn missing_versions_is_malformed() {
        let err = parse_document("x", r#"{"name":"x","dist-tags":{}}"#).unwrap_err();
        assert!(matches!(err, ShrinkError::MalformedData { .. }), "got: {err}");
    }

    #[test]
    fn non_object_body_is_malformed() {
        let err = parse_document("x", "[1, 2, 3]").unwrap_err();
        assert!(matches!(err, ShrinkError::MalformedData { .. }), "got: {err}");
    }
}
