use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Fully resolved, version-pinned dependency tree (`npm-shrinkwrap.json`).
///
/// Nesting mirrors the installation layout: a package appears under the node
/// it is installed beneath, and again under every other position it occupies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shrinkwrap {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, LockedDependency>,
}

/// A single locked package with its release metadata and nested dependencies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LockedDependency {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shasum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, LockedDependency>,
}

impl Shrinkwrap {
    /// Load and parse an `npm-shrinkwrap.json` file from the given path.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| shrink_util::errors::ShrinkError::Generic {
                message: format!("Failed to read lockfile: {e}"),
            })?;
        serde_json::from_str(&content).map_err(|e| {
            shrink_util::errors::ShrinkError::Generic {
                message: format!("Failed to parse lockfile: {e}"),
            }
            .into()
        })
    }

    /// Serialize the lockfile to a pretty-printed JSON string with a trailing newline.
    pub fn to_string_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self).map(|mut s| {
            s.push('\n');
            s
        })
    }

    /// Write the lockfile to `path`, replacing any previous file.
    pub fn write_to(&self, path: &Path) -> miette::Result<()> {
        let content =
            self.to_string_pretty()
                .map_err(|e| shrink_util::errors::ShrinkError::Generic {
                    message: format!("Failed to serialize lockfile: {e}"),
                })?;
        shrink_util::fs::write_replace(path, content.as_bytes())
            .map_err(shrink_util::errors::ShrinkError::Io)?;
        Ok(())
    }

    /// Number of package occurrences in the tree, counting duplicates.
    pub fn package_count(&self) -> usize {
        fn count(deps: &BTreeMap<String, LockedDependency>) -> usize {
            deps.values().map(|d| 1 + count(&d.dependencies)).sum()
        }
        count(&self.dependencies)
    }
}
