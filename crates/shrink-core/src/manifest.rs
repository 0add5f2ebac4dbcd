use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// One of the four dependency groups a manifest may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DependencyKind {
    Dependencies,
    DevDependencies,
    PeerDependencies,
    OptionalDependencies,
}

impl DependencyKind {
    /// Every group, in the order the root manifest is scanned.
    pub const ALL: [DependencyKind; 4] = [
        DependencyKind::Dependencies,
        DependencyKind::DevDependencies,
        DependencyKind::PeerDependencies,
        DependencyKind::OptionalDependencies,
    ];

    /// The `package.json` field name of this group.
    pub fn field(self) -> &'static str {
        match self {
            DependencyKind::Dependencies => "dependencies",
            DependencyKind::DevDependencies => "devDependencies",
            DependencyKind::PeerDependencies => "peerDependencies",
            DependencyKind::OptionalDependencies => "optionalDependencies",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

/// A `license` / `licenses[]` entry: either an SPDX-ish string or the legacy
/// `{ "type": ..., "url": ... }` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum License {
    Text(String),
    Object {
        #[serde(default, rename = "type")]
        kind: Option<String>,
        #[serde(default)]
        url: Option<String>,
    },
}

impl License {
    pub fn name(&self) -> Option<&str> {
        match self {
            License::Text(s) => Some(s.as_str()),
            License::Object { kind, .. } => kind.as_deref(),
        }
    }
}

/// An `author` entry: `"Name <email> (url)"` or `{ name, email, url }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Person {
    Text(String),
    Object {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        url: Option<String>,
    },
}

impl Person {
    /// The display name, without email or url decorations.
    pub fn name(&self) -> Option<&str> {
        match self {
            Person::Text(s) => {
                let name = s.split(['<', '(']).next().unwrap_or("").trim();
                (!name.is_empty()).then_some(name)
            }
            Person::Object { name, .. } => name.as_deref(),
        }
    }
}

/// A package manifest: the root `package.json` or one published version's
/// manifest inside a registry document.
///
/// Dependency groups are validated once here: absent or `null` groups become
/// empty maps and entries whose range is not a string are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,

    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "lenient_list")]
    pub licenses: Vec<License>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Person>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty", deserialize_with = "dependency_map")]
    pub dependencies: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty", deserialize_with = "dependency_map")]
    pub dev_dependencies: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty", deserialize_with = "dependency_map")]
    pub peer_dependencies: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty", deserialize_with = "dependency_map")]
    pub optional_dependencies: BTreeMap<String, String>,
}

fn dependency_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    let Some(serde_json::Value::Object(entries)) = raw else {
        return Ok(BTreeMap::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|(name, range)| match range {
            serde_json::Value::String(range) => Some((name, range)),
            _ => None,
        })
        .collect())
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<License>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        Some(single @ (serde_json::Value::String(_) | serde_json::Value::Object(_))) => {
            serde_json::from_value(single).into_iter().collect()
        }
        _ => Vec::new(),
    })
}

impl Manifest {
    /// Load and parse a `package.json` file from the given path.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            shrink_util::errors::ShrinkError::InvalidManifest {
                message: format!("Failed to read {}: {e}", path.display()),
            }
        })?;
        Self::from_str(&content)
    }

    /// Parse a `package.json` from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> miette::Result<Self> {
        serde_json::from_str(content).map_err(|e| {
            shrink_util::errors::ShrinkError::InvalidManifest {
                message: format!("Failed to parse package.json: {e}"),
            }
            .into()
        })
    }

    /// The dependency map for a group.
    pub fn group(&self, kind: DependencyKind) -> &BTreeMap<String, String> {
        match kind {
            DependencyKind::Dependencies => &self.dependencies,
            DependencyKind::DevDependencies => &self.dev_dependencies,
            DependencyKind::PeerDependencies => &self.peer_dependencies,
            DependencyKind::OptionalDependencies => &self.optional_dependencies,
        }
    }

    pub fn group_mut(&mut self, kind: DependencyKind) -> &mut BTreeMap<String, String> {
        match kind {
            DependencyKind::Dependencies => &mut self.dependencies,
            DependencyKind::DevDependencies => &mut self.dev_dependencies,
            DependencyKind::PeerDependencies => &mut self.peer_dependencies,
            DependencyKind::OptionalDependencies => &mut self.optional_dependencies,
        }
    }

    /// All `(kind, name, range)` entries of the given groups, in group order.
    pub fn entries<'a>(
        &'a self,
        kinds: &'a [DependencyKind],
    ) -> impl Iterator<Item = (DependencyKind, &'a str, &'a str)> + 'a {
        kinds.iter().flat_map(move |&kind| {
            self.group(kind)
                .iter()
                .map(move |(name, range)| (kind, name.as_str(), range.as_str()))
        })
    }

    /// Whether no dependency group declares anything.
    pub fn has_no_dependencies(&self) -> bool {
        DependencyKind::ALL
            .iter()
            .all(|&kind| self.group(kind).is_empty())
    }

    /// License names from `license` and the legacy `licenses` array.
    pub fn license_names(&self) -> Vec<String> {
        self.license
            .iter()
            .chain(self.licenses.iter())
            .filter_map(|l| l.name())
            .map(str::to_string)
            .collect()
    }
}
