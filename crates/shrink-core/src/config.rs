use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The public npm registry.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

/// Default cap on concurrent registry lookups.
pub const DEFAULT_LIMIT: usize = 10;

/// Default per-lookup deadline in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Options recognized by the resolver, passed in at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Base URL of the registry.
    #[serde(default = "default_registry")]
    pub registry: String,

    /// Exclude devDependencies of the root manifest.
    #[serde(default)]
    pub production: bool,

    /// Maximum number of registry lookups in flight at once.
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Hoist shared dependencies toward common ancestors.
    #[serde(default = "default_optimize")]
    pub optimize: bool,

    /// Deadline for a single registry lookup, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            registry: default_registry(),
            production: false,
            limit: default_limit(),
            optimize: default_optimize(),
            timeout: default_timeout(),
        }
    }
}

fn default_registry() -> String {
    DEFAULT_REGISTRY.to_string()
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_optimize() -> bool {
    true
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ResolverConfig {
    /// Reject settings the resolver cannot run with.
    pub fn validate(&self) -> miette::Result<()> {
        if self.limit == 0 {
            return Err(shrink_util::errors::ShrinkError::Config {
                message: "limit must be at least 1".to_string(),
            }
            .into());
        }
        if self.timeout == 0 {
            return Err(shrink_util::errors::ShrinkError::Config {
                message: "timeout must be at least 1 second".to_string(),
            }
            .into());
        }
        if !self.registry.starts_with("http://") && !self.registry.starts_with("https://") {
            return Err(shrink_util::errors::ShrinkError::Config {
                message: format!("registry must be an http(s) URL, got '{}'", self.registry),
            }
            .into());
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Global user configuration loaded from `~/.shrink/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub resolver: ResolverConfig,
}

impl GlobalConfig {
    /// Load the global configuration, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load the configuration from an explicit path, or return defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            shrink_util::errors::ShrinkError::Config {
                message: format!("Failed to read {}: {e}", path.display()),
            }
        })?;
        toml::from_str(&content).map_err(|e| {
            shrink_util::errors::ShrinkError::Config {
                message: format!("Failed to parse {}: {e}", path.display()),
            }
            .into()
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }
}

/// Returns the path to the shrink data directory (`~/.shrink/`).
pub fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".shrink")
}
