//! Shared plumbing: configuration layering and running one resolution.

use std::path::Path;
use std::sync::Arc;

use shrink_core::config::{GlobalConfig, ResolverConfig};
use shrink_core::manifest::Manifest;
use shrink_core::MANIFEST_FILE;
use shrink_registry::client::{Registry, RegistryClient};
use shrink_resolver::resolver::{Resolution, Resolver};
use shrink_util::progress::{spinner, status_warn};
use tokio_util::sync::CancellationToken;

/// Command-line settings layered over `~/.shrink/config.toml`.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub registry: Option<String>,
    pub production: bool,
    pub limit: Option<usize>,
    pub no_optimize: bool,
    pub timeout: Option<u64>,
}

impl ConfigOverrides {
    pub fn apply(&self, mut config: ResolverConfig) -> ResolverConfig {
        if let Some(ref registry) = self.registry {
            config.registry = registry.clone();
        }
        if self.production {
            config.production = true;
        }
        if let Some(limit) = self.limit {
            config.limit = limit;
        }
        if self.no_optimize {
            config.optimize = false;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        config
    }
}

/// Load the global config, apply `overrides`, and validate the result.
pub fn load_config(overrides: &ConfigOverrides) -> miette::Result<ResolverConfig> {
    load_config_from(&GlobalConfig::default_path(), overrides)
}

pub fn load_config_from(path: &Path, overrides: &ConfigOverrides) -> miette::Result<ResolverConfig> {
    let global = GlobalConfig::load_from(path)?;
    let config = overrides.apply(global.resolver);
    config.validate()?;
    tracing::debug!("resolver config: {config:?}");
    Ok(config)
}

/// Read `package.json` from the project root.
pub fn read_manifest(project_root: &Path) -> miette::Result<Manifest> {
    Manifest::from_path(&project_root.join(MANIFEST_FILE))
}

/// HTTP registry client for `config`.
pub fn registry_for(config: &ResolverConfig) -> miette::Result<Arc<dyn Registry>> {
    Ok(Arc::new(RegistryClient::from_config(config)?))
}

/// Resolve `manifest`, showing a spinner and warning about every dependency
/// that failed. Ctrl-C stops the resolution and keeps what was resolved.
pub async fn resolve_manifest(
    manifest: &Manifest,
    config: &ResolverConfig,
    registry: Arc<dyn Registry>,
) -> miette::Result<Resolution> {
    let mut resolver = Resolver::new(config.clone(), registry)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let sp = spinner("Resolving dependencies...");
    let resolution = resolver.resolve_with_cancel(manifest, cancel).await;
    sp.finish_and_clear();
    interrupt.abort();

    for failure in &resolution.errors {
        status_warn("Warning", &failure.to_string());
    }
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_only_what_is_set() {
        let base = ResolverConfig {
            limit: 4,
            ..ResolverConfig::default()
        };
        let config = ConfigOverrides {
            registry: Some("http://localhost:4873".into()),
            no_optimize: true,
            ..ConfigOverrides::default()
        }
        .apply(base);
        assert_eq!(config.registry, "http://localhost:4873");
        assert_eq!(config.limit, 4);
        assert!(!config.optimize);
        assert!(!config.production);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let missing = Path::new("/nonexistent/shrink/config.toml");
        let err = load_config_from(
            missing,
            &ConfigOverrides {
                limit: Some(0),
                ..ConfigOverrides::default()
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("limit"));
    }
}
