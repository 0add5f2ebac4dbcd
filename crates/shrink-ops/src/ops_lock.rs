//! Operation: resolve `package.json` and write `npm-shrinkwrap.json`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use shrink_core::config::ResolverConfig;
use shrink_core::lockfile::Shrinkwrap;
use shrink_core::SHRINKWRAP_FILE;
use shrink_registry::client::Registry;
use shrink_util::progress::{status, status_warn};

use crate::ops_resolve::{read_manifest, registry_for, resolve_manifest};

/// Options for `shrink lock`.
#[derive(Debug, Default)]
pub struct LockOptions {
    /// Where to write the lockfile instead of `<project>/npm-shrinkwrap.json`.
    pub output: Option<PathBuf>,
}

/// Resolve the project against the configured registry and write the lockfile.
pub async fn lock(project_root: &Path, opts: &LockOptions, config: &ResolverConfig) -> miette::Result<()> {
    let registry = registry_for(config)?;
    lock_with(project_root, opts, config, registry).await?;
    Ok(())
}

pub async fn lock_with(
    project_root: &Path,
    opts: &LockOptions,
    config: &ResolverConfig,
    registry: Arc<dyn Registry>,
) -> miette::Result<Shrinkwrap> {
    let manifest = read_manifest(project_root)?;
    let resolution = resolve_manifest(&manifest, config, registry).await?;

    let shrinkwrap = resolution.shrinkwrap();
    let path = opts
        .output
        .clone()
        .unwrap_or_else(|| project_root.join(SHRINKWRAP_FILE));
    shrinkwrap.write_to(&path)?;

    status(
        "Locked",
        &format!(
            "{} packages ({} unique) into {}",
            shrinkwrap.package_count(),
            resolution.tree.len(),
            path.display()
        ),
    );
    if !resolution.is_complete() {
        status_warn(
            "Incomplete",
            &format!("{} dependencies could not be resolved", resolution.errors.len()),
        );
    }
    Ok(shrinkwrap)
}
