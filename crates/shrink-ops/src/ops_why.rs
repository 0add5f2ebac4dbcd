//! Operation: explain why a package is in the tree.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use shrink_core::config::ResolverConfig;
use shrink_registry::client::Registry;

use crate::ops_resolve::{read_manifest, registry_for, resolve_manifest};

pub async fn why(project_root: &Path, target: &str, config: &ResolverConfig) -> miette::Result<()> {
    let registry = registry_for(config)?;
    let output = why_with(project_root, target, config, registry).await?;
    print!("{output}");
    Ok(())
}

/// Path from the project to `target` plus everything that requested it.
///
/// `target` is a package name or a `name@range` key.
pub async fn why_with(
    project_root: &Path,
    target: &str,
    config: &ResolverConfig,
    registry: Arc<dyn Registry>,
) -> miette::Result<String> {
    let manifest = read_manifest(project_root)?;
    let resolution = resolve_manifest(&manifest, config, registry).await?;
    let tree = &resolution.tree;

    let mut out = String::new();
    let Some(path) = tree.find_path(target) else {
        let _ = writeln!(out, "Dependency '{target}' not found in the tree.");
        return Ok(out);
    };

    let _ = writeln!(out, "Path to {target}:");
    for (i, module) in path.iter().enumerate() {
        let indent = "  ".repeat(i);
        let _ = writeln!(out, "{indent}{module}");
    }

    let mut requested_by: Vec<(String, String)> = tree
        .modules()
        .filter(|(_, m)| m.name == target || m.id == target)
        .flat_map(|(idx, m)| {
            tree.report(idx)
                .parents
                .into_iter()
                .map(move |parent| (parent, m.required.clone()))
        })
        .collect();
    requested_by.sort();
    requested_by.dedup();
    if !requested_by.is_empty() {
        let _ = writeln!(out, "Requested by:");
        for (parent, range) in requested_by {
            let _ = writeln!(out, "  {parent} ({range})");
        }
    }
    Ok(out)
}
