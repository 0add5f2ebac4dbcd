//! Operation: list dependencies that did not resolve to their latest version.

use std::path::Path;
use std::sync::Arc;

use shrink_core::config::ResolverConfig;
use shrink_registry::client::Registry;

use crate::ops_resolve::{read_manifest, registry_for, resolve_manifest};

/// Options for `shrink outdated`.
#[derive(Debug, Default)]
pub struct OutdatedOptions {
    /// Include transitive dependencies, not only the project's own.
    pub all: bool,
}

/// A single outdated dependency entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutdatedEntry {
    pub name: String,
    pub required: String,
    pub current: String,
    pub latest: String,
    /// The requested range has an upper bound.
    pub pinned: bool,
}

pub async fn outdated(
    project_root: &Path,
    opts: &OutdatedOptions,
    config: &ResolverConfig,
) -> miette::Result<()> {
    let registry = registry_for(config)?;
    let entries = outdated_with(project_root, opts, config, registry).await?;

    if entries.is_empty() {
        println!("All dependencies are up to date.");
        return Ok(());
    }

    let name_w = entries.iter().map(|e| e.name.len()).max().unwrap_or(7).max(7);
    let req_w = entries.iter().map(|e| e.required.len()).max().unwrap_or(8).max(8);
    let cur_w = entries.iter().map(|e| e.current.len()).max().unwrap_or(7).max(7);
    println!("{:<name_w$}  {:<req_w$}  {:<cur_w$}  Latest", "Package", "Required", "Current");
    for e in &entries {
        let marker = if e.pinned { " (pinned)" } else { "" };
        println!(
            "{:<name_w$}  {:<req_w$}  {:<cur_w$}  {}{marker}",
            e.name, e.required, e.current, e.latest
        );
    }
    Ok(())
}

pub async fn outdated_with(
    project_root: &Path,
    opts: &OutdatedOptions,
    config: &ResolverConfig,
    registry: Arc<dyn Registry>,
) -> miette::Result<Vec<OutdatedEntry>> {
    let manifest = read_manifest(project_root)?;
    let resolution = resolve_manifest(&manifest, config, registry).await?;
    let tree = &resolution.tree;
    let root = tree.root();

    let mut entries: Vec<OutdatedEntry> = tree
        .modules()
        .filter(|(_, m)| opts.all || m.dependents.contains(&root))
        .filter(|(_, m)| !m.uptodate())
        .filter_map(|(_, m)| {
            Some(OutdatedEntry {
                name: m.name.clone(),
                required: m.required.clone(),
                current: m.version.clone(),
                latest: m.latest.clone()?,
                pinned: m.pinned(),
            })
        })
        .collect();
    entries.sort_by(|a, b| (&a.name, &a.required).cmp(&(&b.name, &b.required)));
    entries.dedup();
    Ok(entries)
}
