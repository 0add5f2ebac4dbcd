//! Operation: display the resolved dependency tree.

use std::path::Path;
use std::sync::Arc;

use shrink_core::config::ResolverConfig;
use shrink_registry::client::Registry;
use shrink_util::errors::ShrinkError;

use crate::ops_resolve::{read_manifest, registry_for, resolve_manifest};

/// Options for `shrink tree`.
#[derive(Debug, Default)]
pub struct TreeOptions {
    /// Maximum tree depth to display.
    pub depth: Option<usize>,
    /// Print one JSON report per module instead of the tree.
    pub json: bool,
}

/// Display the dependency tree for the project.
pub async fn tree(project_root: &Path, opts: &TreeOptions, config: &ResolverConfig) -> miette::Result<()> {
    let registry = registry_for(config)?;
    let output = tree_with(project_root, opts, config, registry).await?;
    print!("{output}");
    Ok(())
}

/// Render the tree (or the module reports) as text.
pub async fn tree_with(
    project_root: &Path,
    opts: &TreeOptions,
    config: &ResolverConfig,
    registry: Arc<dyn Registry>,
) -> miette::Result<String> {
    let manifest = read_manifest(project_root)?;
    let resolution = resolve_manifest(&manifest, config, registry).await?;

    if opts.json {
        let mut json = serde_json::to_string_pretty(&resolution.tree.reports()).map_err(|e| {
            ShrinkError::Generic {
                message: format!("Failed to serialize module reports: {e}"),
            }
        })?;
        json.push('\n');
        return Ok(json);
    }
    Ok(resolution.tree.print_tree(opts.depth))
}
