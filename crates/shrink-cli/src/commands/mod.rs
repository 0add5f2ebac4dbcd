//! Command dispatch and handler modules.

mod lock;
mod outdated;
mod tree;
mod why;

use std::path::PathBuf;

use miette::Result;
use shrink_core::config::ResolverConfig;
use shrink_core::MANIFEST_FILE;
use shrink_ops::ops_resolve::{self, ConfigOverrides};
use shrink_util::errors::ShrinkError;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    let config = resolver_config(&cli)?;
    match cli.command {
        Command::Lock { output } => lock::exec(output, &config).await,
        Command::Tree { depth, json } => tree::exec(depth, json, &config).await,
        Command::Why { name } => why::exec(&name, &config).await,
        Command::Outdated { all } => outdated::exec(all, &config).await,
    }
}

fn resolver_config(cli: &Cli) -> Result<ResolverConfig> {
    ops_resolve::load_config(&ConfigOverrides {
        registry: cli.registry.clone(),
        production: cli.production,
        limit: cli.limit,
        no_optimize: cli.no_optimize,
        timeout: cli.timeout,
    })
}

/// The nearest directory at or above the working directory with a `package.json`.
fn project_root() -> Result<PathBuf> {
    let cwd = std::env::current_dir().map_err(ShrinkError::Io)?;
    let root = shrink_util::fs::find_ancestor_with(&cwd, MANIFEST_FILE).ok_or_else(|| {
        ShrinkError::InvalidManifest {
            message: format!("No {MANIFEST_FILE} found in {} or any parent", cwd.display()),
        }
    })?;
    tracing::debug!("project root: {}", root.display());
    Ok(root)
}
