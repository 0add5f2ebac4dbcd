//! Handler for `shrink tree`.

use miette::Result;
use shrink_core::config::ResolverConfig;
use shrink_ops::ops_tree::{self, TreeOptions};

pub async fn exec(depth: Option<usize>, json: bool, config: &ResolverConfig) -> Result<()> {
    let project_root = super::project_root()?;
    ops_tree::tree(&project_root, &TreeOptions { depth, json }, config).await
}
