//! Handler for `shrink why`.

use miette::Result;
use shrink_core::config::ResolverConfig;
use shrink_ops::ops_why;

pub async fn exec(name: &str, config: &ResolverConfig) -> Result<()> {
    let project_root = super::project_root()?;
    ops_why::why(&project_root, name, config).await
}
