//! Handler for `shrink outdated`.

use miette::Result;
use shrink_core::config::ResolverConfig;
use shrink_ops::ops_outdated::{self, OutdatedOptions};

pub async fn exec(all: bool, config: &ResolverConfig) -> Result<()> {
    let project_root = super::project_root()?;
    ops_outdated::outdated(&project_root, &OutdatedOptions { all }, config).await
}
