//! Handler for `shrink lock`.

use std::path::PathBuf;

use miette::Result;
use shrink_core::config::ResolverConfig;
use shrink_ops::ops_lock::{self, LockOptions};

pub async fn exec(output: Option<PathBuf>, config: &ResolverConfig) -> Result<()> {
    let project_root = super::project_root()?;
    ops_lock::lock(&project_root, &LockOptions { output }, config).await
}
