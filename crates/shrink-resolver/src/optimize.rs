//! Hoisting: move a shared module up to the shallowest position every one of
//! its dependents can see without a version conflict.
//!
//! A node is *available* for a module when its `dependencies` map has no
//! entry under the module's name, or that entry has the module's version.
//! Each dependent's candidate path is the dependent itself followed by its
//! placement ancestors, cut at the first unavailable node. Dependents with an
//! empty path keep their own copy and stop sharing this module. The module
//! is then installed under the shallowest node common to all remaining
//! paths, unless that would put it inside its own subtree or displace
//! another module of the same name.

use std::collections::{HashSet, VecDeque};

use petgraph::graph::NodeIndex;

use crate::graph::DependencyTree;

/// Re-evaluate where `module` should sit. Returns `true` if the tree changed.
///
/// Calling it again without new dependents changes nothing.
pub fn optimize(tree: &mut DependencyTree, module: NodeIndex) -> bool {
    if module == tree.root() {
        return false;
    }
    let name = tree.module(module).name.clone();
    let version = tree.module(module).version.clone();
    let dependents: Vec<NodeIndex> = tree.module(module).dependents.iter().copied().collect();

    let mut changed = false;
    let mut paths = Vec::with_capacity(dependents.len());
    for dependent in dependents {
        let path = candidate_path(tree, dependent, &name, &version);
        if path.is_empty() {
            tracing::debug!(
                "hoist: {} keeps its own {name}, not sharing {name}@{version}",
                tree.module(dependent)
            );
            tree.module_mut(module).dependents.remove(&dependent);
            changed = true;
        } else {
            paths.push((dependent, path));
        }
    }

    let Some(target) = common_ancestor(tree, &paths) else {
        return changed;
    };
    if target == module || tree.is_within(target, module) {
        return changed;
    }
    if tree
        .dependency(target, &name)
        .is_some_and(|existing| existing != module)
    {
        return changed;
    }

    let old_parent = tree.module(module).parent;
    let holders: Vec<NodeIndex> = paths
        .iter()
        .map(|(dependent, _)| *dependent)
        .chain(old_parent)
        .collect();
    for holder in holders {
        if holder != target && tree.dependency(holder, &name) == Some(module) {
            tree.unlink(holder, &name);
            changed = true;
        }
    }
    if tree.dependency(target, &name).is_none() {
        tree.link(target, module);
        changed = true;
    }
    if old_parent != Some(target) {
        tracing::debug!("hoist: {name}@{version} -> under {}", tree.module(target));
        tree.place(module, target);
        changed = true;
    }
    changed
}

/// Take a hoisted `module` out of `holder`, which did not ask for it, so a
/// module `holder` did request can take the slot.
///
/// The module goes back to every dependent that can still map it and is
/// installed under the first of them.
pub fn evict(tree: &mut DependencyTree, module: NodeIndex, holder: NodeIndex) {
    let name = tree.module(module).name.clone();
    if tree.dependency(holder, &name) != Some(module) {
        return;
    }
    tree.unlink(holder, &name);
    tracing::debug!(
        "hoist: {} reclaims its {name} slot from {}",
        tree.module(holder),
        tree.module(module)
    );

    let dependents: Vec<NodeIndex> = tree.module(module).dependents.iter().copied().collect();
    let mut placed = false;
    for dependent in dependents {
        if tree.link(dependent, module) && !placed {
            tree.place(module, dependent);
            placed = true;
        }
    }
    if !placed {
        tree.module_mut(module).parent = None;
    }
}

/// Remove map entries whose holder would already find the same release
/// further up, walking the tree from the root down.
///
/// A module whose placement entry goes leaves the tree together with what is
/// installed beneath it. Returns the number of entries removed.
pub fn drop_shadowed_copies(tree: &mut DependencyTree) -> usize {
    let mut removed = 0;
    let mut queue: VecDeque<NodeIndex> = tree.placement_children(tree.root()).into();
    let mut seen = HashSet::new();
    while let Some(holder) = queue.pop_front() {
        if !seen.insert(holder) {
            continue;
        }
        let Some(above) = tree.module(holder).parent else {
            continue;
        };
        let entries: Vec<(String, NodeIndex)> = tree
            .dependencies_of(holder)
            .into_iter()
            .map(|(name, idx)| (name.to_string(), idx))
            .collect();
        for (name, module) in entries {
            let Some(visible) = tree.lookup(above, &name) else {
                continue;
            };
            if visible == module || tree.module(visible).version != tree.module(module).version {
                continue;
            }
            tracing::debug!(
                "{} already sees {} above, dropping its own copy",
                tree.module(holder),
                tree.module(visible)
            );
            tree.unlink(holder, &name);
            if tree.module(module).parent == Some(holder) {
                tree.uninstall(module);
            }
            removed += 1;
        }
        let mut children = tree.placement_children(holder);
        children.sort();
        queue.extend(children);
    }
    removed
}

/// Whether `idx` can hold `name@version` without conflict.
fn available(tree: &DependencyTree, idx: NodeIndex, name: &str, version: &str) -> bool {
    match tree.dependency(idx, name) {
        Some(existing) => tree.module(existing).version == version,
        None => true,
    }
}

fn candidate_path(
    tree: &DependencyTree,
    dependent: NodeIndex,
    name: &str,
    version: &str,
) -> Vec<NodeIndex> {
    tree.ancestors(dependent)
        .into_iter()
        .take_while(|&idx| available(tree, idx, name, version))
        .collect()
}

/// The shallowest node present in every path.
fn common_ancestor(tree: &DependencyTree, paths: &[(NodeIndex, Vec<NodeIndex>)]) -> Option<NodeIndex> {
    let (_, first) = paths.first()?;
    let mut common: HashSet<NodeIndex> = first.iter().copied().collect();
    for (_, path) in &paths[1..] {
        let other: HashSet<NodeIndex> = path.iter().copied().collect();
        common.retain(|idx| other.contains(idx));
    }
    common
        .into_iter()
        .min_by_key(|&idx| (tree.module(idx).depth, idx.index()))
}
