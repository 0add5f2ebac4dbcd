//! Dependency tree arena.
//!
//! Every module is a petgraph node; a module's `dependencies` map is its set
//! of outgoing edges, each labelled with the dependency name. The virtual
//! root (the manifest being resolved) is always the first node. A node can be
//! referenced from several maps at once, so edges may form cycles; the
//! placement tree (`Module::parent`) never does.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use shrink_core::lockfile::{LockedDependency, Shrinkwrap};
use shrink_registry::release::Release;
use shrink_registry::version::is_pinned;

/// A resolved package at one position of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// The `name@range` key that produced this module.
    pub id: String,
    pub name: String,
    pub version: String,
    /// The range that was resolved.
    pub required: String,
    pub licenses: Vec<String>,
    pub author: Option<String>,
    pub shasum: Option<String>,
    pub released: Option<String>,
    /// Latest version known to the registry at resolution time.
    pub latest: Option<String>,
    pub depth: usize,
    /// The node whose `dependencies` map this module is installed in.
    pub parent: Option<NodeIndex>,
    /// Nodes (possibly the root) that asked for this module.
    pub dependents: BTreeSet<NodeIndex>,
}

/// Fields replaced by [`Module::clone_with`] after copying.
#[derive(Debug, Clone, Default)]
pub struct ModuleOverrides {
    pub id: Option<String>,
    pub required: Option<String>,
    pub depth: Option<usize>,
}

impl Module {
    /// The virtual root standing in for the manifest being resolved.
    pub fn root(name: &str, version: &str) -> Self {
        Self {
            id: String::new(),
            name: name.to_string(),
            version: version.to_string(),
            required: String::new(),
            licenses: Vec::new(),
            author: None,
            shasum: None,
            released: None,
            latest: None,
            depth: 0,
            parent: None,
            dependents: BTreeSet::new(),
        }
    }

    pub fn from_release(
        id: &str,
        required: &str,
        release: &Release,
        latest: Option<String>,
        depth: usize,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: release.name.clone(),
            version: release.version.clone(),
            required: required.to_string(),
            licenses: release.licenses(),
            author: release.author(),
            shasum: release.shasum.clone(),
            released: release.released.clone(),
            latest,
            depth,
            parent: None,
            dependents: BTreeSet::new(),
        }
    }

    /// Copy the release metadata into a fresh, unlinked module.
    ///
    /// The copy has no dependents and no placement; `overrides` are applied
    /// last.
    pub fn clone_with(&self, overrides: ModuleOverrides) -> Self {
        let mut module = Self {
            parent: None,
            dependents: BTreeSet::new(),
            ..self.clone()
        };
        if let Some(id) = overrides.id {
            module.id = id;
        }
        if let Some(required) = overrides.required {
            module.required = required;
        }
        if let Some(depth) = overrides.depth {
            module.depth = depth;
        }
        module
    }

    /// Whether the resolved version is the latest the registry knows of.
    pub fn uptodate(&self) -> bool {
        self.latest.as_deref() == Some(self.version.as_str())
    }

    /// Whether the requested range cannot float to newer majors.
    pub fn pinned(&self) -> bool {
        is_pinned(&self.required)
    }

    /// `name@version`.
    pub fn identity(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Edge label: the name under which the target sits in the source's map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepEdge {
    pub name: String,
}

/// Flattened, serializable view of one module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleReport {
    pub name: String,
    pub version: String,
    pub required: String,
    pub pinned: bool,
    pub uptodate: bool,
    pub licenses: Vec<String>,
    pub author: Option<String>,
    pub depth: usize,
    pub id: String,
    /// Direct dependents as `name@version`.
    pub parents: Vec<String>,
}

/// The result of one resolution: modules indexed by their `name@range` key.
#[derive(Debug, Clone)]
pub struct DependencyTree {
    graph: DiGraph<Module, DepEdge>,
    index: HashMap<String, NodeIndex>,
    /// First node created for each `name@version`.
    releases: HashMap<(String, String), NodeIndex>,
    root: NodeIndex,
}

impl DependencyTree {
    pub fn new(name: &str, version: &str) -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(Module::root(name, version));
        Self {
            graph,
            index: HashMap::new(),
            releases: HashMap::new(),
            root,
        }
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Add a module under its id. An id already present returns the existing node.
    pub fn insert(&mut self, module: Module) -> NodeIndex {
        if let Some(&idx) = self.index.get(&module.id) {
            return idx;
        }
        let id = module.id.clone();
        let release = (module.name.clone(), module.version.clone());
        let idx = self.graph.add_node(module);
        self.index.insert(id, idx);
        self.releases.entry(release).or_insert(idx);
        idx
    }

    /// Look up a module by its `name@range` key.
    pub fn find(&self, key: &str) -> Option<NodeIndex> {
        self.index.get(key).copied()
    }

    /// Any module already holding release `name@version`.
    pub fn find_release(&self, name: &str, version: &str) -> Option<NodeIndex> {
        self.releases
            .get(&(name.to_string(), version.to_string()))
            .copied()
    }

    pub fn module(&self, idx: NodeIndex) -> &Module {
        &self.graph[idx]
    }

    pub fn module_mut(&mut self, idx: NodeIndex) -> &mut Module {
        &mut self.graph[idx]
    }

    /// All modules except the root, in insertion order.
    pub fn modules(&self) -> impl Iterator<Item = (NodeIndex, &Module)> {
        self.graph
            .node_indices()
            .filter(move |&idx| idx != self.root)
            .map(move |idx| (idx, &self.graph[idx]))
    }

    /// The node `idx` maps `name` to, if any.
    pub fn dependency(&self, idx: NodeIndex, name: &str) -> Option<NodeIndex> {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .find(|e| e.weight().name == name)
            .map(|e| e.target())
    }

    /// The `dependencies` map of `idx`.
    pub fn dependencies_of(&self, idx: NodeIndex) -> BTreeMap<&str, NodeIndex> {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.weight().name.as_str(), e.target()))
            .collect()
    }

    /// Map `child` under its name in `parent`'s dependencies.
    ///
    /// Returns `false` when the slot already holds a different node; a map
    /// never holds two entries with the same name.
    pub fn link(&mut self, parent: NodeIndex, child: NodeIndex) -> bool {
        if parent == child {
            return false;
        }
        let name = self.graph[child].name.clone();
        match self.dependency(parent, &name) {
            Some(existing) => existing == child,
            None => {
                self.graph.add_edge(parent, child, DepEdge { name });
                true
            }
        }
    }

    /// Remove the `name` entry from `parent`'s dependencies.
    pub fn unlink(&mut self, parent: NodeIndex, name: &str) -> Option<NodeIndex> {
        let edge = self
            .graph
            .edges_directed(parent, Direction::Outgoing)
            .find(|e| e.weight().name == name)
            .map(|e| e.id())?;
        let (_, target) = self.graph.edge_endpoints(edge)?;
        self.graph.remove_edge(edge);
        Some(target)
    }

    /// Record `dependent` as requesting `module` and map it there if the slot
    /// is free. A module without a placement is installed under the first
    /// dependent that can hold it.
    ///
    /// Returns `true` when the dependent is new.
    pub fn add_dependent(&mut self, module: NodeIndex, dependent: NodeIndex) -> bool {
        if module == dependent || !self.graph[module].dependents.insert(dependent) {
            return false;
        }
        if self.link(dependent, module) && self.graph[module].parent.is_none() {
            self.place(module, dependent);
        }
        true
    }

    /// The module a lookup of `name` from `from` finds: the nearest entry in
    /// the maps of `from` and its placement ancestors.
    pub fn lookup(&self, from: NodeIndex, name: &str) -> Option<NodeIndex> {
        self.ancestors(from)
            .into_iter()
            .find_map(|idx| self.dependency(idx, name))
    }

    /// Clear the placement of `module` and of everything installed beneath it.
    pub fn uninstall(&mut self, module: NodeIndex) {
        let mut stack = vec![module];
        let mut seen = HashSet::new();
        while let Some(idx) = stack.pop() {
            if !seen.insert(idx) {
                continue;
            }
            stack.extend(self.placement_children(idx));
            self.graph[idx].parent = None;
        }
    }

    /// Install `module` under `parent` and refresh the depths of its subtree.
    pub fn place(&mut self, module: NodeIndex, parent: NodeIndex) {
        self.graph[module].parent = Some(parent);
        let mut stack = vec![(module, self.graph[parent].depth + 1)];
        let mut seen = HashSet::new();
        while let Some((idx, depth)) = stack.pop() {
            if !seen.insert(idx) {
                continue;
            }
            self.graph[idx].depth = depth;
            for child in self.placement_children(idx) {
                stack.push((child, depth + 1));
            }
        }
    }

    /// Modules installed directly under `idx`.
    pub fn placement_children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.target())
            .filter(|&child| self.graph[child].parent == Some(idx))
            .collect()
    }

    /// `idx` followed by its placement ancestors up to the root.
    pub fn ancestors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut chain = vec![idx];
        let mut current = idx;
        while let Some(parent) = self.graph[current].parent {
            if chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Whether `idx` is `ancestor` or installed somewhere beneath it.
    pub fn is_within(&self, idx: NodeIndex, ancestor: NodeIndex) -> bool {
        self.ancestors(idx).contains(&ancestor)
    }

    /// Flatten one module for reporting.
    pub fn report(&self, idx: NodeIndex) -> ModuleReport {
        let m = &self.graph[idx];
        ModuleReport {
            name: m.name.clone(),
            version: m.version.clone(),
            required: m.required.clone(),
            pinned: m.pinned(),
            uptodate: m.uptodate(),
            licenses: m.licenses.clone(),
            author: m.author.clone(),
            depth: m.depth,
            id: m.id.clone(),
            parents: m
                .dependents
                .iter()
                .map(|&d| self.graph[d].identity())
                .collect(),
        }
    }

    /// Reports for every module, ordered by name then version.
    pub fn reports(&self) -> Vec<ModuleReport> {
        let mut reports: Vec<ModuleReport> =
            self.modules().map(|(idx, _)| self.report(idx)).collect();
        reports.sort_by(|a, b| {
            (a.name.as_str(), a.version.as_str(), a.id.as_str())
                .cmp(&(b.name.as_str(), b.version.as_str(), b.id.as_str()))
        });
        reports
    }

    /// Serialize into the nested shrinkwrap form.
    ///
    /// A module referenced from several maps is written once per occurrence.
    /// A module that would reappear inside its own subtree is left out there.
    pub fn to_shrinkwrap(&self) -> Shrinkwrap {
        let root = &self.graph[self.root];
        let mut on_path = HashSet::new();
        Shrinkwrap {
            name: root.name.clone(),
            version: root.version.clone(),
            dependencies: self.locked_dependencies(self.root, &mut on_path),
        }
    }

    fn locked_dependencies(
        &self,
        idx: NodeIndex,
        on_path: &mut HashSet<NodeIndex>,
    ) -> BTreeMap<String, LockedDependency> {
        let mut out = BTreeMap::new();
        on_path.insert(idx);
        for (name, child) in self.dependencies_of(idx) {
            if on_path.contains(&child) {
                continue;
            }
            let m = &self.graph[child];
            out.insert(
                name.to_string(),
                LockedDependency {
                    version: m.version.clone(),
                    shasum: m.shasum.clone(),
                    released: m.released.clone(),
                    dependencies: self.locked_dependencies(child, on_path),
                },
            );
        }
        on_path.remove(&idx);
        out
    }

    /// Print the dependency tree to a string.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = String::new();
        output.push_str(&format!("{}\n", self.graph[self.root]));

        let mut visited = HashSet::new();
        visited.insert(self.root);
        let deps = self.dependencies_of(self.root);
        let count = deps.len();
        for (i, (_, idx)) in deps.into_iter().enumerate() {
            self.print_subtree(&mut output, idx, "", i == count - 1, 1, max_depth, &mut visited);
        }
        output
    }

    #[allow(clippy::too_many_arguments)]
    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        output.push_str(&format!("{prefix}{connector}{node}\n"));

        if let Some(max) = max_depth {
            if depth >= max {
                return;
            }
        }

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let deps = self.dependencies_of(idx);
        let count = deps.len();
        for (i, (_, child)) in deps.into_iter().enumerate() {
            self.print_subtree(
                output,
                child,
                &child_prefix,
                i == count - 1,
                depth + 1,
                max_depth,
                visited,
            );
        }

        visited.remove(&idx);
    }

    /// Find a path of `dependencies` references from the root to a module.
    ///
    /// Accepts either a `name@range` key or a bare package name.
    pub fn find_path(&self, target_key: &str) -> Option<Vec<&Module>> {
        let target = self.resolve_key(target_key)?;
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        if self.dfs_path(self.root, target, &mut path, &mut visited) {
            Some(path.iter().map(|&idx| &self.graph[idx]).collect())
        } else {
            None
        }
    }

    /// Resolve a user-provided key: exact `name@range` first, then the
    /// shallowest module with that name. A key whose module is not installed
    /// anywhere stands for the installed copy of the same release.
    fn resolve_key(&self, key: &str) -> Option<NodeIndex> {
        if let Some(&idx) = self.index.get(key) {
            let wanted = &self.graph[idx];
            if wanted.parent.is_some() {
                return Some(idx);
            }
            return self
                .modules()
                .filter(|(_, m)| {
                    m.name == wanted.name && m.version == wanted.version && m.parent.is_some()
                })
                .min_by_key(|(_, m)| m.depth)
                .map(|(idx, _)| idx);
        }
        self.modules()
            .filter(|(_, m)| m.name == key && m.parent.is_some())
            .min_by_key(|(_, m)| m.depth)
            .map(|(idx, _)| idx)
    }

    fn dfs_path(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        path.push(current);
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            path.pop();
            return false;
        }
        for (_, child) in self.dependencies_of(current) {
            if self.dfs_path(child, target, path, visited) {
                return true;
            }
        }
        path.pop();
        false
    }

    /// Number of modules (excluding root).
    pub fn len(&self) -> usize {
        self.graph.node_count().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
