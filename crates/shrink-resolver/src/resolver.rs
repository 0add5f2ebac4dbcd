//! Worker-queue resolution of a manifest into a dependency tree.
//!
//! One driver loop owns the tree, the queue and the cache. Registry lookups
//! run as spawned tasks, at most `limit` at a time, and only touch the
//! registry; every mutation happens in the driver when a lookup completes.
//!
//! Requests are coalesced by `name@range` key: a key that is already queued,
//! already waiting on the registry, already resolved or already failed never
//! causes another registry call or another failure. Different ranges of the
//! same package share one fetch of its release set, and a failed fetch is not
//! retried within the same resolution.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use petgraph::graph::NodeIndex;
use shrink_core::config::ResolverConfig;
use shrink_core::lockfile::Shrinkwrap;
use shrink_core::manifest::{DependencyKind, Manifest};
use shrink_registry::client::Registry;
use shrink_registry::release::{Release, ReleaseSet};
use shrink_util::errors::ShrinkError;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheLookup, ResolutionCache};
use crate::dedupe::dedupe;
use crate::graph::{DependencyTree, Module, ModuleOverrides};
use crate::optimize::{drop_shadowed_copies, evict, optimize};

/// Groups read from a dependency's own manifest. Only the root manifest's
/// devDependencies are ever installed.
const CHILD_KINDS: [DependencyKind; 3] = [
    DependencyKind::Dependencies,
    DependencyKind::OptionalDependencies,
    DependencyKind::PeerDependencies,
];

const PRODUCTION_KINDS: [DependencyKind; 3] = CHILD_KINDS;

/// A requested lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub name: String,
    pub range: String,
    /// Nodes that asked for this key.
    pub parents: BTreeSet<NodeIndex>,
    pub depth: usize,
}

impl PackageSpec {
    pub fn new(name: &str, range: &str, parent: NodeIndex, depth: usize) -> Self {
        Self {
            name: name.to_string(),
            range: range.to_string(),
            parents: BTreeSet::from([parent]),
            depth,
        }
    }

    /// `name@range`; never the resolved version.
    pub fn key(&self) -> String {
        spec_key(&self.name, &self.range)
    }
}

pub fn spec_key(name: &str, range: &str) -> String {
    format!("{name}@{range}")
}

/// A dependency that could not be resolved.
#[derive(Debug, Clone)]
pub struct ResolveFailure {
    pub spec: PackageSpec,
    pub error: ShrinkError,
}

impl fmt::Display for ResolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.spec.key(), self.error)
    }
}

/// The output of dependency resolution.
///
/// Failures of individual dependencies never discard the rest of the tree.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub tree: DependencyTree,
    pub errors: Vec<ResolveFailure>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn shrinkwrap(&self) -> Shrinkwrap {
        self.tree.to_shrinkwrap()
    }
}

/// Resolves manifests against a registry, caching what it learns.
///
/// The cache lives as long as the resolver, so resolving the same manifest
/// twice only talks to the registry once.
pub struct Resolver {
    config: ResolverConfig,
    registry: Arc<dyn Registry>,
    cache: ResolutionCache,
}

impl Resolver {
    pub fn new(config: ResolverConfig, registry: Arc<dyn Registry>) -> miette::Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry,
            cache: ResolutionCache::new(),
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Resolve every dependency of `manifest`.
    pub async fn resolve(&mut self, manifest: &Manifest) -> Resolution {
        self.resolve_with_cancel(manifest, CancellationToken::new())
            .await
    }

    /// Like [`Resolver::resolve`], stopping early once `cancel` fires.
    ///
    /// A cancelled resolution returns the tree built so far; every spec still
    /// queued or waiting on the registry is reported as
    /// [`ShrinkError::Cancelled`].
    pub async fn resolve_with_cancel(
        &mut self,
        manifest: &Manifest,
        cancel: CancellationToken,
    ) -> Resolution {
        let root = dedupe(manifest, self.config.production);
        let mut session = Session::new(&self.config, self.registry.clone(), &mut self.cache, &root);

        let kinds: &[DependencyKind] = if self.config.production {
            &PRODUCTION_KINDS
        } else {
            &DependencyKind::ALL
        };
        let root_idx = session.tree.root();
        for (_, name, range) in root.entries(kinds) {
            session.enqueue(PackageSpec::new(name, range, root_idx, 1));
        }

        let cancelled = session.run(&cancel).await;
        let resolution = session.finish(cancelled);
        tracing::debug!(
            "resolved {} modules with {} failures",
            resolution.tree.len(),
            resolution.errors.len()
        );
        resolution
    }

    /// Drop everything cached by earlier resolutions.
    pub fn destroy(&mut self) {
        self.cache.clear();
    }
}

type Lookup = (String, Result<ReleaseSet, ShrinkError>);

/// State of one `resolve` call.
struct Session<'a> {
    config: &'a ResolverConfig,
    registry: Arc<dyn Registry>,
    cache: &'a mut ResolutionCache,
    tree: DependencyTree,
    /// Keys not yet dispatched, in discovery order.
    queue: VecDeque<String>,
    queued: HashMap<String, PackageSpec>,
    /// Dispatched keys waiting for their package's release set.
    waiting: HashMap<String, PackageSpec>,
    /// Package names with a registry fetch in flight.
    fetching: HashSet<String>,
    /// Package names whose fetch failed, with the error.
    unreachable: HashMap<String, ShrinkError>,
    tasks: JoinSet<Lookup>,
    errors: Vec<ResolveFailure>,
    /// Failed keys and their position in `errors`.
    failed: HashMap<String, usize>,
}

impl<'a> Session<'a> {
    fn new(
        config: &'a ResolverConfig,
        registry: Arc<dyn Registry>,
        cache: &'a mut ResolutionCache,
        root: &Manifest,
    ) -> Self {
        Self {
            config,
            registry,
            cache,
            tree: DependencyTree::new(&root.name, &root.version),
            queue: VecDeque::new(),
            queued: HashMap::new(),
            waiting: HashMap::new(),
            fetching: HashSet::new(),
            unreachable: HashMap::new(),
            tasks: JoinSet::new(),
            errors: Vec::new(),
            failed: HashMap::new(),
        }
    }

    /// Drive the queue until it drains. Returns `true` if cancelled.
    async fn run(&mut self, cancel: &CancellationToken) -> bool {
        loop {
            if cancel.is_cancelled() {
                return true;
            }
            self.dispatch();
            if self.tasks.is_empty() {
                return false;
            }
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => return true,
                joined = self.tasks.join_next() => joined,
            };
            if let Some(joined) = joined {
                self.complete(joined);
            }
        }
    }

    /// Add a spec, merging it into whatever already covers its key.
    fn enqueue(&mut self, spec: PackageSpec) {
        let key = spec.key();
        if let Some(idx) = self.tree.find(&key) {
            tracing::debug!("{key} already resolved, attaching");
            self.attach(idx, &spec.parents);
            return;
        }
        if let Some(&i) = self.failed.get(&key) {
            tracing::debug!("{key} already failed, merging");
            self.errors[i].spec.parents.extend(spec.parents);
            return;
        }
        if let Some(pending) = self.queued.get_mut(&key) {
            tracing::debug!("{key} already queued, merging");
            pending.parents.extend(spec.parents);
            return;
        }
        if let Some(pending) = self.waiting.get_mut(&key) {
            tracing::debug!("{key} already in flight, merging");
            pending.parents.extend(spec.parents);
            return;
        }
        self.queue.push_back(key.clone());
        self.queued.insert(key, spec);
    }

    /// Start lookups until the pool is full or the queue is empty. Keys the
    /// cache can answer complete on the spot without taking a slot.
    fn dispatch(&mut self) {
        while self.tasks.len() < self.config.limit {
            let Some(key) = self.queue.pop_front() else {
                break;
            };
            let Some(spec) = self.queued.remove(&key) else {
                continue;
            };
            match self.cache.lookup(&key, &spec.name, &spec.range) {
                CacheLookup::Hit(release) => {
                    self.resolved(spec, release);
                    continue;
                }
                CacheLookup::Unsatisfiable => {
                    self.unsatisfiable(spec);
                    continue;
                }
                CacheLookup::Miss => {}
            }
            if let Some(error) = self.unreachable.get(&spec.name).cloned() {
                self.fail(spec, error);
                continue;
            }

            let name = spec.name.clone();
            self.waiting.insert(key, spec);
            if self.fetching.insert(name.clone()) {
                self.spawn_fetch(name);
            }
        }
    }

    fn spawn_fetch(&mut self, name: String) {
        tracing::debug!("fetching {name}");
        let registry = self.registry.clone();
        let deadline = self.config.timeout();
        let secs = self.config.timeout;
        self.tasks.spawn(async move {
            let result = match tokio::time::timeout(deadline, registry.releases(&name)).await {
                Ok(result) => result,
                Err(_) => Err(ShrinkError::Timeout {
                    spec: name.clone(),
                    secs,
                }),
            };
            (name, result)
        });
    }

    fn complete(&mut self, joined: Result<Lookup, JoinError>) {
        let (name, result) = match joined {
            Ok(lookup) => lookup,
            Err(e) => {
                tracing::warn!("registry lookup task failed: {e}");
                return;
            }
        };
        self.fetching.remove(&name);

        let mut keys: Vec<String> = self
            .waiting
            .iter()
            .filter(|(_, spec)| spec.name == name)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();

        match result {
            Ok(set) => {
                self.cache.insert_releases(set);
                for key in keys {
                    let Some(spec) = self.waiting.remove(&key) else {
                        continue;
                    };
                    match self.cache.lookup(&key, &spec.name, &spec.range) {
                        CacheLookup::Hit(release) => self.resolved(spec, release),
                        _ => self.unsatisfiable(spec),
                    }
                }
            }
            Err(error) => {
                self.unreachable.insert(name, error.clone());
                for key in keys {
                    if let Some(spec) = self.waiting.remove(&key) {
                        self.fail(spec, error.clone());
                    }
                }
            }
        }
    }

    /// Create the module for a resolved spec and queue its own dependencies.
    fn resolved(&mut self, spec: PackageSpec, release: Release) {
        let key = spec.key();
        let manifest = dedupe(&release.manifest, self.config.production);
        let module = match self.tree.find_release(&release.name, &release.version) {
            Some(existing) => self.tree.module(existing).clone_with(ModuleOverrides {
                id: Some(key.clone()),
                required: Some(spec.range.clone()),
                depth: Some(spec.depth),
            }),
            None => Module::from_release(
                &key,
                &spec.range,
                &release,
                self.cache.latest(&spec.name),
                spec.depth,
            ),
        };
        tracing::debug!("{key} -> {}", module.version);

        let idx = self.tree.insert(module);
        self.attach(idx, &spec.parents);
        for (_, name, range) in manifest.entries(&CHILD_KINDS) {
            self.enqueue(PackageSpec::new(name, range, idx, spec.depth + 1));
        }
    }

    /// Record new dependents of `idx` and re-hoist it once it is shared.
    ///
    /// A parent's own request beats a module that was only hoisted into its
    /// map.
    fn attach(&mut self, idx: NodeIndex, parents: &BTreeSet<NodeIndex>) {
        let name = self.tree.module(idx).name.clone();
        let mut grew = false;
        let mut displaced = Vec::new();
        for &parent in parents {
            if let Some(occupant) = self.tree.dependency(parent, &name) {
                if occupant != idx && !self.tree.module(occupant).dependents.contains(&parent) {
                    evict(&mut self.tree, occupant, parent);
                    displaced.push(occupant);
                }
            }
            grew |= self.tree.add_dependent(idx, parent);
        }
        if !self.config.optimize {
            return;
        }
        if grew && self.tree.module(idx).dependents.len() > 1 {
            optimize(&mut self.tree, idx);
        }
        for occupant in displaced {
            optimize(&mut self.tree, occupant);
        }
    }

    fn unsatisfiable(&mut self, spec: PackageSpec) {
        let error = ShrinkError::UnsatisfiableRange {
            name: spec.name.clone(),
            range: spec.range.clone(),
        };
        self.fail(spec, error);
    }

    fn fail(&mut self, spec: PackageSpec, error: ShrinkError) {
        let key = spec.key();
        tracing::debug!("{key}: {error}");
        self.failed.insert(key, self.errors.len());
        self.errors.push(ResolveFailure { spec, error });
    }

    fn finish(mut self, cancelled: bool) -> Resolution {
        if cancelled {
            self.tasks.abort_all();
            let queued: Vec<PackageSpec> = std::mem::take(&mut self.queue)
                .into_iter()
                .filter_map(|key| self.queued.remove(&key))
                .collect();
            for spec in queued {
                self.fail(spec, ShrinkError::Cancelled);
            }
        }

        let mut leftover: Vec<PackageSpec> = self.waiting.drain().map(|(_, spec)| spec).collect();
        leftover.sort_by_key(PackageSpec::key);
        for spec in leftover {
            let error = if cancelled {
                ShrinkError::Cancelled
            } else {
                ShrinkError::Generic {
                    message: format!("lookup of {} was aborted", spec.name),
                }
            };
            self.fail(spec, error);
        }

        if self.config.optimize {
            drop_shadowed_copies(&mut self.tree);
        }

        Resolution {
            tree: self.tree,
            errors: self.errors,
        }
    }
}
