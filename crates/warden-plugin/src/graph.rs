//! Plugin dependency graph.
//!
//! The edge set is fixed at load time; only the per-plugin `enabled` flag
//! changes afterwards, and only through
//! [`PluginLifecycleManager`](crate::PluginLifecycleManager).
//!
//! # Traversal
//!
//! ```text
//! dependencies_of(x)   x ──mandatory──► ... (forward closure)
//! dependents_of(x)     ... ──mandatory──► x (reverse closure)
//! ```
//!
//! Optional edges are never followed. Traversals keep a visited set, so a
//! cycle in the installed set terminates instead of looping.

use crate::descriptor::PluginDescriptor;
use crate::error::PluginError;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use warden_types::PluginId;

#[derive(Debug)]
struct Node {
    descriptor: PluginDescriptor,
    enabled: AtomicBool,
}

/// Installed plugins and their mandatory edges.
///
/// # Example
///
/// ```
/// use warden_plugin::{PluginDependencyGraph, PluginDescriptor};
/// use warden_types::PluginId;
///
/// let graph = PluginDependencyGraph::from_descriptors([
///     PluginDescriptor::new("scm-api", "1.0"),
///     PluginDescriptor::new("git", "1.0").depends_on("scm-api"),
///     PluginDescriptor::new("mailer", "1.0").optionally_depends_on("scm-api"),
/// ])
/// .unwrap();
///
/// let scm = PluginId::new("scm-api");
/// assert!(graph.would_break(&scm));
/// assert_eq!(graph.dependents_of(&scm, true).len(), 1); // mailer is optional
/// ```
#[derive(Debug)]
pub struct PluginDependencyGraph {
    nodes: BTreeMap<PluginId, Node>,
    reverse: BTreeMap<PluginId, BTreeSet<PluginId>>,
    generation: AtomicU64,
}

impl PluginDependencyGraph {
    /// Builds the graph.
    ///
    /// # Errors
    ///
    /// - [`PluginError::Duplicate`] if two descriptors share an id
    /// - [`PluginError::SelfDependency`] if a plugin depends on itself
    /// - [`PluginError::MissingDependency`] if a mandatory target is not
    ///   installed
    /// - [`PluginError::DisabledDependency`] if an enabled plugin has a
    ///   disabled mandatory dependency
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = PluginDescriptor>,
    ) -> Result<Self, PluginError> {
        let mut nodes = BTreeMap::new();
        for descriptor in descriptors {
            let id = descriptor.id.clone();
            if descriptor.dependencies.iter().any(|d| d.target == id) {
                return Err(PluginError::SelfDependency(id));
            }
            let enabled = AtomicBool::new(descriptor.enabled);
            if nodes.insert(id.clone(), Node { descriptor, enabled }).is_some() {
                return Err(PluginError::Duplicate(id));
            }
        }

        let mut reverse: BTreeMap<PluginId, BTreeSet<PluginId>> = BTreeMap::new();
        for (id, node) in &nodes {
            for dep in node.descriptor.mandatory() {
                let Some(target) = nodes.get(&dep.target) else {
                    return Err(PluginError::MissingDependency {
                        plugin: id.clone(),
                        dependency: dep.target.clone(),
                    });
                };
                if node.descriptor.enabled && !target.descriptor.enabled {
                    return Err(PluginError::DisabledDependency {
                        plugin: id.clone(),
                        dependency: dep.target.clone(),
                    });
                }
                reverse
                    .entry(dep.target.clone())
                    .or_default()
                    .insert(id.clone());
            }
        }

        tracing::debug!(plugins = nodes.len(), "plugin graph loaded");
        Ok(Self {
            nodes,
            reverse,
            generation: AtomicU64::new(0),
        })
    }

    /// Returns the static descriptor (its `enabled` is the load-time value).
    #[must_use]
    pub fn get(&self, id: &PluginId) -> Option<&PluginDescriptor> {
        self.nodes.get(id).map(|n| &n.descriptor)
    }

    /// Returns `true` if the plugin is installed.
    #[must_use]
    pub fn contains(&self, id: &PluginId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Iterates over installed plugin ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &PluginId> {
        self.nodes.keys()
    }

    /// Iterates over `(descriptor, currently enabled)` in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&PluginDescriptor, bool)> {
        self.nodes
            .values()
            .map(|n| (&n.descriptor, n.enabled.load(Ordering::Acquire)))
    }

    /// Returns the number of installed plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if nothing is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the current enabled flag. `false` for unknown plugins.
    #[must_use]
    pub fn is_enabled(&self, id: &PluginId) -> bool {
        self.nodes
            .get(id)
            .is_some_and(|n| n.enabled.load(Ordering::Acquire))
    }

    /// Returns a counter bumped on every effective flag change.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Returns every plugin that transitively depends on `id` through
    /// mandatory edges, excluding `id`. With `only_enabled`, the result is
    /// restricted to currently enabled plugins.
    #[must_use]
    pub fn dependents_of(&self, id: &PluginId, only_enabled: bool) -> BTreeSet<PluginId> {
        let closure = self.closure(id, |p| self.reverse.get(p).into_iter().flatten().cloned().collect());
        if only_enabled {
            closure.into_iter().filter(|p| self.is_enabled(p)).collect()
        } else {
            closure
        }
    }

    /// Returns `true` if disabling `id` would leave an enabled plugin
    /// without a mandatory dependency.
    #[must_use]
    pub fn would_break(&self, id: &PluginId) -> bool {
        !self.dependents_of(id, true).is_empty()
    }

    /// Returns every plugin `id` transitively requires, excluding `id`.
    #[must_use]
    pub fn dependencies_of(&self, id: &PluginId) -> BTreeSet<PluginId> {
        self.closure(id, |p| {
            self.nodes
                .get(p)
                .map(|n| n.descriptor.mandatory().map(|d| d.target.clone()).collect())
                .unwrap_or_default()
        })
    }

    /// Returns the mandatory dependencies of `id` that are currently
    /// disabled.
    #[must_use]
    pub fn disabled_dependencies(&self, id: &PluginId) -> BTreeSet<PluginId> {
        self.dependencies_of(id)
            .into_iter()
            .filter(|p| !self.is_enabled(p))
            .collect()
    }

    /// Sets the flag. Returns `true` if it changed (and bumps the
    /// generation). Callers must hold the plugin's lock.
    pub(crate) fn set_enabled(&self, id: &PluginId, enabled: bool) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        let changed = node.enabled.swap(enabled, Ordering::AcqRel) != enabled;
        if changed {
            self.generation.fetch_add(1, Ordering::AcqRel);
        }
        changed
    }

    fn closure<F>(&self, start: &PluginId, next: F) -> BTreeSet<PluginId>
    where
        F: Fn(&PluginId) -> Vec<PluginId>,
    {
        let mut visited = BTreeSet::new();
        let mut stack = next(start);
        while let Some(id) = stack.pop() {
            if &id == start || !visited.insert(id.clone()) {
                continue;
            }
            stack.extend(next(&id));
        }
        visited
    }
}
