//! Permission-gated plugin enable/disable.
//!
//! # Algorithm
//!
//! ```text
//! disable(identity, id)
//!   1. Administer on "/"?            no  → Denied (plugin not looked up)
//!   2. installed?                    no  → Err(NotFound)
//!   3. lock {id} ∪ dependents_of(id, all)   in PluginId order
//!   4. enabled dependents?           yes → BlockedByDependents(set)
//!   5. clear flag                         → Ok (no-op if already off)
//!
//! enable(identity, id)
//!   1-2 as above
//!   3. lock {id} ∪ dependencies_of(id)      in PluginId order
//!   4. disabled dependencies?        yes → BlockedByDependencies(set)
//!   5. set flag                           → Ok (no-op if already on)
//! ```
//!
//! A disable of a dependency and an enable of its dependent always share
//! at least two locks, so they serialise. Nothing cascades: each call
//! changes at most one flag.

use crate::error::PluginError;
use crate::graph::PluginDependencyGraph;
use parking_lot::{Mutex, MutexGuard};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use warden_auth::permission::ADMINISTER;
use warden_auth::AclResolver;
use warden_types::{Identity, ObjectPath, PluginId};

/// Result of a lifecycle call that reached a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// The plugin is now in the requested state.
    Ok,
    /// The caller lacks Administer. Nothing was changed.
    Denied,
    /// Enabled plugins still require this one.
    BlockedByDependents(BTreeSet<PluginId>),
    /// Required plugins are disabled.
    BlockedByDependencies(BTreeSet<PluginId>),
}

impl LifecycleOutcome {
    /// Returns `true` for [`LifecycleOutcome::Ok`].
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for LifecycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |set: &BTreeSet<PluginId>| {
            set.iter()
                .map(PluginId::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            Self::Ok => f.write_str("ok"),
            Self::Denied => f.write_str("forbidden"),
            Self::BlockedByDependents(set) => {
                write!(f, "required by enabled plugins: {}", join(set))
            }
            Self::BlockedByDependencies(set) => {
                write!(f, "requires disabled plugins: {}", join(set))
            }
        }
    }
}

/// The only mutator of plugin enabled flags.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use warden_auth::testing::MockAuthorizationStrategy;
/// use warden_auth::permission::ADMINISTER;
/// use warden_auth::{AclResolver, FeatureFlags, PermissionRegistry};
/// use warden_plugin::{LifecycleOutcome, PluginDependencyGraph, PluginDescriptor, PluginLifecycleManager};
/// use warden_types::{Identity, PluginId};
///
/// let registry = Arc::new(PermissionRegistry::with_builtins(FeatureFlags::new()).unwrap());
/// let mut mock = MockAuthorizationStrategy::new(registry);
/// mock.grant([ADMINISTER]).everywhere().to("admin");
/// let resolver = Arc::new(AclResolver::new(Arc::new(mock)));
///
/// let graph = Arc::new(
///     PluginDependencyGraph::from_descriptors([PluginDescriptor::new("git", "1.0")]).unwrap(),
/// );
/// let manager = PluginLifecycleManager::new(Arc::clone(&graph), resolver);
///
/// let git = PluginId::new("git");
/// let outcome = manager.disable(&Identity::user("admin"), &git).unwrap();
/// assert_eq!(outcome, LifecycleOutcome::Ok);
/// assert!(!graph.is_enabled(&git));
/// ```
#[derive(Debug)]
pub struct PluginLifecycleManager {
    graph: Arc<PluginDependencyGraph>,
    resolver: Arc<AclResolver>,
    locks: BTreeMap<PluginId, Mutex<()>>,
}

impl PluginLifecycleManager {
    /// Creates a manager over `graph`, authorising through `resolver`.
    #[must_use]
    pub fn new(graph: Arc<PluginDependencyGraph>, resolver: Arc<AclResolver>) -> Self {
        let locks = graph.ids().map(|id| (id.clone(), Mutex::new(()))).collect();
        Self {
            graph,
            resolver,
            locks,
        }
    }

    /// Returns the graph this manager mutates.
    #[must_use]
    pub fn graph(&self) -> &Arc<PluginDependencyGraph> {
        &self.graph
    }

    /// Disables a plugin.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] if the caller is authorised but the
    /// plugin is not installed.
    pub fn disable(
        &self,
        identity: &Identity,
        id: &PluginId,
    ) -> Result<LifecycleOutcome, PluginError> {
        if !self.authorised(identity) {
            return Ok(LifecycleOutcome::Denied);
        }
        if !self.graph.contains(id) {
            return Err(PluginError::NotFound(id.clone()));
        }

        let mut scope = self.graph.dependents_of(id, false);
        scope.insert(id.clone());
        let _guards = self.lock_all(&scope);

        let blockers = self.graph.dependents_of(id, true);
        if !blockers.is_empty() {
            tracing::warn!(
                principal = %identity.principal(),
                plugin = %id,
                dependents = ?blockers,
                "disable blocked by enabled dependents"
            );
            return Ok(LifecycleOutcome::BlockedByDependents(blockers));
        }

        if self.graph.set_enabled(id, false) {
            tracing::info!(
                principal = %identity.principal(),
                plugin = %id,
                generation = self.graph.generation(),
                "plugin disabled"
            );
        } else {
            tracing::debug!(plugin = %id, "plugin already disabled");
        }
        Ok(LifecycleOutcome::Ok)
    }

    /// Enables a plugin.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotFound`] if the caller is authorised but the
    /// plugin is not installed.
    pub fn enable(
        &self,
        identity: &Identity,
        id: &PluginId,
    ) -> Result<LifecycleOutcome, PluginError> {
        if !self.authorised(identity) {
            return Ok(LifecycleOutcome::Denied);
        }
        if !self.graph.contains(id) {
            return Err(PluginError::NotFound(id.clone()));
        }

        let mut scope = self.graph.dependencies_of(id);
        scope.insert(id.clone());
        let _guards = self.lock_all(&scope);

        let missing = self.graph.disabled_dependencies(id);
        if !missing.is_empty() {
            tracing::warn!(
                principal = %identity.principal(),
                plugin = %id,
                dependencies = ?missing,
                "enable blocked by disabled dependencies"
            );
            return Ok(LifecycleOutcome::BlockedByDependencies(missing));
        }

        if self.graph.set_enabled(id, true) {
            tracing::info!(
                principal = %identity.principal(),
                plugin = %id,
                generation = self.graph.generation(),
                "plugin enabled"
            );
        } else {
            tracing::debug!(plugin = %id, "plugin already enabled");
        }
        Ok(LifecycleOutcome::Ok)
    }

    fn authorised(&self, identity: &Identity) -> bool {
        self.resolver
            .acl(&ObjectPath::root())
            .check(identity, &ADMINISTER)
            .is_ok()
    }

    /// Locks every plugin in `ids`. `BTreeSet` iteration is `PluginId`
    /// order, which every caller shares.
    fn lock_all(&self, ids: &BTreeSet<PluginId>) -> Vec<MutexGuard<'_, ()>> {
        ids.iter()
            .filter_map(|id| self.locks.get(id))
            .map(|lock| lock.lock())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PluginDescriptor;
    use warden_auth::permission::{MANAGE, MANAGE_FLAG, READ};
    use warden_auth::testing::MockAuthorizationStrategy;
    use warden_auth::{FeatureFlags, PermissionRegistry};

    fn id(s: &str) -> PluginId {
        PluginId::new(s)
    }

    fn setup() -> PluginLifecycleManager {
        let registry = Arc::new(
            PermissionRegistry::with_builtins(FeatureFlags::new().with(MANAGE_FLAG))
                .expect("builtins"),
        );
        let mut mock = MockAuthorizationStrategy::new(registry);
        mock.grant([ADMINISTER]).everywhere().to("admin");
        mock.grant([READ, MANAGE]).everywhere().to("manager");
        let resolver = Arc::new(AclResolver::new(Arc::new(mock)));
        let graph = Arc::new(
            PluginDependencyGraph::from_descriptors([
                PluginDescriptor::new("scm-api", "1.0"),
                PluginDescriptor::new("git", "1.0").depends_on("scm-api"),
                PluginDescriptor::new("standalone", "1.0"),
            ])
            .expect("graph"),
        );
        PluginLifecycleManager::new(graph, resolver)
    }

    #[test]
    fn manage_cannot_disable() {
        let m = setup();
        let manager = Identity::user("manager");
        for plugin in ["standalone", "scm-api"] {
            assert_eq!(
                m.disable(&manager, &id(plugin)).expect("decision"),
                LifecycleOutcome::Denied
            );
            assert!(m.graph().is_enabled(&id(plugin)));
        }
        assert_eq!(m.graph().generation(), 0);
    }

    #[test]
    fn denied_before_lookup() {
        let m = setup();
        assert_eq!(
            m.disable(&Identity::user("manager"), &id("ghost")),
            Ok(LifecycleOutcome::Denied)
        );
        assert_eq!(
            m.enable(&Identity::anonymous(), &id("ghost")),
            Ok(LifecycleOutcome::Denied)
        );
    }

    #[test]
    fn unknown_plugin_is_not_found() {
        let m = setup();
        assert_eq!(
            m.disable(&Identity::user("admin"), &id("ghost")),
            Err(PluginError::NotFound(id("ghost")))
        );
    }

    #[test]
    fn disable_is_idempotent() {
        let m = setup();
        let admin = Identity::user("admin");
        assert!(m.disable(&admin, &id("standalone")).expect("ok").is_ok());
        assert_eq!(m.graph().generation(), 1);
        assert!(m.disable(&admin, &id("standalone")).expect("ok").is_ok());
        assert_eq!(m.graph().generation(), 1);
        assert!(!m.graph().is_enabled(&id("standalone")));
    }

    #[test]
    fn blocked_by_enabled_dependents() {
        let m = setup();
        let admin = Identity::user("admin");
        assert_eq!(
            m.disable(&admin, &id("scm-api")).expect("decision"),
            LifecycleOutcome::BlockedByDependents(BTreeSet::from([id("git")]))
        );
        assert!(m.graph().is_enabled(&id("scm-api")));

        assert!(m.disable(&admin, &id("git")).expect("ok").is_ok());
        assert!(m.disable(&admin, &id("scm-api")).expect("ok").is_ok());
    }

    #[test]
    fn enable_requires_dependencies() {
        let m = setup();
        let admin = Identity::user("admin");
        m.disable(&admin, &id("git")).expect("ok");
        m.disable(&admin, &id("scm-api")).expect("ok");

        assert_eq!(
            m.enable(&admin, &id("git")).expect("decision"),
            LifecycleOutcome::BlockedByDependencies(BTreeSet::from([id("scm-api")]))
        );
        assert!(m.enable(&admin, &id("scm-api")).expect("ok").is_ok());
        assert!(m.enable(&admin, &id("git")).expect("ok").is_ok());
        let generation = m.graph().generation();
        assert!(m.enable(&admin, &id("git")).expect("ok").is_ok());
        assert_eq!(m.graph().generation(), generation);
    }

    #[test]
    fn outcome_display() {
        assert_eq!(LifecycleOutcome::Denied.to_string(), "forbidden");
        assert_eq!(
            LifecycleOutcome::BlockedByDependents(BTreeSet::from([id("a"), id("b")])).to_string(),
            "required by enabled plugins: a, b"
        );
    }
}
