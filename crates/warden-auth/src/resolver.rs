//! Ownership tree and ACL chaining.
//!
//! Securable objects form a tree rooted at `/`. Each node may carry a
//! local [`AuthorizationStrategy`] override. Resolving an object walks up
//! its parent chain, collecting overrides, and ends at the root strategy:
//!
//! ```text
//! label/foo (override A) ─► label (no override) ─► / (root strategy R)
//!
//! acl(label/foo) = A.acl_for(label/foo)
//!                    └─ parent: R.acl_for(label/foo)   (terminal)
//! ```
//!
//! An object that was never registered resolves through its nearest
//! registered path ancestor, falling back to the root.

use crate::acl::Acl;
use crate::error::ResolverError;
use crate::strategy::AuthorizationStrategy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use warden_types::ObjectPath;

#[derive(Debug, Clone)]
struct ObjectNode {
    parent: ObjectPath,
    local: Option<Arc<dyn AuthorizationStrategy>>,
}

/// Builds the ACL chain for any object.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use warden_auth::{AclResolver, FeatureFlags, PermissionRegistry, ProjectMatrixStrategy, Subject};
/// use warden_auth::permission::{MANAGE, READ};
/// use warden_types::{Identity, ObjectPath, Scope};
///
/// let registry = Arc::new(
///     PermissionRegistry::with_builtins(FeatureFlags::new().with("manage")).unwrap(),
/// );
/// let root = ProjectMatrixStrategy::new(Arc::clone(&registry));
/// root.grant(Subject::user("alice"), [READ, MANAGE], Scope::Global);
///
/// let resolver = AclResolver::new(Arc::new(root));
/// resolver.register_object("label", ObjectPath::root(), None).unwrap();
/// resolver.register_object("label/foo", "label", None).unwrap();
///
/// let acl = resolver.acl(&ObjectPath::new("label/foo"));
/// assert!(acl.has_permission(&Identity::user("alice"), &MANAGE));
/// ```
#[derive(Debug)]
pub struct AclResolver {
    root: RwLock<Arc<dyn AuthorizationStrategy>>,
    nodes: RwLock<HashMap<ObjectPath, ObjectNode>>,
}

impl AclResolver {
    /// Creates a resolver with only the root object.
    #[must_use]
    pub fn new(root: Arc<dyn AuthorizationStrategy>) -> Self {
        Self {
            root: RwLock::new(root),
            nodes: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the current root strategy.
    #[must_use]
    pub fn root_strategy(&self) -> Arc<dyn AuthorizationStrategy> {
        Arc::clone(&self.root.read())
    }

    /// Swaps the root strategy. ACLs already handed out keep the old one.
    pub fn set_root_strategy(&self, strategy: Arc<dyn AuthorizationStrategy>) {
        *self.root.write() = strategy;
        tracing::debug!("root authorization strategy replaced");
    }

    /// Adds an object to the ownership tree.
    ///
    /// # Errors
    ///
    /// - [`ResolverError::RootReserved`] if `path` is the root
    /// - [`ResolverError::DuplicateObject`] if `path` is already registered
    /// - [`ResolverError::UnknownParent`] if `parent` is neither the root
    ///   nor registered
    pub fn register_object(
        &self,
        path: impl Into<ObjectPath>,
        parent: impl Into<ObjectPath>,
        local: Option<Arc<dyn AuthorizationStrategy>>,
    ) -> Result<(), ResolverError> {
        let path = path.into();
        let parent = parent.into();
        if path.is_root() {
            return Err(ResolverError::RootReserved);
        }
        let mut nodes = self.nodes.write();
        if nodes.contains_key(&path) {
            return Err(ResolverError::DuplicateObject(path));
        }
        if !parent.is_root() && !nodes.contains_key(&parent) {
            return Err(ResolverError::UnknownParent {
                object: path,
                parent,
            });
        }
        tracing::debug!(
            object = %path,
            parent = %parent,
            local = local.is_some(),
            "object registered"
        );
        nodes.insert(path, ObjectNode { parent, local });
        Ok(())
    }

    /// Sets or clears the local override of a registered object.
    ///
    /// Returns `false` if the object is unknown.
    pub fn set_local_strategy(
        &self,
        path: &ObjectPath,
        local: Option<Arc<dyn AuthorizationStrategy>>,
    ) -> bool {
        match self.nodes.write().get_mut(path) {
            Some(node) => {
                node.local = local;
                true
            }
            None => false,
        }
    }

    /// Returns `true` if `path` is the root or a registered object.
    #[must_use]
    pub fn contains(&self, path: &ObjectPath) -> bool {
        path.is_root() || self.nodes.read().contains_key(path)
    }

    /// Returns every registered object (root included), sorted.
    #[must_use]
    pub fn objects(&self) -> Vec<ObjectPath> {
        let mut objects: Vec<ObjectPath> = self.nodes.read().keys().cloned().collect();
        objects.push(ObjectPath::root());
        objects.sort();
        objects
    }

    /// Returns the registered objects that carry a local override, sorted.
    #[must_use]
    pub fn overridden(&self) -> Vec<ObjectPath> {
        let mut objects: Vec<ObjectPath> = self
            .nodes
            .read()
            .iter()
            .filter(|(_, n)| n.local.is_some())
            .map(|(p, _)| p.clone())
            .collect();
        objects.sort();
        objects
    }

    /// Builds the ACL for `object`.
    ///
    /// The result delegates through every local override on the ownership
    /// chain and ends at the root strategy's ACL, which is terminal.
    #[must_use]
    pub fn acl(&self, object: &ObjectPath) -> Acl {
        let (overrides, root) = {
            let nodes = self.nodes.read();
            (self.overrides(&nodes, object), Arc::clone(&self.root.read()))
        };

        let mut acl = root.acl_for(object);
        for strategy in overrides.iter().rev() {
            acl = strategy.acl_for(object).with_parent(acl);
        }
        acl
    }

    /// Collects local overrides from `object` upward, nearest first.
    fn overrides(
        &self,
        nodes: &HashMap<ObjectPath, ObjectNode>,
        object: &ObjectPath,
    ) -> Vec<Arc<dyn AuthorizationStrategy>> {
        let mut found = Vec::new();
        let mut cursor = Some(object.clone());
        while let Some(path) = &cursor {
            if path.is_root() || nodes.contains_key(path) {
                break;
            }
            cursor = path.parent();
        }

        let mut steps = 0;
        while let Some(path) = cursor {
            if path.is_root() || steps > nodes.len() {
                break;
            }
            steps += 1;
            match nodes.get(&path) {
                Some(node) => {
                    if let Some(local) = &node.local {
                        found.push(Arc::clone(local));
                    }
                    cursor = Some(node.parent.clone());
                }
                None => break,
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::Subject;
    use crate::permission::*;
    use crate::registry::{FeatureFlags, PermissionRegistry};
    use crate::strategy::{ProjectMatrixStrategy, UnsecuredStrategy};
    use warden_types::{Identity, PermissionId, Scope};

    fn registry() -> Arc<PermissionRegistry> {
        Arc::new(
            PermissionRegistry::with_builtins(FeatureFlags::new().with(MANAGE_FLAG))
                .expect("builtins"),
        )
    }

    fn matrix(reg: &Arc<PermissionRegistry>, user: &str, perms: &[PermissionId]) -> Arc<ProjectMatrixStrategy> {
        let s = ProjectMatrixStrategy::new(Arc::clone(reg));
        s.grant(Subject::user(user), perms.iter().cloned(), Scope::Global);
        Arc::new(s)
    }

    #[test]
    fn register_errors() {
        let reg = registry();
        let resolver = AclResolver::new(matrix(&reg, "a", &[READ]));
        assert_eq!(
            resolver.register_object("/", "/", None),
            Err(ResolverError::RootReserved)
        );
        assert!(matches!(
            resolver.register_object("label/x", "label", None),
            Err(ResolverError::UnknownParent { .. })
        ));
        resolver
            .register_object("label", "/", None)
            .expect("register label");
        assert_eq!(
            resolver.register_object("label", "/", None),
            Err(ResolverError::DuplicateObject(ObjectPath::new("label")))
        );
    }

    #[test]
    fn root_acl_is_terminal() {
        let reg = registry();
        let resolver = AclResolver::new(matrix(&reg, "a", &[READ]));
        let acl = resolver.acl(&ObjectPath::root());
        assert!(!acl.is_delegating());
        assert!(acl.has_permission(&Identity::user("a"), &READ));
    }

    #[test]
    fn override_delegates_to_root() {
        let reg = registry();
        let resolver = AclResolver::new(matrix(&reg, "root", &[ADMINISTER]));
        resolver
            .register_object("label", "/", None)
            .expect("register");
        resolver
            .register_object("label/foo", "label", Some(matrix(&reg, "m", &[MANAGE])))
            .expect("register");

        let acl = resolver.acl(&ObjectPath::new("label/foo"));
        assert!(acl.is_delegating());
        assert!(acl.has_permission(&Identity::user("m"), &MANAGE));
        assert!(acl.has_permission(&Identity::user("root"), &ADMINISTER));

        // sibling does not see the override
        let other = resolver.acl(&ObjectPath::new("label/bar"));
        assert!(!other.has_permission(&Identity::user("m"), &MANAGE));
    }

    #[test]
    fn unregistered_descendant_inherits_nearest_override() {
        let reg = registry();
        let resolver = AclResolver::new(matrix(&reg, "root", &[ADMINISTER]));
        resolver
            .register_object("computer", "/", Some(matrix(&reg, "ops", &[AGENT_CONFIGURE])))
            .expect("register");
        let acl = resolver.acl(&ObjectPath::new("computer/agent-1"));
        assert!(acl.has_permission(&Identity::user("ops"), &AGENT_CONNECT));
    }

    #[test]
    fn nested_overrides_chain_in_order() {
        let reg = registry();
        let resolver = AclResolver::new(matrix(&reg, "root", &[ADMINISTER]));
        resolver
            .register_object("a", "/", Some(matrix(&reg, "outer", &[READ])))
            .expect("register");
        resolver
            .register_object("a/b", "a", Some(matrix(&reg, "inner", &[MANAGE])))
            .expect("register");

        let acl = resolver.acl(&ObjectPath::new("a/b"));
        let middle = acl.parent().expect("outer override");
        assert!(middle.parent().is_some());
        assert!(acl.has_permission(&Identity::user("inner"), &MANAGE));
        assert!(acl.has_permission(&Identity::user("outer"), &READ));
        assert!(acl.has_permission(&Identity::user("root"), &ADMINISTER));
    }

    #[test]
    fn swapping_root_strategy() {
        let reg = registry();
        let resolver = AclResolver::new(matrix(&reg, "a", &[READ]));
        let held = resolver.acl(&ObjectPath::root());
        resolver.set_root_strategy(Arc::new(UnsecuredStrategy::new(Arc::clone(&reg))));
        let anon = Identity::anonymous();
        assert!(resolver.acl(&ObjectPath::root()).has_permission(&anon, &ADMINISTER));
        assert!(!held.has_permission(&anon, &ADMINISTER));
    }

    #[test]
    fn local_strategy_can_be_cleared() {
        let reg = registry();
        let resolver = AclResolver::new(matrix(&reg, "root", &[ADMINISTER]));
        resolver
            .register_object("label", "/", Some(matrix(&reg, "m", &[MANAGE])))
            .expect("register");
        assert_eq!(resolver.overridden(), vec![ObjectPath::new("label")]);
        assert!(resolver.set_local_strategy(&ObjectPath::new("label"), None));
        assert!(resolver.overridden().is_empty());
        assert!(!resolver.set_local_strategy(&ObjectPath::new("nope"), None));
    }

    #[test]
    fn objects_include_root() {
        let reg = registry();
        let resolver = AclResolver::new(matrix(&reg, "a", &[READ]));
        resolver.register_object("label", "/", None).expect("register");
        assert_eq!(
            resolver.objects(),
            vec![ObjectPath::root(), ObjectPath::new("label")]
        );
        assert!(resolver.contains(&ObjectPath::root()));
        assert!(!resolver.contains(&ObjectPath::new("x")));
    }
}
