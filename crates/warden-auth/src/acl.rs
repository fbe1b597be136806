//! Access control lists.
//!
//! An [`Acl`] is the decision procedure for one securable object. It is a
//! value: a rule snapshot, the object it was built for, and optionally the
//! parent ACL it delegates to when none of its own rules apply.
//!
//! # Resolution
//!
//! ```text
//! has_permission(identity, p)
//!   1. p' = registry.effective(p)            (unknown p: deny)
//!   2. applicable = rules matching identity whose scope covers object
//!   3. applicable empty and parent present   → parent.has_permission
//!   4. granted = ∪ applicable, disabled grants dropped
//!      allow iff ∃ g ∈ granted: implies(g, p')
//! ```
//!
//! The check is pure: no I/O, no mutation. The anonymous identity is
//! evaluated like any other; only the rules decide.
//!
//! # Audit Logging
//!
//! [`Acl::check`] logs allowed checks at debug level and denied checks at
//! warn level.

use crate::error::AccessDenied;
use crate::grant::GrantRule;
use crate::registry::PermissionRegistry;
use std::collections::BTreeSet;
use std::sync::Arc;
use warden_types::{Identity, ObjectPath, PermissionId, Scope};

/// How an ACL filters rules by scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeMode {
    /// Only [`Scope::Global`] rules are honoured; the object is ignored.
    Flat,
    /// Rules whose scope covers the object are honoured.
    Scoped,
}

/// The decision procedure for one object.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use warden_auth::{Acl, FeatureFlags, GrantRule, PermissionRegistry, ScopeMode, Subject};
/// use warden_auth::permission::{ADMINISTER, MANAGE, READ};
/// use warden_types::{Identity, ObjectPath, Scope};
///
/// let registry = Arc::new(
///     PermissionRegistry::with_builtins(FeatureFlags::new().with("manage")).unwrap(),
/// );
/// let rules = vec![GrantRule::new(Subject::user("alice"), [MANAGE], Scope::Global)];
/// let acl = Acl::new(registry, ObjectPath::root(), rules.into(), ScopeMode::Scoped);
///
/// let alice = Identity::user("alice");
/// assert!(acl.has_permission(&alice, &READ));
/// assert!(acl.has_permission(&alice, &MANAGE));
/// assert!(!acl.has_permission(&alice, &ADMINISTER));
/// ```
#[derive(Debug, Clone)]
pub struct Acl {
    registry: Arc<PermissionRegistry>,
    object: ObjectPath,
    rules: Arc<[GrantRule]>,
    mode: ScopeMode,
    parent: Option<Arc<Acl>>,
}

impl Acl {
    /// Creates a terminal ACL.
    #[must_use]
    pub fn new(
        registry: Arc<PermissionRegistry>,
        object: ObjectPath,
        rules: Arc<[GrantRule]>,
        mode: ScopeMode,
    ) -> Self {
        Self {
            registry,
            object,
            rules,
            mode,
            parent: None,
        }
    }

    /// Makes this ACL delegate to `parent` when none of its rules apply.
    #[must_use]
    pub fn with_parent(mut self, parent: Acl) -> Self {
        self.parent = Some(Arc::new(parent));
        self
    }

    /// Returns the object this ACL was built for.
    #[must_use]
    pub fn object(&self) -> &ObjectPath {
        &self.object
    }

    /// Returns `true` if this ACL delegates to a parent.
    #[must_use]
    pub fn is_delegating(&self) -> bool {
        self.parent.is_some()
    }

    /// Returns the parent ACL, if delegating.
    #[must_use]
    pub fn parent(&self) -> Option<&Acl> {
        self.parent.as_deref()
    }

    /// Returns the registry decisions are made against.
    #[must_use]
    pub fn registry(&self) -> &Arc<PermissionRegistry> {
        &self.registry
    }

    /// Decides whether `identity` holds `permission` on this object.
    #[must_use]
    pub fn has_permission(&self, identity: &Identity, permission: &PermissionId) -> bool {
        let Some(effective) = self.registry.effective(permission) else {
            tracing::warn!(
                principal = %identity.principal(),
                permission = %permission,
                object = %self.object,
                "check against unknown permission denied"
            );
            return false;
        };
        self.decide(identity, &effective)
    }

    /// Like [`has_permission`](Self::has_permission), with audit logging and
    /// an error carrying the (substituted) permission on denial.
    ///
    /// # Errors
    ///
    /// Returns [`AccessDenied`] if the identity lacks the permission.
    pub fn check(&self, identity: &Identity, permission: &PermissionId) -> Result<(), AccessDenied> {
        let effective = self
            .registry
            .effective(permission)
            .unwrap_or_else(|| permission.clone());
        if self.has_permission(identity, permission) {
            tracing::debug!(
                principal = %identity.principal(),
                permission = %effective,
                object = %self.object,
                "permission allowed"
            );
            Ok(())
        } else {
            tracing::warn!(
                principal = %identity.principal(),
                permission = %effective,
                object = %self.object,
                "permission denied"
            );
            Err(AccessDenied::new(
                identity.principal(),
                effective,
                self.object.clone(),
            ))
        }
    }

    /// Returns the enabled permissions `identity` is directly granted on
    /// this object (not expanded through implication).
    ///
    /// Follows the same delegation rule as
    /// [`has_permission`](Self::has_permission).
    #[must_use]
    pub fn granted(&self, identity: &Identity) -> BTreeSet<PermissionId> {
        let applicable = self.applicable(identity);
        if applicable.is_empty() {
            if let Some(parent) = &self.parent {
                return parent.granted(identity);
            }
        }
        applicable
            .iter()
            .flat_map(|r| r.permissions().iter())
            .filter(|p| self.registry.is_enabled(p))
            .cloned()
            .collect()
    }

    fn decide(&self, identity: &Identity, effective: &PermissionId) -> bool {
        let applicable = self.applicable(identity);
        if applicable.is_empty() {
            if let Some(parent) = &self.parent {
                return parent.decide(identity, effective);
            }
            return false;
        }
        applicable
            .iter()
            .flat_map(|r| r.permissions().iter())
            .filter(|g| self.registry.is_enabled(g))
            .any(|g| self.registry.implies(g, effective))
    }

    fn applicable(&self, identity: &Identity) -> Vec<&GrantRule> {
        self.rules
            .iter()
            .filter(|r| match self.mode {
                ScopeMode::Flat => r.scope() == &Scope::Global,
                ScopeMode::Scoped => r.scope().covers(&self.object),
            })
            .filter(|r| r.subject().matches(identity))
            .collect()
    }
}
