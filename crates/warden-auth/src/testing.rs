//! Fluent strategy for tests.
//!
//! ```
//! use std::sync::Arc;
//! use warden_auth::testing::MockAuthorizationStrategy;
//! use warden_auth::{AuthorizationStrategy, FeatureFlags, PermissionRegistry};
//! use warden_auth::permission::{MANAGE, READ};
//! use warden_types::{Identity, ObjectPath};
//!
//! let registry = Arc::new(
//!     PermissionRegistry::with_builtins(FeatureFlags::new().with("manage")).unwrap(),
//! );
//! let mut mock = MockAuthorizationStrategy::new(registry);
//! mock.grant([READ, MANAGE]).everywhere().to("alice");
//! mock.grant([READ]).on("label/foo").to_group("viewers");
//!
//! let acl = mock.acl_for(&ObjectPath::new("label/foo"));
//! assert!(acl.has_permission(&Identity::user("alice"), &MANAGE));
//! assert!(acl.has_permission(&Identity::user("v").with_group("viewers"), &READ));
//! ```

use crate::acl::{Acl, ScopeMode};
use crate::grant::{GrantRule, Subject};
use crate::registry::PermissionRegistry;
use crate::strategy::AuthorizationStrategy;
use std::collections::BTreeSet;
use std::sync::Arc;
use warden_types::{ObjectPath, PermissionId, Scope};

/// Scoped strategy assembled with a builder chain.
#[derive(Debug)]
pub struct MockAuthorizationStrategy {
    registry: Arc<PermissionRegistry>,
    rules: Vec<GrantRule>,
}

impl MockAuthorizationStrategy {
    /// Creates a strategy that grants nothing.
    #[must_use]
    pub fn new(registry: Arc<PermissionRegistry>) -> Self {
        Self {
            registry,
            rules: Vec::new(),
        }
    }

    /// Starts a grant of `permissions`.
    pub fn grant(&mut self, permissions: impl IntoIterator<Item = PermissionId>) -> MockGrant<'_> {
        MockGrant {
            mock: self,
            permissions: permissions.into_iter().collect(),
        }
    }

    /// Returns the rules added so far.
    #[must_use]
    pub fn rules(&self) -> &[GrantRule] {
        &self.rules
    }
}

impl AuthorizationStrategy for MockAuthorizationStrategy {
    fn acl_for(&self, object: &ObjectPath) -> Acl {
        Acl::new(
            Arc::clone(&self.registry),
            object.clone(),
            self.rules.clone().into(),
            ScopeMode::Scoped,
        )
    }
}

/// A grant waiting for its scope.
pub struct MockGrant<'a> {
    mock: &'a mut MockAuthorizationStrategy,
    permissions: BTreeSet<PermissionId>,
}

impl<'a> MockGrant<'a> {
    /// Grants on every object.
    pub fn everywhere(self) -> MockScopedGrant<'a> {
        self.scoped(Scope::Global)
    }

    /// Grants on `path` and its descendants.
    pub fn on(self, path: impl Into<ObjectPath>) -> MockScopedGrant<'a> {
        self.scoped(Scope::object(path))
    }

    fn scoped(self, scope: Scope) -> MockScopedGrant<'a> {
        MockScopedGrant {
            mock: self.mock,
            permissions: self.permissions,
            scope,
        }
    }
}

/// A scoped grant waiting for its subjects. Each `to*` call adds a rule.
pub struct MockScopedGrant<'a> {
    mock: &'a mut MockAuthorizationStrategy,
    permissions: BTreeSet<PermissionId>,
    scope: Scope,
}

impl MockScopedGrant<'_> {
    /// Grants to a principal or group named `name`.
    pub fn to(self, name: &str) -> Self {
        self.push(Subject::name(name))
    }

    /// Grants to a principal only.
    pub fn to_user(self, name: &str) -> Self {
        self.push(Subject::user(name))
    }

    /// Grants to a group only.
    pub fn to_group(self, name: &str) -> Self {
        self.push(Subject::group(name))
    }

    fn push(self, subject: Subject) -> Self {
        self.mock.rules.push(GrantRule::new(
            subject,
            self.permissions.iter().cloned(),
            self.scope.clone(),
        ));
        self
    }
}
