//! Authorization strategies.
//!
//! An [`AuthorizationStrategy`] turns an object into an [`Acl`]. The
//! resolver asks the root strategy (or a per-object override) for an ACL and
//! chains the results.
//!
//! | Strategy | Rules honoured |
//! |----------|----------------|
//! | [`GlobalMatrixStrategy`] | global rules only, object ignored |
//! | [`ProjectMatrixStrategy`] | rules whose scope covers the object |
//! | [`UnsecuredStrategy`] | everyone holds Administer |
//! | [`LoggedInFullControlStrategy`] | authenticated holds Administer |

use crate::acl::{Acl, ScopeMode};
use crate::grant::{GrantRule, GrantRules, Subject};
use crate::permission::{ADMINISTER, READ};
use crate::registry::PermissionRegistry;
use std::fmt::Debug;
use std::sync::Arc;
use warden_types::{ObjectPath, PermissionId, Scope, ANONYMOUS, AUTHENTICATED, EVERYONE};

/// Maps an object to the ACL governing it.
///
/// Implementations must be cheap to call: the dispatcher asks for an ACL on
/// every request.
///
/// # Example Implementation
///
/// ```
/// use std::sync::Arc;
/// use warden_auth::{Acl, AuthorizationStrategy, GrantRule, PermissionRegistry, ScopeMode};
/// use warden_types::ObjectPath;
///
/// #[derive(Debug)]
/// struct DenyAll(Arc<PermissionRegistry>);
///
/// impl AuthorizationStrategy for DenyAll {
///     fn acl_for(&self, object: &ObjectPath) -> Acl {
///         let rules: Vec<GrantRule> = Vec::new();
///         Acl::new(Arc::clone(&self.0), object.clone(), rules.into(), ScopeMode::Scoped)
///     }
/// }
/// ```
pub trait AuthorizationStrategy: Send + Sync + Debug {
    /// Returns the ACL for `object`. The returned ACL is terminal; the
    /// resolver attaches parents.
    fn acl_for(&self, object: &ObjectPath) -> Acl;
}

macro_rules! matrix_strategy {
    ($name:ident, $mode:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug)]
        pub struct $name {
            registry: Arc<PermissionRegistry>,
            rules: GrantRules,
        }

        impl $name {
            /// Creates a strategy with no rules.
            #[must_use]
            pub fn new(registry: Arc<PermissionRegistry>) -> Self {
                Self {
                    registry,
                    rules: GrantRules::new(),
                }
            }

            /// Creates a strategy holding `rules`.
            #[must_use]
            pub fn with_rules(
                registry: Arc<PermissionRegistry>,
                rules: impl IntoIterator<Item = GrantRule>,
            ) -> Self {
                Self {
                    registry,
                    rules: GrantRules::from_rules(rules),
                }
            }

            /// Adds a grant.
            pub fn grant(
                &self,
                subject: Subject,
                permissions: impl IntoIterator<Item = PermissionId>,
                scope: Scope,
            ) {
                tracing::debug!(subject = %subject, scope = %scope, "grant added");
                self.rules.grant(subject, permissions, scope);
            }

            /// Removes a grant. Returns `true` if anything was removed.
            pub fn revoke(&self, subject: &Subject, permission: &PermissionId, scope: &Scope) -> bool {
                let removed = self.rules.revoke(subject, permission, scope);
                tracing::debug!(
                    subject = %subject,
                    permission = %permission,
                    scope = %scope,
                    removed,
                    "grant revoked"
                );
                removed
            }

            /// Replaces every rule at once.
            pub fn replace_rules(&self, rules: impl IntoIterator<Item = GrantRule>) {
                self.rules.replace(rules);
            }

            /// Returns the current rule snapshot.
            #[must_use]
            pub fn rules(&self) -> Arc<[GrantRule]> {
                self.rules.snapshot()
            }
        }

        impl AuthorizationStrategy for $name {
            fn acl_for(&self, object: &ObjectPath) -> Acl {
                Acl::new(
                    Arc::clone(&self.registry),
                    object.clone(),
                    self.rules.snapshot(),
                    $mode,
                )
            }
        }
    };
}

matrix_strategy!(
    GlobalMatrixStrategy,
    ScopeMode::Flat,
    "Flat matrix: only global rules count and the object is ignored."
);

matrix_strategy!(
    ProjectMatrixStrategy,
    ScopeMode::Scoped,
    "Scoped matrix: a rule counts on the objects its scope covers."
);

/// Everyone, anonymous included, holds Administer.
#[derive(Debug)]
pub struct UnsecuredStrategy {
    registry: Arc<PermissionRegistry>,
    rules: Arc<[GrantRule]>,
}

impl UnsecuredStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new(registry: Arc<PermissionRegistry>) -> Self {
        let rules = vec![GrantRule::new(
            Subject::group(EVERYONE),
            [ADMINISTER],
            Scope::Global,
        )];
        Self {
            registry,
            rules: rules.into(),
        }
    }
}

impl AuthorizationStrategy for UnsecuredStrategy {
    fn acl_for(&self, object: &ObjectPath) -> Acl {
        Acl::new(
            Arc::clone(&self.registry),
            object.clone(),
            Arc::clone(&self.rules),
            ScopeMode::Flat,
        )
    }
}

/// Any authenticated identity holds Administer; anonymous optionally holds
/// Read.
#[derive(Debug)]
pub struct LoggedInFullControlStrategy {
    registry: Arc<PermissionRegistry>,
    rules: Arc<[GrantRule]>,
}

impl LoggedInFullControlStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new(registry: Arc<PermissionRegistry>, anonymous_read: bool) -> Self {
        let mut rules = vec![GrantRule::new(
            Subject::group(AUTHENTICATED),
            [ADMINISTER],
            Scope::Global,
        )];
        if anonymous_read {
            rules.push(GrantRule::new(
                Subject::group(ANONYMOUS),
                [READ],
                Scope::Global,
            ));
        }
        Self {
            registry,
            rules: rules.into(),
        }
    }

    /// Returns `true` if anonymous callers may read.
    #[must_use]
    pub fn allows_anonymous_read(&self) -> bool {
        self.rules.len() > 1
    }
}

impl AuthorizationStrategy for LoggedInFullControlStrategy {
    fn acl_for(&self, object: &ObjectPath) -> Acl {
        Acl::new(
            Arc::clone(&self.registry),
            object.clone(),
            Arc::clone(&self.rules),
            ScopeMode::Flat,
        )
    }
}
