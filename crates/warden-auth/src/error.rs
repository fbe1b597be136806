//! Authorization error types.
//!
//! ```text
//! RegistryError   startup-time, fatal: the permission catalog is unusable
//! AccessDenied    request-time: the identity lacks a permission
//! ResolverError   startup-time, fatal: the ownership tree is malformed
//! ```

use thiserror::Error;
use warden_types::{ErrorCode, ObjectPath, PermissionId};

/// A permission catalog that cannot be sealed.
///
/// Every variant aborts startup: an ambiguous or cyclic catalog makes
/// grant decisions unpredictable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The same id was registered twice.
    #[error("permission '{0}' registered twice")]
    DuplicatePermission(PermissionId),

    /// `implied_by` names a permission that was never registered.
    #[error("permission '{permission}' is implied by unknown permission '{implier}'")]
    UnknownImplier {
        /// The permission being registered.
        permission: PermissionId,
        /// The missing implier.
        implier: PermissionId,
    },

    /// Following `implied_by` from this permission returns to it.
    #[error("implication cycle through permission '{0}'")]
    CyclicImplication(PermissionId),

    /// The permission is disabled and nothing above it is enabled, so
    /// checks against it would have nothing to fall back to.
    #[error("permission '{0}' is disabled and has no enabled ancestor")]
    NoEnabledAncestor(PermissionId),
}

impl ErrorCode for RegistryError {
    fn code(&self) -> &'static str {
        match self {
            Self::DuplicatePermission(_) => "REGISTRY_DUPLICATE_PERMISSION",
            Self::UnknownImplier { .. } => "REGISTRY_UNKNOWN_IMPLIER",
            Self::CyclicImplication(_) => "REGISTRY_CYCLIC_IMPLICATION",
            Self::NoEnabledAncestor(_) => "REGISTRY_NO_ENABLED_ANCESTOR",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// The identity lacks the permission required for an operation.
///
/// `Display` deliberately renders only `forbidden`: callers must not learn
/// which permission was missing. The fields are kept for audit logs.
///
/// # Example
///
/// ```
/// use warden_auth::{AccessDenied, permission::ADMINISTER};
/// use warden_types::ObjectPath;
///
/// let err = AccessDenied::new("alice", ADMINISTER, ObjectPath::root());
/// assert_eq!(err.to_string(), "forbidden");
/// assert_eq!(err.permission(), &ADMINISTER);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("forbidden")]
pub struct AccessDenied {
    principal: String,
    permission: PermissionId,
    object: ObjectPath,
}

impl AccessDenied {
    /// Creates a denial record.
    #[must_use]
    pub fn new(principal: impl Into<String>, permission: PermissionId, object: ObjectPath) -> Self {
        Self {
            principal: principal.into(),
            permission,
            object,
        }
    }

    /// Returns the denied principal name.
    #[must_use]
    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Returns the permission that was required (after substitution).
    #[must_use]
    pub fn permission(&self) -> &PermissionId {
        &self.permission
    }

    /// Returns the object the check ran against.
    #[must_use]
    pub fn object(&self) -> &ObjectPath {
        &self.object
    }
}

impl ErrorCode for AccessDenied {
    fn code(&self) -> &'static str {
        "AUTH_FORBIDDEN"
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// A malformed ownership tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolverError {
    /// The object was already registered.
    #[error("object '{0}' registered twice")]
    DuplicateObject(ObjectPath),

    /// The named parent has not been registered.
    #[error("object '{object}' has unknown parent '{parent}'")]
    UnknownParent {
        /// The object being registered.
        object: ObjectPath,
        /// The missing parent.
        parent: ObjectPath,
    },

    /// The root cannot be re-registered or given a parent.
    #[error("the root object is implicit and cannot be registered")]
    RootReserved,
}

impl ErrorCode for ResolverError {
    fn code(&self) -> &'static str {
        match self {
            Self::DuplicateObject(_) => "AUTH_DUPLICATE_OBJECT",
            Self::UnknownParent { .. } => "AUTH_UNKNOWN_PARENT",
            Self::RootReserved => "AUTH_ROOT_RESERVED",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::{ADMINISTER, MANAGE};
    use warden_types::assert_error_codes;

    #[test]
    fn access_denied_does_not_leak_permission() {
        let err = AccessDenied::new("bob", MANAGE, ObjectPath::new("label/foo"));
        let msg = err.to_string();
        assert_eq!(msg, "forbidden");
        assert!(!msg.contains("Manage"));
        assert_eq!(err.principal(), "bob");
        assert_eq!(err.object().as_str(), "label/foo");
        assert_eq!(err.code(), "AUTH_FORBIDDEN");
    }

    #[test]
    fn registry_error_codes() {
        assert_error_codes(
            &[
                RegistryError::DuplicatePermission(ADMINISTER),
                RegistryError::UnknownImplier {
                    permission: MANAGE,
                    implier: ADMINISTER,
                },
                RegistryError::CyclicImplication(MANAGE),
                RegistryError::NoEnabledAncestor(MANAGE),
            ],
            "REGISTRY_",
        );
    }

    #[test]
    fn registry_errors_are_fatal() {
        assert!(!RegistryError::DuplicatePermission(ADMINISTER).is_recoverable());
        assert!(RegistryError::DuplicatePermission(ADMINISTER)
            .to_string()
            .contains("overall.Administer"));
    }

    #[test]
    fn resolver_error_codes() {
        assert_error_codes(
            &[
                ResolverError::DuplicateObject(ObjectPath::new("label")),
                ResolverError::UnknownParent {
                    object: ObjectPath::new("label/x"),
                    parent: ObjectPath::new("label"),
                },
                ResolverError::RootReserved,
            ],
            "AUTH_",
        );
    }
}
