//! Scope of a grant rule.

use crate::ObjectPath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The set of securable objects a grant rule applies to.
///
/// # Scope Hierarchy
///
/// ```text
/// Global
///   └── Object(path)       path itself and every descendant
/// ```
///
/// An object scope naming a path that does not exist is not an error: it
/// simply covers nothing until such an object is created.
///
/// # Example
///
/// ```
/// use warden_types::{ObjectPath, Scope};
///
/// let label_scope = Scope::object("label/foo");
/// assert!(label_scope.covers(&ObjectPath::new("label/foo")));
/// assert!(!label_scope.covers(&ObjectPath::new("label/bar")));
/// assert!(!label_scope.covers(&ObjectPath::root()));
/// assert!(Scope::Global.covers(&ObjectPath::root()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Applies everywhere.
    Global,
    /// Applies to one object and everything it owns.
    Object(ObjectPath),
}

impl Scope {
    /// Creates an object scope.
    #[must_use]
    pub fn object(path: impl Into<ObjectPath>) -> Self {
        let path = path.into();
        if path.is_root() {
            Self::Global
        } else {
            Self::Object(path)
        }
    }

    /// Returns `true` if this is the global scope.
    #[must_use]
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }

    /// Returns `true` if a rule with this scope applies to `object`.
    #[must_use]
    pub fn covers(&self, object: &ObjectPath) -> bool {
        match self {
            Self::Global => true,
            Self::Object(root) => object.is_within(root),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("scope:global"),
            Self::Object(path) => write!(f, "scope:{path}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_object_scope_is_global() {
        assert_eq!(Scope::object("/"), Scope::Global);
        assert!(Scope::object("").is_global());
    }

    #[test]
    fn object_scope_covers_descendants() {
        let scope = Scope::object("computer/agent-1");
        assert!(scope.covers(&ObjectPath::new("computer/agent-1")));
        assert!(scope.covers(&ObjectPath::new("computer/agent-1/log")));
        assert!(!scope.covers(&ObjectPath::new("computer/agent-10")));
        assert!(!scope.covers(&ObjectPath::new("computer")));
    }

    #[test]
    fn display() {
        assert_eq!(Scope::Global.to_string(), "scope:global");
        assert_eq!(Scope::object("label/x").to_string(), "scope:label/x");
    }

    #[test]
    fn serde_shape() {
        let json = serde_json::to_string(&Scope::object("label/x")).expect("serialize");
        assert_eq!(json, r#"{"object":"label/x"}"#);
        let global: Scope = serde_json::from_str(r#""global""#).expect("deserialize");
        assert!(global.is_global());
    }
}
