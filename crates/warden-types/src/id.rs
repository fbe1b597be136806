//! Identifier types for Warden.
//!
//! Permissions, plugins and securable objects are addressed by id rather
//! than by reference, so that the implication forest, the plugin graph and
//! the ownership chain can all be plain arenas.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Error returned when parsing an identifier from text fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} id: '{input}'")]
pub struct ParseIdError {
    kind: &'static str,
    input: String,
}

/// Identifier of a permission node: a group plus a short name.
///
/// Printed and parsed as `group.Name`. The group may itself contain dots;
/// the short name is everything after the last one.
///
/// # Example
///
/// ```
/// use warden_types::PermissionId;
///
/// let id: PermissionId = "overall.Manage".parse().unwrap();
/// assert_eq!(id.group(), "overall");
/// assert_eq!(id.name(), "Manage");
///
/// let nested: PermissionId = "hudson.model.Hudson.Administer".parse().unwrap();
/// assert_eq!(nested.group(), "hudson.model.Hudson");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionId {
    group: Cow<'static, str>,
    name: Cow<'static, str>,
}

impl PermissionId {
    /// Creates a permission id from its two halves.
    #[must_use]
    pub fn new(group: impl Into<Cow<'static, str>>, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    /// Creates a permission id usable in `const` position.
    #[must_use]
    pub const fn from_static(group: &'static str, name: &'static str) -> Self {
        Self {
            group: Cow::Borrowed(group),
            name: Cow::Borrowed(name),
        }
    }

    /// Returns the permission group.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Returns the short name within the group.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for PermissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.name)
    }
}

impl FromStr for PermissionId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseIdError {
            kind: "permission",
            input: s.to_string(),
        };
        let (group, name) = s.rsplit_once('.').ok_or_else(invalid)?;
        if group.is_empty() || name.is_empty() || name.contains(char::is_whitespace) {
            return Err(invalid());
        }
        Ok(Self::new(group.to_string(), name.to_string()))
    }
}

impl TryFrom<String> for PermissionId {
    type Error = ParseIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PermissionId> for String {
    fn from(id: PermissionId) -> Self {
        id.to_string()
    }
}

/// Identifier of an installed plugin (its short name, e.g. `git-client`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(String);

impl PluginId {
    /// Creates a plugin id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PluginId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PluginId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Path of a securable object in the ownership tree.
///
/// The root instance is `/`. Every other object is a slash-separated path
/// relative to it (`label/foo`, `computer/agent-1`). Leading, trailing and
/// repeated slashes are normalised away on construction.
///
/// # Example
///
/// ```
/// use warden_types::ObjectPath;
///
/// let label = ObjectPath::new("/label/foo/");
/// assert_eq!(label.as_str(), "label/foo");
/// assert_eq!(label.parent(), Some(ObjectPath::new("label")));
/// assert!(label.is_within(&ObjectPath::new("label")));
/// assert!(label.is_within(&ObjectPath::root()));
/// assert!(!ObjectPath::new("labels").is_within(&ObjectPath::new("label")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ObjectPath(String);

impl ObjectPath {
    /// Creates a normalised path. Empty input yields the root.
    #[must_use]
    pub fn new(path: impl AsRef<str>) -> Self {
        let joined = path
            .as_ref()
            .split('/')
            .filter(|seg| !seg.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        if joined.is_empty() {
            Self::root()
        } else {
            Self(joined)
        }
    }

    /// Returns the root object path (`/`).
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Returns `true` for the root instance.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a child path (`self/segment`).
    #[must_use]
    pub fn child(&self, segment: &str) -> Self {
        if self.is_root() {
            Self::new(segment)
        } else {
            Self::new(format!("{}/{segment}", self.0))
        }
    }

    /// Returns the lexical parent. The root has none; top-level paths have
    /// the root as parent.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rsplit_once('/') {
            Some((head, _)) => Some(Self(head.to_string())),
            None => Some(Self::root()),
        }
    }

    /// Returns `true` if `self` equals `ancestor` or lies beneath it,
    /// compared segment-wise.
    #[must_use]
    pub fn is_within(&self, ancestor: &Self) -> bool {
        if ancestor.is_root() || self == ancestor {
            return true;
        }
        self.0
            .strip_prefix(ancestor.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ObjectPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ObjectPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<ObjectPath> for String {
    fn from(path: ObjectPath) -> Self {
        path.0
    }
}

/// Correlates a dispatcher request with its audit log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a fresh random request id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_id_parse_and_display() {
        let id: PermissionId = "overall.Administer".parse().expect("valid id");
        assert_eq!(id, PermissionId::new("overall", "Administer"));
        assert_eq!(id.to_string(), "overall.Administer");
    }

    #[test]
    fn permission_id_rejects_malformed() {
        assert!("Administer".parse::<PermissionId>().is_err());
        assert!(".Administer".parse::<PermissionId>().is_err());
        assert!("overall.".parse::<PermissionId>().is_err());
        assert!("overall.Bad Name".parse::<PermissionId>().is_err());
    }

    #[test]
    fn parse_error_is_a_std_error() {
        let err = "Administer".parse::<PermissionId>().expect_err("no group");
        assert_eq!(err.to_string(), "invalid permission id: 'Administer'");
        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(err.clone());
        assert_eq!(boxed.to_string(), err.to_string());
    }

    #[test]
    fn permission_id_serde_as_string() {
        let id = PermissionId::new("agent", "Configure");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"agent.Configure\"");
        let back: PermissionId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
        assert!(serde_json::from_str::<PermissionId>("\"nodot\"").is_err());
    }

    #[test]
    fn object_path_normalises() {
        assert_eq!(ObjectPath::new("").as_str(), "/");
        assert_eq!(ObjectPath::new("///").as_str(), "/");
        assert_eq!(ObjectPath::new("//label//foo/").as_str(), "label/foo");
        assert!(ObjectPath::new("/").is_root());
    }

    #[test]
    fn object_path_parent_chain() {
        let p = ObjectPath::new("computer/agent-1/log");
        let parents: Vec<String> = std::iter::successors(p.parent(), ObjectPath::parent)
            .map(|p| p.to_string())
            .collect();
        assert_eq!(parents, vec!["computer/agent-1", "computer", "/"]);
    }

    #[test]
    fn object_path_child() {
        assert_eq!(ObjectPath::root().child("label").as_str(), "label");
        assert_eq!(ObjectPath::new("label").child("foo").as_str(), "label/foo");
    }

    #[test]
    fn object_path_within_is_segment_wise() {
        let foo = ObjectPath::new("label/foo");
        assert!(foo.is_within(&foo));
        assert!(ObjectPath::new("label/foo/bar").is_within(&foo));
        assert!(!ObjectPath::new("label/foobar").is_within(&foo));
        assert!(!ObjectPath::root().is_within(&foo));
    }

    #[test]
    fn request_id_unique_and_prefixed() {
        let a = RequestId::new();
        let b = RequestId::new();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("req:"));
    }
}
