//! Grant rules and the copy-on-write rule store.
//!
//! A [`GrantRule`] hands a set of permissions to a [`Subject`] over a
//! [`Scope`]. Rules are purely additive: there is no deny rule, and a
//! missing grant means deny.
//!
//! # Storage
//!
//! ```text
//! GrantRules
//!   └── RwLock<Arc<[GrantRule]>>
//!         ├── snapshot(): clone the Arc under a read lock (readers)
//!         └── grant/revoke/replace: build a new slice, swap under write lock
//! ```
//!
//! A reader holding a snapshot never observes a partially applied update.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use warden_types::{Identity, ObjectPath, PermissionId, Scope};

/// Who a grant rule applies to.
///
/// | Variant | Matches |
/// |---------|---------|
/// | `User` | the principal only |
/// | `Group` | an explicit group or pseudo-group only |
/// | `Name` | either the principal or a group |
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Subject {
    /// A principal.
    User(String),
    /// A group or pseudo-group.
    Group(String),
    /// A principal or group with that name.
    Name(String),
}

impl Subject {
    /// Creates a [`Subject::User`].
    #[must_use]
    pub fn user(name: impl Into<String>) -> Self {
        Self::User(name.into())
    }

    /// Creates a [`Subject::Group`].
    #[must_use]
    pub fn group(name: impl Into<String>) -> Self {
        Self::Group(name.into())
    }

    /// Creates a [`Subject::Name`].
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Returns `true` if this subject designates `identity`.
    #[must_use]
    pub fn matches(&self, identity: &Identity) -> bool {
        match self {
            Self::User(name) => identity.principal() == name,
            Self::Group(name) => identity.belongs_to(name),
            Self::Name(name) => identity.principal() == name || identity.belongs_to(name),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(n) => write!(f, "user:{n}"),
            Self::Group(n) => write!(f, "group:{n}"),
            Self::Name(n) => f.write_str(n),
        }
    }
}

/// One additive grant.
///
/// # Example
///
/// ```
/// use warden_auth::{GrantRule, Subject};
/// use warden_auth::permission::{MANAGE, READ};
/// use warden_types::{Identity, ObjectPath, Scope};
///
/// let rule = GrantRule::new(Subject::user("alice"), [READ, MANAGE], Scope::Global);
/// assert!(rule.applies_to(&Identity::user("alice"), &ObjectPath::root()));
/// assert!(!rule.applies_to(&Identity::user("bob"), &ObjectPath::root()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRule {
    subject: Subject,
    permissions: BTreeSet<PermissionId>,
    scope: Scope,
}

impl GrantRule {
    /// Creates a rule.
    #[must_use]
    pub fn new(
        subject: Subject,
        permissions: impl IntoIterator<Item = PermissionId>,
        scope: Scope,
    ) -> Self {
        Self {
            subject,
            permissions: permissions.into_iter().collect(),
            scope,
        }
    }

    /// Returns the subject.
    #[must_use]
    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// Returns the granted permissions.
    #[must_use]
    pub fn permissions(&self) -> &BTreeSet<PermissionId> {
        &self.permissions
    }

    /// Returns the scope.
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Returns `true` if the subject matches and the scope covers `object`.
    #[must_use]
    pub fn applies_to(&self, identity: &Identity, object: &ObjectPath) -> bool {
        self.subject.matches(identity) && self.scope.covers(object)
    }
}

/// Copy-on-write rule list shared by a strategy and the ACLs it hands out.
///
/// # Example
///
/// ```
/// use warden_auth::{GrantRules, Subject};
/// use warden_auth::permission::MANAGE;
/// use warden_types::Scope;
///
/// let rules = GrantRules::new();
/// let before = rules.snapshot();
///
/// rules.grant(Subject::user("alice"), [MANAGE], Scope::Global);
/// assert_eq!(rules.snapshot().len(), 1);
/// assert!(before.is_empty()); // old snapshot unchanged
///
/// rules.revoke(&Subject::user("alice"), &MANAGE, &Scope::Global);
/// assert!(rules.snapshot().is_empty());
/// ```
#[derive(Debug)]
pub struct GrantRules {
    rules: RwLock<Arc<[GrantRule]>>,
}

impl Default for GrantRules {
    fn default() -> Self {
        Self::new()
    }
}

impl GrantRules {
    /// Creates an empty rule list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(Arc::from(Vec::new())),
        }
    }

    /// Creates a rule list holding `rules`.
    #[must_use]
    pub fn from_rules(rules: impl IntoIterator<Item = GrantRule>) -> Self {
        let rules: Vec<GrantRule> = rules.into_iter().collect();
        Self {
            rules: RwLock::new(Arc::from(rules)),
        }
    }

    /// Returns an immutable snapshot of the current rules.
    #[must_use]
    pub fn snapshot(&self) -> Arc<[GrantRule]> {
        Arc::clone(&self.rules.read())
    }

    /// Adds a rule.
    ///
    /// Permissions are merged into an existing rule with the same subject
    /// and scope, so grant followed by revoke leaves the list as it was.
    pub fn grant(
        &self,
        subject: Subject,
        permissions: impl IntoIterator<Item = PermissionId>,
        scope: Scope,
    ) {
        let added: BTreeSet<PermissionId> = permissions.into_iter().collect();
        if added.is_empty() {
            return;
        }
        let mut guard = self.rules.write();
        let mut next: Vec<GrantRule> = guard.to_vec();
        match next
            .iter_mut()
            .find(|r| r.subject == subject && r.scope == scope)
        {
            Some(rule) => rule.permissions.extend(added),
            None => next.push(GrantRule {
                subject,
                permissions: added,
                scope,
            }),
        }
        *guard = Arc::from(next);
    }

    /// Removes `permission` from every rule with this subject and scope.
    /// Rules left empty are dropped.
    ///
    /// Returns `true` if anything was removed.
    pub fn revoke(&self, subject: &Subject, permission: &PermissionId, scope: &Scope) -> bool {
        let mut guard = self.rules.write();
        let mut removed = false;
        let next: Vec<GrantRule> = guard
            .iter()
            .cloned()
            .filter_map(|mut rule| {
                if &rule.subject == subject && &rule.scope == scope {
                    removed |= rule.permissions.remove(permission);
                    if rule.permissions.is_empty() {
                        return None;
                    }
                }
                Some(rule)
            })
            .collect();
        if removed {
            *guard = Arc::from(next);
        }
        removed
    }

    /// Replaces the whole rule list.
    pub fn replace(&self, rules: impl IntoIterator<Item = GrantRule>) {
        let next: Vec<GrantRule> = rules.into_iter().collect();
        *self.rules.write() = Arc::from(next);
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    /// Returns `true` if there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::{ADMINISTER, MANAGE, READ};
    use warden_types::EVERYONE;

    #[test]
    fn subject_matching() {
        let alice = Identity::user("alice").with_group("ops");
        assert!(Subject::user("alice").matches(&alice));
        assert!(!Subject::group("alice").matches(&alice));
        assert!(Subject::group("ops").matches(&alice));
        assert!(!Subject::user("ops").matches(&alice));
        assert!(Subject::name("alice").matches(&alice));
        assert!(Subject::name("ops").matches(&alice));
        assert!(Subject::group(EVERYONE).matches(&alice));
        assert!(Subject::group(EVERYONE).matches(&Identity::anonymous()));
    }

    #[test]
    fn unknown_subject_silently_non_matching() {
        let rule = GrantRule::new(Subject::user("ghost"), [READ], Scope::Global);
        assert!(!rule.applies_to(&Identity::user("alice"), &ObjectPath::root()));
    }

    #[test]
    fn grant_merges_same_subject_and_scope() {
        let rules = GrantRules::new();
        rules.grant(Subject::user("a"), [READ], Scope::Global);
        rules.grant(Subject::user("a"), [MANAGE], Scope::Global);
        let snap = rules.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].permissions().len(), 2);
    }

    #[test]
    fn grant_distinct_scope_adds_rule() {
        let rules = GrantRules::new();
        rules.grant(Subject::user("a"), [READ], Scope::Global);
        rules.grant(Subject::user("a"), [READ], Scope::object("label/x"));
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn empty_grant_is_noop() {
        let rules = GrantRules::new();
        rules.grant(Subject::user("a"), [], Scope::Global);
        assert!(rules.is_empty());
    }

    #[test]
    fn grant_then_revoke_restores() {
        let rules = GrantRules::from_rules([GrantRule::new(
            Subject::user("a"),
            [READ],
            Scope::Global,
        )]);
        let before = rules.snapshot().to_vec();
        rules.grant(Subject::user("a"), [ADMINISTER], Scope::Global);
        assert!(rules.revoke(&Subject::user("a"), &ADMINISTER, &Scope::Global));
        assert_eq!(rules.snapshot().to_vec(), before);
    }

    #[test]
    fn revoke_missing_returns_false() {
        let rules = GrantRules::new();
        assert!(!rules.revoke(&Subject::user("a"), &READ, &Scope::Global));
    }

    #[test]
    fn snapshot_is_isolated_from_later_writes() {
        let rules = GrantRules::new();
        rules.grant(Subject::user("a"), [READ], Scope::Global);
        let snap = rules.snapshot();
        rules.replace([]);
        assert_eq!(snap.len(), 1);
        assert!(rules.is_empty());
    }

    #[test]
    fn subject_serde_shape() {
        let json = serde_json::to_string(&Subject::group("ops")).expect("serialize");
        assert_eq!(json, r#"{"kind":"group","name":"ops"}"#);
    }

    #[test]
    fn thread_safety() {
        use std::thread;

        let rules = Arc::new(GrantRules::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let rules = Arc::clone(&rules);
                thread::spawn(move || {
                    rules.grant(Subject::user(format!("u{i}")), [READ], Scope::Global);
                    let _ = rules.snapshot();
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
        assert_eq!(rules.len(), 8);
    }
}
