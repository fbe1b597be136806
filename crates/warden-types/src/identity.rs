//! Actor identity.
//!
//! An [`Identity`] is what upstream authentication hands the core: a
//! principal name plus group memberships. It carries no permission logic;
//! what the identity may do is decided by an ACL.
//!
//! # Pseudo-groups
//!
//! | Group | Members |
//! |-------|---------|
//! | [`EVERYONE`] | every identity, including anonymous |
//! | [`AUTHENTICATED`] | every non-anonymous identity |
//! | [`ANONYMOUS`] | the anonymous identity only |
//!
//! Pseudo-group membership is implicit and never stored in the group set,
//! so an identity cannot be constructed that escapes `everyone`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Pseudo-group every identity belongs to.
pub const EVERYONE: &str = "everyone";

/// Pseudo-group every non-anonymous identity belongs to.
pub const AUTHENTICATED: &str = "authenticated";

/// Principal name and pseudo-group of the unauthenticated identity.
pub const ANONYMOUS: &str = "anonymous";

/// The actor performing a request.
///
/// # Example
///
/// ```
/// use warden_types::{Identity, ANONYMOUS, AUTHENTICATED, EVERYONE};
///
/// let alice = Identity::user("alice").with_groups(["ops", "dev"]);
/// assert_eq!(alice.principal(), "alice");
/// assert!(alice.belongs_to("ops"));
/// assert!(alice.belongs_to(EVERYONE));
/// assert!(alice.belongs_to(AUTHENTICATED));
///
/// let anon = Identity::anonymous();
/// assert!(anon.is_anonymous());
/// assert!(anon.belongs_to(ANONYMOUS));
/// assert!(!anon.belongs_to(AUTHENTICATED));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    principal: String,
    groups: BTreeSet<String>,
    anonymous: bool,
}

impl Identity {
    /// Creates an authenticated identity with no explicit groups.
    #[must_use]
    pub fn user(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            groups: BTreeSet::new(),
            anonymous: false,
        }
    }

    /// Creates the unauthenticated identity.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            principal: ANONYMOUS.to_string(),
            groups: BTreeSet::new(),
            anonymous: true,
        }
    }

    /// Adds a group membership.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }

    /// Adds several group memberships.
    #[must_use]
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    /// Returns the principal name.
    #[must_use]
    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Returns the explicit group memberships (pseudo-groups excluded).
    #[must_use]
    pub fn groups(&self) -> &BTreeSet<String> {
        &self.groups
    }

    /// Returns `true` for the unauthenticated identity.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    /// Returns the pseudo-groups this identity implicitly belongs to.
    #[must_use]
    pub fn pseudo_groups(&self) -> &'static [&'static str] {
        if self.anonymous {
            &[EVERYONE, ANONYMOUS]
        } else {
            &[EVERYONE, AUTHENTICATED]
        }
    }

    /// Returns `true` if `group` is an explicit group or a pseudo-group of
    /// this identity.
    #[must_use]
    pub fn belongs_to(&self, group: &str) -> bool {
        self.groups.contains(group) || self.pseudo_groups().contains(&group)
    }

    /// Iterates over every group name a grant may target: explicit groups
    /// followed by pseudo-groups.
    pub fn all_groups(&self) -> impl Iterator<Item = &str> + '_ {
        self.groups
            .iter()
            .map(String::as_str)
            .chain(self.pseudo_groups().iter().copied())
    }

    /// Iterates over every name a grant may match: the principal first,
    /// then [`all_groups`](Self::all_groups).
    pub fn subjects(&self) -> impl Iterator<Item = &str> + '_ {
        std::iter::once(self.principal.as_str()).chain(self.all_groups())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.anonymous {
            f.write_str(ANONYMOUS)
        } else {
            write!(f, "user:{}", self.principal)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_belongs_to_everyone_and_authenticated() {
        let id = Identity::user("bob");
        assert!(id.belongs_to(EVERYONE));
        assert!(id.belongs_to(AUTHENTICATED));
        assert!(!id.belongs_to(ANONYMOUS));
        assert!(!id.is_anonymous());
    }

    #[test]
    fn anonymous_is_ordinary_identity_with_pseudo_groups() {
        let id = Identity::anonymous();
        assert_eq!(id.principal(), ANONYMOUS);
        assert!(id.belongs_to(EVERYONE));
        assert!(id.belongs_to(ANONYMOUS));
        assert!(!id.belongs_to(AUTHENTICATED));
    }

    #[test]
    fn groups_are_unique() {
        let id = Identity::user("carol").with_groups(["ops", "ops", "dev"]);
        assert_eq!(id.groups().len(), 2);
    }

    #[test]
    fn all_groups_includes_pseudo_groups() {
        let id = Identity::user("dave").with_group("ops");
        let groups: Vec<&str> = id.all_groups().collect();
        assert_eq!(groups, vec!["ops", EVERYONE, AUTHENTICATED]);
    }

    #[test]
    fn subjects_lead_with_principal() {
        let id = Identity::user("gina").with_group("ops");
        let subjects: Vec<&str> = id.subjects().collect();
        assert_eq!(subjects, vec!["gina", "ops", EVERYONE, AUTHENTICATED]);
    }

    #[test]
    fn display() {
        assert_eq!(Identity::user("erin").to_string(), "user:erin");
        assert_eq!(Identity::anonymous().to_string(), "anonymous");
    }

    #[test]
    fn serde_roundtrip() {
        let id = Identity::user("frank").with_group("dev");
        let json = serde_json::to_string(&id).expect("serialize");
        let back: Identity = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }
}
