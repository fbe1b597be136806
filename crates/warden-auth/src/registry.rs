//! The sealed permission catalog.
//!
//! Permissions are registered once, during single-threaded startup, through
//! a [`PermissionRegistryBuilder`]. [`build`](PermissionRegistryBuilder::build)
//! validates the forest and returns an immutable [`PermissionRegistry`]
//! that is shared as `Arc<PermissionRegistry>` and read without locking.
//!
//! # Disabled Permissions
//!
//! A permission gated behind a startup flag that is off (or one disabled by
//! default) is not grantable, and a check against it is evaluated as a check
//! against its nearest enabled ancestor:
//!
//! ```text
//! manage flag on :  check(Manage) ─► Manage
//! manage flag off:  check(Manage) ─► Administer
//! ```

use crate::error::RegistryError;
use crate::permission::{builtin_catalog, Permission};
use std::collections::{BTreeSet, HashMap, HashSet};
use warden_types::PermissionId;

/// Startup flags that switch opt-in permissions on.
///
/// # Example
///
/// ```
/// use warden_auth::FeatureFlags;
///
/// let flags = FeatureFlags::new().with("manage");
/// assert!(flags.is_on("manage"));
/// assert!(!flags.is_on("system_read"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureFlags(BTreeSet<String>);

impl FeatureFlags {
    /// Creates an empty flag set (every opt-in permission disabled).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches a flag on.
    #[must_use]
    pub fn with(mut self, flag: impl Into<String>) -> Self {
        self.0.insert(flag.into());
        self
    }

    /// Switches a flag on or off.
    pub fn set(&mut self, flag: impl Into<String>, on: bool) {
        let flag = flag.into();
        if on {
            self.0.insert(flag);
        } else {
            self.0.remove(&flag);
        }
    }

    /// Returns `true` if the flag is on.
    #[must_use]
    pub fn is_on(&self, flag: &str) -> bool {
        self.0.contains(flag)
    }

    /// Iterates over the flags that are on.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Collects permissions during startup.
#[derive(Debug, Default)]
pub struct PermissionRegistryBuilder {
    flags: FeatureFlags,
    permissions: Vec<Permission>,
    seen: HashSet<PermissionId>,
}

impl PermissionRegistryBuilder {
    /// Sets the startup flags.
    #[must_use]
    pub fn flags(mut self, flags: FeatureFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Registers a permission.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicatePermission`] if the id is taken.
    pub fn register(&mut self, permission: Permission) -> Result<&mut Self, RegistryError> {
        if !self.seen.insert(permission.id().clone()) {
            return Err(RegistryError::DuplicatePermission(permission.id().clone()));
        }
        self.permissions.push(permission);
        Ok(self)
    }

    /// Registers every permission of the built-in catalog.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicatePermission`] if any built-in id was
    /// already registered.
    pub fn register_builtins(&mut self) -> Result<&mut Self, RegistryError> {
        for permission in builtin_catalog() {
            self.register(permission)?;
        }
        Ok(self)
    }

    /// Validates the forest and seals it.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::UnknownImplier`] if an implier was never registered
    /// - [`RegistryError::CyclicImplication`] if the implication graph loops
    /// - [`RegistryError::NoEnabledAncestor`] if a disabled permission has
    ///   nothing enabled above it
    pub fn build(self) -> Result<PermissionRegistry, RegistryError> {
        let mut nodes = HashMap::with_capacity(self.permissions.len());
        let mut order = Vec::with_capacity(self.permissions.len());

        for permission in self.permissions {
            let enabled = match permission.opt_in_flag() {
                Some(flag) => self.flags.is_on(flag),
                None => permission.is_enabled_by_default(),
            };
            order.push(permission.id().clone());
            nodes.insert(permission.id().clone(), Node { permission, enabled });
        }

        for node in nodes.values() {
            if let Some(implier) = node.permission.implier() {
                if !nodes.contains_key(implier) {
                    return Err(RegistryError::UnknownImplier {
                        permission: node.permission.id().clone(),
                        implier: implier.clone(),
                    });
                }
            }
        }

        let registry = PermissionRegistry {
            nodes,
            order,
            flags: self.flags,
        };

        for id in &registry.order {
            registry.check_acyclic(id)?;
        }
        for id in &registry.order {
            if registry.effective(id).is_none() {
                return Err(RegistryError::NoEnabledAncestor(id.clone()));
            }
        }

        tracing::debug!(
            permissions = registry.order.len(),
            flags = ?registry.flags,
            "permission registry sealed"
        );
        Ok(registry)
    }
}

#[derive(Debug)]
struct Node {
    permission: Permission,
    enabled: bool,
}

/// Immutable permission catalog.
///
/// # Example
///
/// ```
/// use warden_auth::{FeatureFlags, PermissionRegistry};
/// use warden_auth::permission::{ADMINISTER, MANAGE, READ};
///
/// let on = PermissionRegistry::with_builtins(FeatureFlags::new().with("manage")).unwrap();
/// assert!(on.implies(&ADMINISTER, &READ));
/// assert!(on.implies(&MANAGE, &READ));
/// assert!(!on.implies(&MANAGE, &ADMINISTER));
/// assert_eq!(on.effective(&MANAGE), Some(MANAGE));
///
/// let off = PermissionRegistry::with_builtins(FeatureFlags::new()).unwrap();
/// assert!(!off.is_enabled(&MANAGE));
/// assert_eq!(off.effective(&MANAGE), Some(ADMINISTER));
/// ```
#[derive(Debug)]
pub struct PermissionRegistry {
    nodes: HashMap<PermissionId, Node>,
    order: Vec<PermissionId>,
    flags: FeatureFlags,
}

impl PermissionRegistry {
    /// Starts a new builder.
    #[must_use]
    pub fn builder() -> PermissionRegistryBuilder {
        PermissionRegistryBuilder::default()
    }

    /// Builds a registry holding the built-in catalog.
    ///
    /// # Errors
    ///
    /// Propagates [`RegistryError`] from validation.
    pub fn with_builtins(flags: FeatureFlags) -> Result<Self, RegistryError> {
        let mut builder = Self::builder().flags(flags);
        builder.register_builtins()?;
        builder.build()
    }

    /// Returns the permission with this id.
    #[must_use]
    pub fn get(&self, id: &PermissionId) -> Option<&Permission> {
        self.nodes.get(id).map(|n| &n.permission)
    }

    /// Returns `true` if the id is registered.
    #[must_use]
    pub fn contains(&self, id: &PermissionId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Iterates in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.order.iter().filter_map(|id| self.get(id))
    }

    /// Returns the permissions of one group, in registration order.
    #[must_use]
    pub fn group(&self, group: &str) -> Vec<&Permission> {
        self.iter().filter(|p| p.id().group() == group).collect()
    }

    /// Returns the number of registered permissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns the startup flags the registry was sealed with.
    #[must_use]
    pub fn flags(&self) -> &FeatureFlags {
        &self.flags
    }

    /// Returns `false` for unknown permissions and for permissions that are
    /// switched off.
    #[must_use]
    pub fn is_enabled(&self, id: &PermissionId) -> bool {
        self.nodes.get(id).is_some_and(|n| n.enabled)
    }

    /// Returns the implication chain starting at `id` (inclusive), walking
    /// towards the root. Empty for unknown ids.
    #[must_use]
    pub fn chain(&self, id: &PermissionId) -> Vec<&PermissionId> {
        let mut chain = Vec::new();
        let mut cursor = self.nodes.get(id);
        while let Some(node) = cursor {
            if chain.len() > self.nodes.len() {
                break;
            }
            chain.push(node.permission.id());
            cursor = node.permission.implier().and_then(|p| self.nodes.get(p));
        }
        chain
    }

    /// Returns the nearest enabled permission on the chain from `id`
    /// upward, `id` itself included. `None` if `id` is unknown.
    #[must_use]
    pub fn effective(&self, id: &PermissionId) -> Option<PermissionId> {
        self.chain(id)
            .into_iter()
            .find(|p| self.is_enabled(p))
            .cloned()
    }

    /// Returns `true` if holding `held` guarantees holding `required`:
    /// either they are equal, or `held` sits on `required`'s chain.
    #[must_use]
    pub fn implies(&self, held: &PermissionId, required: &PermissionId) -> bool {
        held == required || self.chain(required).into_iter().any(|p| p == held)
    }

    fn check_acyclic(&self, start: &PermissionId) -> Result<(), RegistryError> {
        let mut visited = HashSet::new();
        let mut cursor = Some(start);
        while let Some(id) = cursor {
            if !visited.insert(id) {
                return Err(RegistryError::CyclicImplication(start.clone()));
            }
            cursor = self.nodes.get(id).and_then(|n| n.permission.implier());
        }
        Ok(())
    }
}
