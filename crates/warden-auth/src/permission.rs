//! Permission nodes and the built-in catalog.
//!
//! A [`Permission`] is a named capability. Each permission has at most one
//! direct implier (`implied_by`); holding the implier means holding the
//! permission. Implication is transitive, so the catalog forms a forest
//! rooted at [`ADMINISTER`].
//!
//! # Built-in Catalog
//!
//! ```text
//! overall.Administer
//!   ├── overall.Manage            (opt-in: "manage")
//!   │     └── overall.Read
//!   ├── overall.SystemRead        (opt-in: "system_read")
//!   ├── agent.Configure
//!   │     └── agent.Connect
//!   └── job.Configure
//!         └── job.Build
//!               └── job.Read
//! ```

use serde::{Deserialize, Serialize};
use warden_types::PermissionId;

/// Full control of the instance.
pub const ADMINISTER: PermissionId = PermissionId::from_static("overall", "Administer");

/// Configure the instance without being able to alter code execution.
pub const MANAGE: PermissionId = PermissionId::from_static("overall", "Manage");

/// See the instance at all.
pub const READ: PermissionId = PermissionId::from_static("overall", "Read");

/// Read-only view of system configuration.
pub const SYSTEM_READ: PermissionId = PermissionId::from_static("overall", "SystemRead");

/// Reconfigure an agent (executor count, labels, launch method).
pub const AGENT_CONFIGURE: PermissionId = PermissionId::from_static("agent", "Configure");

/// Connect or reconnect an agent.
pub const AGENT_CONNECT: PermissionId = PermissionId::from_static("agent", "Connect");

/// Change a job definition.
pub const JOB_CONFIGURE: PermissionId = PermissionId::from_static("job", "Configure");

/// Trigger a job.
pub const JOB_BUILD: PermissionId = PermissionId::from_static("job", "Build");

/// See a job.
pub const JOB_READ: PermissionId = PermissionId::from_static("job", "Read");

/// Startup flag that enables [`MANAGE`].
pub const MANAGE_FLAG: &str = "manage";

/// Startup flag that enables [`SYSTEM_READ`].
pub const SYSTEM_READ_FLAG: &str = "system_read";

/// A node in the permission forest.
///
/// # Example
///
/// ```
/// use warden_auth::permission::{Permission, ADMINISTER};
/// use warden_types::PermissionId;
///
/// let p = Permission::new(PermissionId::new("label", "Configure"), "Configure labels")
///     .implied_by(ADMINISTER)
///     .opt_in("label_tier");
///
/// assert_eq!(p.implier(), Some(&ADMINISTER));
/// assert_eq!(p.opt_in_flag(), Some("label_tier"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    id: PermissionId,
    description: String,
    implied_by: Option<PermissionId>,
    enabled_by_default: bool,
    opt_in_flag: Option<String>,
}

impl Permission {
    /// Creates an enabled root permission with no implier.
    #[must_use]
    pub fn new(id: PermissionId, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            implied_by: None,
            enabled_by_default: true,
            opt_in_flag: None,
        }
    }

    /// Sets the direct implier.
    #[must_use]
    pub fn implied_by(mut self, implier: PermissionId) -> Self {
        self.implied_by = Some(implier);
        self
    }

    /// Marks the permission as requiring a startup flag.
    #[must_use]
    pub fn opt_in(mut self, flag: impl Into<String>) -> Self {
        self.opt_in_flag = Some(flag.into());
        self
    }

    /// Marks the permission as disabled unless otherwise enabled.
    #[must_use]
    pub fn disabled_by_default(mut self) -> Self {
        self.enabled_by_default = false;
        self
    }

    /// Returns the permission id.
    #[must_use]
    pub fn id(&self) -> &PermissionId {
        &self.id
    }

    /// Returns the human label.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the direct implier, if any.
    #[must_use]
    pub fn implier(&self) -> Option<&PermissionId> {
        self.implied_by.as_ref()
    }

    /// Returns whether the permission is on when no flag governs it.
    #[must_use]
    pub fn is_enabled_by_default(&self) -> bool {
        self.enabled_by_default
    }

    /// Returns the startup flag this permission requires, if any.
    #[must_use]
    pub fn opt_in_flag(&self) -> Option<&str> {
        self.opt_in_flag.as_deref()
    }
}

/// Returns the built-in catalog in registration order (impliers first).
#[must_use]
pub fn builtin_catalog() -> Vec<Permission> {
    vec![
        Permission::new(ADMINISTER, "Full control of the instance"),
        Permission::new(MANAGE, "Configure the instance short of code execution")
            .implied_by(ADMINISTER)
            .opt_in(MANAGE_FLAG),
        Permission::new(READ, "View the instance").implied_by(MANAGE),
        Permission::new(SYSTEM_READ, "Read-only view of system configuration")
            .implied_by(ADMINISTER)
            .opt_in(SYSTEM_READ_FLAG),
        Permission::new(AGENT_CONFIGURE, "Reconfigure agents").implied_by(ADMINISTER),
        Permission::new(AGENT_CONNECT, "Connect agents").implied_by(AGENT_CONFIGURE),
        Permission::new(JOB_CONFIGURE, "Change job definitions").implied_by(ADMINISTER),
        Permission::new(JOB_BUILD, "Trigger jobs").implied_by(JOB_CONFIGURE),
        Permission::new(JOB_READ, "View jobs").implied_by(JOB_BUILD),
    ]
}
