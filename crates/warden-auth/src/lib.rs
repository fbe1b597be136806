//! Authorization core for Warden.
//!
//! This crate decides whether an identity may perform an operation on an
//! object. It knows nothing about requests, forms or plugins.
//!
//! # Decision Pipeline
//!
//! ```text
//! PermissionRegistry (sealed at startup, Arc-shared)
//!          │
//! AuthorizationStrategy ──acl_for(object)──► Acl
//!          │                                  │
//! AclResolver (ownership tree, overrides) ────┘ has_permission / check
//! ```
//!
//! | Type | Role |
//! |------|------|
//! | [`Permission`](permission::Permission) | node of the implication forest |
//! | [`PermissionRegistry`] | validated catalog, implication and flag queries |
//! | [`GrantRule`] / [`GrantRules`] | additive grants, copy-on-write storage |
//! | [`AuthorizationStrategy`] | maps an object to an [`Acl`] |
//! | [`AclResolver`] | chains per-object overrides up to the root strategy |
//!
//! # Crate Architecture
//!
//! ```text
//! warden-types   (Identity, PermissionId, ObjectPath, Scope)
//!      ↑
//! warden-auth    ◄── THIS CRATE
//!      ↑
//! warden-plugin  (lifecycle gated on Administer)
//!      ↑
//! warden-runtime (dispatcher gates every request)
//! ```
//!
//! # Design Principles
//!
//! - **Grants are additive**: there is no deny rule; a missing grant denies
//! - **Disabled means absent**: a switched-off permission cannot be granted,
//!   and a check against it runs against its nearest enabled ancestor
//! - **Decisions are pure**: an [`Acl`] is a snapshot and never mutates

pub mod acl;
mod error;
pub mod grant;
pub mod permission;
pub mod registry;
pub mod resolver;
pub mod strategy;
pub mod testing;

pub use acl::{Acl, ScopeMode};
pub use error::{AccessDenied, RegistryError, ResolverError};
pub use grant::{GrantRule, GrantRules, Subject};
pub use registry::{FeatureFlags, PermissionRegistry, PermissionRegistryBuilder};
pub use resolver::AclResolver;
pub use strategy::{
    AuthorizationStrategy, GlobalMatrixStrategy, LoggedInFullControlStrategy,
    ProjectMatrixStrategy, UnsecuredStrategy,
};

pub use warden_types::{Identity, ObjectPath, PermissionId, Scope};
