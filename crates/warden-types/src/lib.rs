//! Core types for Warden.
//!
//! This crate holds the leaf types every other Warden crate speaks in:
//! who is acting, what is being acted on, and how far a grant reaches.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  warden-types   : Identity, ids, Scope, ErrorCode  ◄── HERE  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  warden-auth    : Permission registry, grants, ACL           │
//! │  warden-plugin  : dependency graph, lifecycle manager        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  warden-runtime : config, instance, command dispatcher       │
//! │  warden-cli     : `warden` binary                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Identifier Design
//!
//! Permissions, plugins and securable objects are addressed by value
//! (string-backed ids), never by live reference. Graph algorithms in the
//! upper layers key their arenas on these ids.
//!
//! # Example
//!
//! ```
//! use warden_types::{Identity, ObjectPath, PermissionId, Scope};
//!
//! let alice = Identity::user("alice").with_group("ops");
//! assert!(alice.belongs_to("everyone"));
//!
//! let manage = PermissionId::new("overall", "Manage");
//! assert_eq!(manage.to_string(), "overall.Manage");
//!
//! let label = ObjectPath::new("label/foo");
//! assert!(Scope::Global.covers(&label));
//! ```

mod error;
mod id;
mod identity;
mod scope;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{ObjectPath, ParseIdError, PermissionId, PluginId, RequestId};
pub use identity::{Identity, ANONYMOUS, AUTHENTICATED, EVERYONE};
pub use scope::Scope;
