//! Plugin dependency graph and lifecycle for Warden.
//!
//! # Crate Architecture
//!
//! ```text
//! warden-types / warden-auth
//!      ↑
//! warden-plugin  ◄── THIS CRATE
//!   ├── PluginDescriptor        static metadata, outgoing edges
//!   ├── PluginDependencyGraph   closures over mandatory edges, live flags
//!   └── PluginLifecycleManager  Administer-gated enable/disable
//! ```
//!
//! A plugin may be disabled only when no enabled plugin depends on it
//! (transitively, through mandatory edges), and enabled only when every
//! plugin it depends on is enabled. Operations never cascade.

pub mod descriptor;
mod error;
pub mod graph;
pub mod manager;

pub use descriptor::{PluginDependency, PluginDescriptor};
pub use error::PluginError;
pub use graph::PluginDependencyGraph;
pub use manager::{LifecycleOutcome, PluginLifecycleManager};
