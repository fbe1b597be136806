//! Plugin error types.

use thiserror::Error;
use warden_types::{ErrorCode, PluginId};

/// Errors from loading the plugin graph or addressing a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    /// No installed plugin has this id.
    #[error("plugin not found: {0}")]
    NotFound(PluginId),

    /// Two descriptors share an id.
    #[error("plugin installed twice: {0}")]
    Duplicate(PluginId),

    /// A plugin lists itself as a dependency.
    #[error("plugin depends on itself: {0}")]
    SelfDependency(PluginId),

    /// A mandatory dependency is not installed.
    #[error("plugin '{plugin}' requires '{dependency}', which is not installed")]
    MissingDependency {
        /// The dependent plugin.
        plugin: PluginId,
        /// The missing plugin.
        dependency: PluginId,
    },

    /// A plugin starts enabled while one of its mandatory dependencies
    /// starts disabled.
    #[error("plugin '{plugin}' is enabled but its dependency '{dependency}' is disabled")]
    DisabledDependency {
        /// The enabled dependent.
        plugin: PluginId,
        /// The disabled dependency.
        dependency: PluginId,
    },
}

impl ErrorCode for PluginError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "PLUGIN_NOT_FOUND",
            Self::Duplicate(_) => "PLUGIN_DUPLICATE",
            Self::SelfDependency(_) => "PLUGIN_SELF_DEPENDENCY",
            Self::MissingDependency { .. } => "PLUGIN_MISSING_DEPENDENCY",
            Self::DisabledDependency { .. } => "PLUGIN_DISABLED_DEPENDENCY",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
