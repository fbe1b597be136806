//! Runtime error types.
//!
//! [`RuntimeError`] collects everything that can abort startup.
//! [`DispatchError`] covers request-level failures that the dispatcher maps
//! onto a status code or exit code.

use crate::config::ConfigError;
use std::collections::BTreeSet;
use thiserror::Error;
use warden_auth::{AccessDenied, RegistryError, ResolverError};
use warden_plugin::PluginError;
use warden_types::{ErrorCode, PluginId};

/// Startup failure.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration could not be loaded or validated.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The permission catalog is invalid.
    #[error("permission registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The ownership tree is invalid.
    #[error("object tree error: {0}")]
    Resolver(#[from] ResolverError),

    /// The plugin set is invalid.
    #[error("plugin error: {0}")]
    Plugin(#[from] PluginError),
}

impl ErrorCode for RuntimeError {
    fn code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.code(),
            Self::Registry(e) => e.code(),
            Self::Resolver(e) => e.code(),
            Self::Plugin(e) => e.code(),
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// A request that could not be served.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The caller lacks the required permission.
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),

    /// No route or object with this name.
    #[error("not found: {0}")]
    NotFound(String),

    /// The route exists but not for this method.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// Unknown remote command.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Bad arguments.
    #[error("usage: {0}")]
    Usage(String),

    /// A submitted field value failed validation. Nothing was applied.
    #[error("invalid value for '{field}': {message}")]
    Invalid { field: String, message: String },

    /// Disable refused: enabled plugins still depend on the target.
    #[error("cannot disable '{plugin}': required by enabled plugins: {}", join(.dependents))]
    Blocked {
        plugin: PluginId,
        dependents: BTreeSet<PluginId>,
    },

    /// Enable refused: mandatory dependencies are disabled.
    #[error("cannot enable '{plugin}': requires disabled plugins: {}", join(.dependencies))]
    Unsatisfied {
        plugin: PluginId,
        dependencies: BTreeSet<PluginId>,
    },

    /// A plugin operation failed.
    #[error(transparent)]
    Plugin(#[from] PluginError),
}

fn join(ids: &BTreeSet<PluginId>) -> String {
    ids.iter()
        .map(PluginId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl DispatchError {
    /// Creates a validation error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ErrorCode for DispatchError {
    fn code(&self) -> &'static str {
        match self {
            Self::Forbidden(_) => "DISPATCH_FORBIDDEN",
            Self::NotFound(_) => "DISPATCH_NOT_FOUND",
            Self::MethodNotAllowed => "DISPATCH_METHOD_NOT_ALLOWED",
            Self::UnknownCommand(_) => "DISPATCH_UNKNOWN_COMMAND",
            Self::Usage(_) => "DISPATCH_USAGE",
            Self::Invalid { .. } => "DISPATCH_INVALID_VALUE",
            Self::Blocked { .. } => "DISPATCH_BLOCKED_BY_DEPENDENTS",
            Self::Unsatisfied { .. } => "DISPATCH_BLOCKED_BY_DEPENDENCIES",
            Self::Plugin(_) => "DISPATCH_PLUGIN",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Usage(_) | Self::Invalid { .. })
    }
}
