//! Configuration management with hierarchical layering.
//!
//! # Architecture
//!
//! ```text
//! Priority (highest to lowest):
//!
//! ┌──────────────────────────────────────────┐
//! │  1. Environment Variables (WARDEN_*)     │  Runtime override
//! ├──────────────────────────────────────────┤
//! │  2. Explicit file (--config <path>)      │  Deployment-specific
//! ├──────────────────────────────────────────┤
//! │  3. Global Config (~/.warden/config.toml)│  Host defaults
//! ├──────────────────────────────────────────┤
//! │  4. Default Values (compile-time)        │  Fallback
//! └──────────────────────────────────────────┘
//! ```
//!
//! Configuration is read-only: the core never writes it back to disk.
//!
//! # Environment Variables
//!
//! | Variable | Config Field | Type |
//! |----------|--------------|------|
//! | `WARDEN_PERMISSION_MANAGE_ENABLED` | `permissions.manage_enabled` | bool |
//! | `WARDEN_PERMISSION_SYSTEM_READ_ENABLED` | `permissions.system_read_enabled` | bool |
//! | `WARDEN_ANONYMOUS_READ` | `security.anonymous_read` | bool |
//! | `WARDEN_SECURITY_STRATEGY` | `security.strategy` | String |
//! | `WARDEN_LOG_LEVEL` | `logging.level` | String |
//!
//! # Example Configuration
//!
//! ```toml
//! [permissions]
//! manage_enabled = true
//!
//! [security]
//! strategy = "project_matrix"
//!
//! [[security.grants]]
//! subject = "admin"
//! permissions = ["overall.Administer"]
//!
//! [[security.grants]]
//! subject = "alice"
//! permissions = ["overall.Read", "overall.Manage"]
//!
//! [[plugins.installed]]
//! id = "git"
//! version = "5.2.0"
//!
//! [[plugins.installed.dependencies]]
//! target = "scm-api"
//!
//! [[plugins.installed]]
//! id = "scm-api"
//! version = "2.6.0"
//!
//! [labels.linux]
//! description = "Linux builders"
//!
//! [remote.exit_codes]
//! denied = 6
//! ```

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use types::{
    DependencyConfig, ExitCodes, GrantConfig, LabelConfig, LoggingConfig, OverrideConfig,
    PermissionsConfig, PluginConfig, PluginsConfig, RemoteConfig, SecurityConfig, StrategyKind,
    SubjectKind, SystemConfig, WardenConfig,
};

/// Default global config directory.
pub fn default_config_dir() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".warden")
}

/// Default global config file path.
pub fn default_config_path() -> std::path::PathBuf {
    default_config_dir().join("config.toml")
}
