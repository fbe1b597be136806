//! Configuration types.
//!
//! All types implement [`Default`] for compile-time fallback values.

use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Main configuration structure.
///
/// This is the unified configuration after merging all layers.
///
/// # Example
///
/// ```
/// use warden_runtime::config::WardenConfig;
///
/// let config = WardenConfig::default();
/// assert!(!config.permissions.manage_enabled);
/// assert_eq!(config.remote.exit_codes.denied, 6);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WardenConfig {
    /// Opt-in permission flags.
    pub permissions: PermissionsConfig,

    /// Authorization strategy and grants.
    pub security: SecurityConfig,

    /// Installed plugins.
    pub plugins: PluginsConfig,

    /// Labels by name.
    pub labels: BTreeMap<String, LabelConfig>,

    /// Instance-wide settings.
    pub system: SystemConfig,

    /// Remote command interface.
    pub remote: RemoteConfig,

    /// Logging defaults.
    pub logging: LoggingConfig,
}

impl WardenConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes to TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserializes from TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Deserializes from an already merged TOML table.
    ///
    /// # Errors
    ///
    /// Returns error if a key holds a value of the wrong type.
    pub fn from_table(table: toml::Table) -> Result<Self, toml::de::Error> {
        toml::Value::Table(table).try_into()
    }

    /// Checks cross-field rules that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for colliding exit codes, a
    /// non-zero success code or an empty shell.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.remote.exit_codes.validate()?;
        if self.system.shell.trim().is_empty() {
            return Err(ConfigError::invalid_value("system.shell", "must not be empty"));
        }
        Ok(())
    }
}

/// Opt-in permission flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Enables `overall.Manage`.
    pub manage_enabled: bool,

    /// Enables `overall.SystemRead`.
    pub system_read_enabled: bool,
}

/// Which authorization strategy guards the root.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Flat matrix: global grants only.
    GlobalMatrix,
    /// Scoped matrix: grants may target objects.
    #[default]
    ProjectMatrix,
    /// Everyone is an administrator.
    Unsecured,
    /// Every authenticated identity is an administrator.
    LoggedInFullControl,
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global_matrix" => Ok(Self::GlobalMatrix),
            "project_matrix" => Ok(Self::ProjectMatrix),
            "unsecured" => Ok(Self::Unsecured),
            "logged_in_full_control" => Ok(Self::LoggedInFullControl),
            other => Err(format!("unknown strategy '{other}'")),
        }
    }
}

/// How a grant's subject name is matched.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    /// Principal only.
    User,
    /// Group only.
    Group,
    /// Principal or group.
    #[default]
    Name,
}

/// One grant as written in the config file.
///
/// ```toml
/// [[security.grants]]
/// subject = "alice"
/// permissions = ["overall.Read", "overall.Manage"]
/// scope = "label/foo"   # "/" (default) means global
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GrantConfig {
    /// Principal or group name.
    pub subject: String,

    /// How `subject` is matched.
    #[serde(default)]
    pub kind: SubjectKind,

    /// Permission ids (`group.Name`).
    pub permissions: Vec<String>,

    /// Object path the grant covers.
    #[serde(default = "default_scope")]
    pub scope: String,
}

fn default_scope() -> String {
    "/".to_string()
}

/// A per-object strategy override.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverrideConfig {
    /// The object carrying the override.
    pub object: String,

    /// Grants of the local (scoped matrix) strategy.
    #[serde(default)]
    pub grants: Vec<GrantConfig>,
}

/// Authorization settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SecurityConfig {
    /// Root strategy.
    pub strategy: StrategyKind,

    /// Grants anonymous Read under `logged_in_full_control`.
    pub anonymous_read: bool,

    /// Grants of the root matrix strategy.
    pub grants: Vec<GrantConfig>,

    /// Per-object overrides.
    pub overrides: Vec<OverrideConfig>,
}

/// A dependency edge as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DependencyConfig {
    /// Plugin depended upon.
    pub target: String,

    /// Whether the dependency is optional.
    #[serde(default)]
    pub optional: bool,

    /// Minimum version, display only.
    #[serde(default)]
    pub min_version: Option<String>,
}

/// An installed plugin as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PluginConfig {
    /// Plugin id.
    pub id: String,

    /// Version string.
    #[serde(default = "default_version")]
    pub version: String,

    /// Whether the plugin starts enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Dependency edges.
    #[serde(default)]
    pub dependencies: Vec<DependencyConfig>,
}

fn default_version() -> String {
    "0.0.0".to_string()
}

fn default_true() -> bool {
    true
}

/// Plugin settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PluginsConfig {
    /// Installed plugins.
    pub installed: Vec<PluginConfig>,
}

/// A label.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LabelConfig {
    /// Free-text description.
    pub description: String,
}

/// Instance-wide settings editable through `manage/configure`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SystemConfig {
    /// Banner shown to users.
    pub system_message: String,

    /// Seconds to wait before starting a queued job.
    pub quiet_period: u32,

    /// Executors on the built-in node.
    pub num_executors: u32,

    /// Shell used for job steps.
    pub shell: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            system_message: String::new(),
            quiet_period: 5,
            num_executors: 2,
            shell: "/bin/sh".to_string(),
        }
    }
}

/// Remote command interface settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RemoteConfig {
    /// Process exit codes.
    pub exit_codes: ExitCodes,
}

/// Exit codes returned by remote commands.
///
/// | Code | Default |
/// |------|---------|
/// | success | 0 |
/// | failure | 1 |
/// | usage | 2 |
/// | not_found | 3 |
/// | denied | 6 |
/// | blocked | 16 |
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExitCodes {
    /// Command succeeded.
    pub success: i32,
    /// Generic failure.
    pub failure: i32,
    /// Bad arguments or unknown command.
    pub usage: i32,
    /// Named plugin or label does not exist.
    pub not_found: i32,
    /// Caller lacks the required permission.
    pub denied: i32,
    /// Disable refused because enabled plugins depend on the target.
    pub blocked: i32,
}

impl Default for ExitCodes {
    fn default() -> Self {
        Self {
            success: 0,
            failure: 1,
            usage: 2,
            not_found: 3,
            denied: 6,
            blocked: 16,
        }
    }
}

impl ExitCodes {
    /// Requires `success == 0` and all codes distinct.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the offending code.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.success != 0 {
            return Err(ConfigError::invalid_value(
                "remote.exit_codes.success",
                "must be 0",
            ));
        }
        let named = [
            ("success", self.success),
            ("failure", self.failure),
            ("usage", self.usage),
            ("not_found", self.not_found),
            ("denied", self.denied),
            ("blocked", self.blocked),
        ];
        let mut seen = BTreeSet::new();
        for (name, code) in named {
            if !seen.insert(code) {
                return Err(ConfigError::invalid_value(
                    format!("remote.exit_codes.{name}"),
                    format!("code {code} is already used"),
                ));
            }
        }
        Ok(())
    }
}

/// Logging defaults, used when neither a CLI flag nor `RUST_LOG` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (e.g. `warn`, `warden_auth=debug`).
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let toml = r#"
[permissions]
manage_enabled = true

[security]
strategy = "global_matrix"

[[security.grants]]
subject = "alice"
permissions = ["overall.Read", "overall.Manage"]

[[security.grants]]
subject = "ops"
kind = "group"
permissions = ["overall.Administer"]
scope = "label/foo"

[[security.overrides]]
object = "label/secret"

[[security.overrides.grants]]
subject = "bob"
permissions = ["overall.Read"]

[[plugins.installed]]
id = "git"
version = "5.2"

[[plugins.installed.dependencies]]
target = "scm-api"
min_version = "2.0"

[[plugins.installed]]
id = "scm-api"
enabled = false

[labels.foo]
description = "linux builders"

[system]
num_executors = 4

[remote.exit_codes]
blocked = 17
"#;
        let config = WardenConfig::from_toml(toml).expect("parse");
        assert!(config.permissions.manage_enabled);
        assert_eq!(config.security.strategy, StrategyKind::GlobalMatrix);
        assert_eq!(config.security.grants.len(), 2);
        assert_eq!(config.security.grants[0].kind, SubjectKind::Name);
        assert_eq!(config.security.grants[0].scope, "/");
        assert_eq!(config.security.grants[1].kind, SubjectKind::Group);
        assert_eq!(config.security.overrides[0].grants[0].subject, "bob");
        assert_eq!(config.plugins.installed[0].dependencies[0].target, "scm-api");
        assert!(config.plugins.installed[0].enabled);
        assert!(!config.plugins.installed[1].enabled);
        assert_eq!(config.plugins.installed[1].version, "0.0.0");
        assert_eq!(config.labels["foo"].description, "linux builders");
        assert_eq!(config.system.num_executors, 4);
        assert_eq!(config.system.quiet_period, 5);
        assert_eq!(config.remote.exit_codes.blocked, 17);
        assert_eq!(config.remote.exit_codes.denied, 6);
    }

    #[test]
    fn toml_roundtrip_of_defaults() {
        let config = WardenConfig::default();
        let text = config.to_toml().expect("serialize");
        assert_eq!(WardenConfig::from_toml(&text).expect("parse"), config);
    }

    #[test]
    fn exit_codes_validation() {
        assert!(ExitCodes::default().validate().is_ok());

        let collide = ExitCodes {
            blocked: 6,
            ..ExitCodes::default()
        };
        let err = collide.validate().expect_err("collision");
        assert!(err.to_string().contains("blocked"));

        let nonzero = ExitCodes {
            success: 1,
            failure: 9,
            ..ExitCodes::default()
        };
        assert!(nonzero.validate().is_err());
    }

    #[test]
    fn empty_shell_rejected() {
        let mut config = WardenConfig::default();
        config.system.shell = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn strategy_kind_from_str() {
        assert_eq!(
            "logged_in_full_control".parse::<StrategyKind>(),
            Ok(StrategyKind::LoggedInFullControl)
        );
        assert!("nope".parse::<StrategyKind>().is_err());
    }
}
