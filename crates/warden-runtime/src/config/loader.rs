//! Layered configuration loading.
//!
//! # Layers
//!
//! Later layers win:
//!
//! 1. [`WardenConfig::default`]
//! 2. `~/.warden/config.toml`, skipped when absent
//! 3. the `--config` file, which must exist
//! 4. `WARDEN_*` variables
//!
//! Validation runs once, on the merged result.

use super::{default_config_path, ConfigError, StrategyKind, WardenConfig};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Builds a [`WardenConfig`] from files and the environment.
///
/// # Example
///
/// ```ignore
/// use warden_runtime::config::ConfigLoader;
///
/// let config = ConfigLoader::new()
///     .skip_global_config()
///     .with_file("/etc/warden/config.toml")
///     .load()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    global_path: Option<PathBuf>,
    file: Option<PathBuf>,
    skip_env: bool,
    skip_global: bool,
}

impl ConfigLoader {
    /// Creates a loader reading every layer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the global layer from `path` instead of `~/.warden`.
    #[must_use]
    pub fn with_global_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_path = Some(path.into());
        self
    }

    /// Sets an explicit config file, layered over the global one.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Ignores `WARDEN_*` variables.
    #[must_use]
    pub fn skip_env_vars(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Ignores the global file.
    #[must_use]
    pub fn skip_global_config(mut self) -> Self {
        self.skip_global = true;
        self
    }

    /// Loads, merges and validates every layer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a config file exists but cannot be parsed,
    /// if the explicit file is missing, if an env var is malformed, or if
    /// the merged config fails validation. A missing global file is
    /// silently ignored.
    pub fn load(&self) -> Result<WardenConfig, ConfigError> {
        let mut merged = toml::Table::new();

        if !self.skip_global {
            let path = self
                .global_path
                .clone()
                .unwrap_or_else(default_config_path);
            if let Some(layer) = read_layer(&path)? {
                debug!(path = %path.display(), "global config merged");
                merge_tables(&mut merged, layer);
            }
        }

        if let Some(path) = &self.file {
            let layer = read_layer(path)?.ok_or_else(|| {
                ConfigError::read_file(
                    path,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
                )
            })?;
            debug!(path = %path.display(), "config file merged");
            merge_tables(&mut merged, layer);
        }

        let mut config = WardenConfig::from_table(merged)
            .map_err(|e| ConfigError::invalid_value("config", e.to_string()))?;

        if !self.skip_env {
            apply_env(&mut config)?;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Reads one file layer as a raw table; `None` when the file does not exist.
///
/// The layer is also deserialized on its own so type errors name the file
/// they come from.
fn read_layer(path: &Path) -> Result<Option<toml::Table>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    let table: toml::Table = text
        .parse()
        .map_err(|e| ConfigError::parse_toml(path, e))?;
    WardenConfig::from_table(table.clone()).map_err(|e| ConfigError::parse_toml(path, e))?;
    Ok(Some(table))
}

/// Overlays `layer` onto `base`. Every key present in `layer` wins,
/// whatever its value; nested tables merge key by key, arrays replace.
fn merge_tables(base: &mut toml::Table, layer: toml::Table) {
    for (key, value) in layer {
        if let toml::Value::Table(overlay) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, overlay);
                continue;
            }
            base.insert(key, toml::Value::Table(overlay));
        } else {
            base.insert(key, value);
        }
    }
}

fn apply_env(config: &mut WardenConfig) -> Result<(), ConfigError> {
    let flags = [
        (
            "WARDEN_PERMISSION_MANAGE_ENABLED",
            &mut config.permissions.manage_enabled,
        ),
        (
            "WARDEN_PERMISSION_SYSTEM_READ_ENABLED",
            &mut config.permissions.system_read_enabled,
        ),
        ("WARDEN_ANONYMOUS_READ", &mut config.security.anonymous_read),
    ];
    for (var, field) in flags {
        if let Some(on) = env_flag(var)? {
            *field = on;
        }
    }

    if let Ok(raw) = std::env::var("WARDEN_SECURITY_STRATEGY") {
        config.security.strategy = raw
            .parse::<StrategyKind>()
            .map_err(|e| ConfigError::invalid_env_var("WARDEN_SECURITY_STRATEGY", e))?;
    }
    if let Ok(level) = std::env::var("WARDEN_LOG_LEVEL") {
        config.logging.level = level;
    }
    Ok(())
}

/// Reads a boolean variable; unset is `None`.
fn env_flag(var: &'static str) -> Result<Option<bool>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => parse_flag(&raw)
            .map(Some)
            .ok_or_else(|| ConfigError::invalid_env_var(var, "expected bool")),
        Err(_) => Ok(None),
    }
}

/// `true/false`, `1/0`, `yes/no`, `on/off`, any case.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
