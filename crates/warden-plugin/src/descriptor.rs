//! Static plugin metadata.

use serde::{Deserialize, Serialize};
use std::fmt;
use warden_types::PluginId;

/// A dependency edge from `source` to `target`.
///
/// Optional edges are informational: they never block a disable or enable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDependency {
    /// The dependent plugin.
    pub source: PluginId,

    /// The plugin depended upon.
    pub target: PluginId,

    /// Whether the dependent works without the target.
    #[serde(default)]
    pub optional: bool,

    /// Minimum target version. Opaque; carried for display only.
    #[serde(default)]
    pub min_version: Option<String>,
}

impl fmt::Display for PluginDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)?;
        if let Some(v) = &self.min_version {
            write!(f, " (>= {v})")?;
        }
        if self.optional {
            f.write_str(" [optional]")?;
        }
        Ok(())
    }
}

/// An installed plugin as loaded at startup.
///
/// # Example
///
/// ```
/// use warden_plugin::PluginDescriptor;
///
/// let git = PluginDescriptor::new("git", "5.2.0")
///     .depends_on("scm-api")
///     .depends_on_version("credentials", "2.6")
///     .optionally_depends_on("mailer");
///
/// assert!(git.enabled);
/// assert_eq!(git.mandatory().count(), 2);
/// assert_eq!(git.dependencies[1].min_version.as_deref(), Some("2.6"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Unique plugin identifier.
    pub id: PluginId,

    /// Version string.
    pub version: String,

    /// Whether the plugin starts enabled.
    pub enabled: bool,

    /// Outgoing dependency edges. Incoming edges are computed by the graph.
    pub dependencies: Vec<PluginDependency>,
}

impl PluginDescriptor {
    /// Creates an enabled plugin without dependencies.
    #[must_use]
    pub fn new(id: impl Into<PluginId>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            enabled: true,
            dependencies: Vec::new(),
        }
    }

    /// Marks the plugin as starting disabled.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Adds a mandatory dependency.
    #[must_use]
    pub fn depends_on(self, target: impl Into<PluginId>) -> Self {
        self.edge(target.into(), false, None)
    }

    /// Adds a mandatory dependency with a minimum version.
    #[must_use]
    pub fn depends_on_version(self, target: impl Into<PluginId>, min: impl Into<String>) -> Self {
        self.edge(target.into(), false, Some(min.into()))
    }

    /// Adds an optional dependency.
    #[must_use]
    pub fn optionally_depends_on(self, target: impl Into<PluginId>) -> Self {
        self.edge(target.into(), true, None)
    }

    /// Iterates over mandatory edges.
    pub fn mandatory(&self) -> impl Iterator<Item = &PluginDependency> {
        self.dependencies.iter().filter(|d| !d.optional)
    }

    fn edge(mut self, target: PluginId, optional: bool, min_version: Option<String>) -> Self {
        self.dependencies.push(PluginDependency {
            source: self.id.clone(),
            target,
            optional,
            min_version,
        });
        self
    }
}
