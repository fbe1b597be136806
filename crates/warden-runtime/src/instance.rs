//! The live server instance: root object, labels, system settings, plugins.
//!
//! [`Instance::from_config`] is the only constructor. It turns a validated
//! [`WardenConfig`] into the authorization objects the dispatcher consults:
//!
//! ```text
//! WardenConfig
//!   ├── permissions ──► FeatureFlags ──► PermissionRegistry
//!   ├── security    ──► root strategy + per-object overrides ──► AclResolver
//!   ├── labels      ──► label/<name> objects + Label state
//!   ├── system      ──► SystemSettings
//!   └── plugins     ──► PluginDependencyGraph ──► PluginLifecycleManager
//! ```

use crate::config::{
    ConfigError, ExitCodes, GrantConfig, PluginConfig, SecurityConfig, StrategyKind, SubjectKind,
    SystemConfig, WardenConfig,
};
use crate::error::{DispatchError, RuntimeError};
use crate::form::{parse_u32, Configurable, FormSchema, FormValues};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use warden_auth::permission::{ADMINISTER, MANAGE, MANAGE_FLAG, SYSTEM_READ_FLAG};
use warden_auth::{
    Acl, AclResolver, AuthorizationStrategy, FeatureFlags, GlobalMatrixStrategy, GrantRule,
    LoggedInFullControlStrategy, PermissionRegistry, ProjectMatrixStrategy, ResolverError,
    Subject, UnsecuredStrategy,
};
use warden_plugin::{
    PluginDependency, PluginDependencyGraph, PluginDescriptor, PluginLifecycleManager,
};
use warden_types::{ObjectPath, PermissionId, PluginId, Scope};

/// Object under which every label lives.
pub const LABEL_ROOT: &str = "label";

/// Maximum length of a label description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 4096;

/// Returns the object path of label `name`.
#[must_use]
pub fn label_path(name: &str) -> ObjectPath {
    ObjectPath::new(LABEL_ROOT).child(name)
}

/// A node label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    name: String,
    description: String,
}

impl Label {
    /// Creates a label.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Returns the label name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Configurable for Label {
    fn schema() -> FormSchema {
        FormSchema::new().field("description", MANAGE)
    }

    fn render(&self) -> FormValues {
        FormValues::from([("description".to_string(), self.description.clone())])
    }

    fn validated(&self, accepted: &FormValues) -> Result<Self, DispatchError> {
        let mut next = self.clone();
        if let Some(description) = accepted.get("description") {
            if description.chars().count() > MAX_DESCRIPTION_LEN {
                return Err(DispatchError::invalid(
                    "description",
                    format!("longer than {MAX_DESCRIPTION_LEN} characters"),
                ));
            }
            next.description = description.clone();
        }
        Ok(next)
    }
}

/// Instance-wide settings edited through `manage/configure`.
///
/// `system_message` and `quiet_period` need Manage; `num_executors` and
/// `shell` need Administer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSettings {
    /// Banner shown to users.
    pub system_message: String,
    /// Seconds a queued job waits before starting.
    pub quiet_period: u32,
    /// Executors on the built-in node.
    pub num_executors: u32,
    /// Shell used for job steps.
    pub shell: String,
}

impl From<&SystemConfig> for SystemSettings {
    fn from(config: &SystemConfig) -> Self {
        Self {
            system_message: config.system_message.clone(),
            quiet_period: config.quiet_period,
            num_executors: config.num_executors,
            shell: config.shell.clone(),
        }
    }
}

impl Configurable for SystemSettings {
    fn schema() -> FormSchema {
        FormSchema::new()
            .field("system_message", MANAGE)
            .field("quiet_period", MANAGE)
            .field("num_executors", ADMINISTER)
            .field("shell", ADMINISTER)
    }

    fn render(&self) -> FormValues {
        FormValues::from([
            ("system_message".to_string(), self.system_message.clone()),
            ("quiet_period".to_string(), self.quiet_period.to_string()),
            ("num_executors".to_string(), self.num_executors.to_string()),
            ("shell".to_string(), self.shell.clone()),
        ])
    }

    fn validated(&self, accepted: &FormValues) -> Result<Self, DispatchError> {
        let mut next = self.clone();
        if let Some(v) = accepted.get("system_message") {
            next.system_message = v.clone();
        }
        if let Some(v) = accepted.get("quiet_period") {
            next.quiet_period = parse_u32("quiet_period", v)?;
        }
        if let Some(v) = accepted.get("num_executors") {
            next.num_executors = parse_u32("num_executors", v)?;
        }
        if let Some(v) = accepted.get("shell") {
            let shell = v.trim();
            if shell.is_empty() {
                return Err(DispatchError::invalid("shell", "must not be empty"));
            }
            next.shell = shell.to_string();
        }
        Ok(next)
    }
}

/// The live instance.
#[derive(Debug)]
pub struct Instance {
    registry: Arc<PermissionRegistry>,
    resolver: Arc<AclResolver>,
    plugins: PluginLifecycleManager,
    labels: BTreeMap<String, RwLock<Label>>,
    system: RwLock<SystemSettings>,
    exit_codes: ExitCodes,
}

impl Instance {
    /// Builds an instance from a validated configuration.
    ///
    /// Grants naming unknown or malformed permissions are logged at warn
    /// and skipped.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::Config`] for an invalid label name
    /// - [`RuntimeError::Registry`] if the permission catalog is invalid
    /// - [`RuntimeError::Resolver`] if an override targets the root
    /// - [`RuntimeError::Plugin`] if the plugin set is inconsistent
    pub fn from_config(config: &WardenConfig) -> Result<Self, RuntimeError> {
        let mut flags = FeatureFlags::new();
        flags.set(MANAGE_FLAG, config.permissions.manage_enabled);
        flags.set(SYSTEM_READ_FLAG, config.permissions.system_read_enabled);
        let registry = Arc::new(PermissionRegistry::with_builtins(flags)?);

        let resolver = Arc::new(AclResolver::new(root_strategy(
            &registry,
            &config.security,
        )));

        let mut labels = BTreeMap::new();
        for (name, label) in &config.labels {
            if name.is_empty() || name.contains('/') {
                return Err(ConfigError::invalid_value(
                    format!("labels.{name}"),
                    "label names must be non-empty and contain no '/'",
                )
                .into());
            }
            ensure_object(&resolver, &label_path(name))?;
            labels.insert(
                name.clone(),
                RwLock::new(Label::new(name.clone(), label.description.clone())),
            );
        }

        for entry in &config.security.overrides {
            let object = ObjectPath::new(&entry.object);
            if object.is_root() {
                return Err(ResolverError::RootReserved.into());
            }
            ensure_object(&resolver, &object)?;
            let local = ProjectMatrixStrategy::with_rules(
                Arc::clone(&registry),
                rules_from(&registry, &entry.grants),
            );
            resolver.set_local_strategy(&object, Some(Arc::new(local)));
            debug!(object = %object, "object override installed");
        }

        let graph = Arc::new(PluginDependencyGraph::from_descriptors(
            config.plugins.installed.iter().map(descriptor_from),
        )?);
        let plugins = PluginLifecycleManager::new(graph, Arc::clone(&resolver));

        info!(
            strategy = ?config.security.strategy,
            manage = config.permissions.manage_enabled,
            labels = labels.len(),
            plugins = plugins.graph().len(),
            "instance ready"
        );

        Ok(Self {
            registry,
            resolver,
            plugins,
            labels,
            system: RwLock::new(SystemSettings::from(&config.system)),
            exit_codes: config.remote.exit_codes,
        })
    }

    /// Returns the permission registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<PermissionRegistry> {
        &self.registry
    }

    /// Returns the ownership-tree resolver.
    #[must_use]
    pub fn resolver(&self) -> &Arc<AclResolver> {
        &self.resolver
    }

    /// Returns the ACL for `object`.
    #[must_use]
    pub fn acl(&self, object: &ObjectPath) -> Acl {
        self.resolver.acl(object)
    }

    /// Returns the plugin lifecycle manager.
    #[must_use]
    pub fn plugins(&self) -> &PluginLifecycleManager {
        &self.plugins
    }

    /// Returns label `name`.
    #[must_use]
    pub fn label(&self, name: &str) -> Option<&RwLock<Label>> {
        self.labels.get(name)
    }

    /// Returns the label names, sorted.
    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }

    /// Returns the system settings.
    #[must_use]
    pub fn system(&self) -> &RwLock<SystemSettings> {
        &self.system
    }

    /// Returns the remote exit codes.
    #[must_use]
    pub fn exit_codes(&self) -> ExitCodes {
        self.exit_codes
    }
}

fn root_strategy(
    registry: &Arc<PermissionRegistry>,
    security: &SecurityConfig,
) -> Arc<dyn AuthorizationStrategy> {
    let registry = Arc::clone(registry);
    match security.strategy {
        StrategyKind::GlobalMatrix => {
            let rules = rules_from(&registry, &security.grants);
            let scoped = rules.iter().filter(|r| !r.scope().is_global()).count();
            if scoped > 0 {
                warn!(rules = scoped, "object-scoped grants have no effect under global_matrix");
            }
            Arc::new(GlobalMatrixStrategy::with_rules(registry, rules))
        }
        StrategyKind::ProjectMatrix => {
            let rules = rules_from(&registry, &security.grants);
            Arc::new(ProjectMatrixStrategy::with_rules(registry, rules))
        }
        StrategyKind::Unsecured => {
            warn_grants_ignored(security);
            Arc::new(UnsecuredStrategy::new(registry))
        }
        StrategyKind::LoggedInFullControl => {
            warn_grants_ignored(security);
            Arc::new(LoggedInFullControlStrategy::new(
                registry,
                security.anonymous_read,
            ))
        }
    }
}

fn warn_grants_ignored(security: &SecurityConfig) {
    if !security.grants.is_empty() {
        warn!(
            strategy = ?security.strategy,
            grants = security.grants.len(),
            "root grants are ignored by this strategy"
        );
    }
}

/// Converts config grants into rules, skipping unknown permissions.
fn rules_from(registry: &PermissionRegistry, grants: &[GrantConfig]) -> Vec<GrantRule> {
    grants
        .iter()
        .filter_map(|grant| {
            let permissions: Vec<PermissionId> = grant
                .permissions
                .iter()
                .filter_map(|name| match name.parse::<PermissionId>() {
                    Ok(id) if registry.contains(&id) => Some(id),
                    Ok(id) => {
                        warn!(
                            subject = %grant.subject,
                            permission = %id,
                            "unknown permission in grant skipped"
                        );
                        None
                    }
                    Err(e) => {
                        warn!(
                            subject = %grant.subject,
                            error = %e,
                            "malformed permission in grant skipped"
                        );
                        None
                    }
                })
                .collect();
            if permissions.is_empty() {
                return None;
            }
            let subject = match grant.kind {
                SubjectKind::User => Subject::user(grant.subject.clone()),
                SubjectKind::Group => Subject::group(grant.subject.clone()),
                SubjectKind::Name => Subject::name(grant.subject.clone()),
            };
            Some(GrantRule::new(
                subject,
                permissions,
                Scope::object(ObjectPath::new(&grant.scope)),
            ))
        })
        .collect()
}

/// Registers `path` and any missing ancestors, each owned by its lexical
/// parent.
fn ensure_object(resolver: &AclResolver, path: &ObjectPath) -> Result<(), ResolverError> {
    if resolver.contains(path) {
        return Ok(());
    }
    let parent = path.parent().unwrap_or_else(ObjectPath::root);
    ensure_object(resolver, &parent)?;
    resolver.register_object(path.clone(), parent, None)
}

fn descriptor_from(plugin: &PluginConfig) -> PluginDescriptor {
    let id = PluginId::new(plugin.id.clone());
    let mut descriptor = PluginDescriptor::new(id.clone(), plugin.version.clone());
    descriptor.enabled = plugin.enabled;
    descriptor.dependencies = plugin
        .dependencies
        .iter()
        .map(|dep| PluginDependency {
            source: id.clone(),
            target: PluginId::new(dep.target.clone()),
            optional: dep.optional,
            min_version: dep.min_version.clone(),
        })
        .collect();
    descriptor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DependencyConfig, LabelConfig, OverrideConfig};
    use warden_auth::permission::READ;
    use warden_types::Identity;

    fn grant(subject: &str, permissions: &[&str], scope: &str) -> GrantConfig {
        GrantConfig {
            subject: subject.to_string(),
            kind: SubjectKind::Name,
            permissions: permissions.iter().map(ToString::to_string).collect(),
            scope: scope.to_string(),
        }
    }

    fn config() -> WardenConfig {
        let mut config = WardenConfig::default();
        config.permissions.manage_enabled = true;
        config.security.grants = vec![
            grant("admin", &["overall.Administer"], "/"),
            grant("alice", &["overall.Read", "overall.Manage"], "/"),
        ];
        config.labels.insert(
            "linux".into(),
            LabelConfig {
                description: "linux builders".into(),
            },
        );
        config
    }

    #[test]
    fn builds_labels_as_objects() {
        let instance = Instance::from_config(&config()).expect("instance");
        assert!(instance.resolver().contains(&ObjectPath::new("label")));
        assert!(instance.resolver().contains(&label_path("linux")));
        let label = instance.label("linux").expect("label");
        assert_eq!(label.read().description(), "linux builders");
        assert_eq!(instance.label_names().collect::<Vec<_>>(), vec!["linux"]);
    }

    #[test]
    fn grants_from_config_apply() {
        let instance = Instance::from_config(&config()).expect("instance");
        let acl = instance.acl(&label_path("linux"));
        assert!(acl.has_permission(&Identity::user("alice"), &MANAGE));
        assert!(!acl.has_permission(&Identity::user("alice"), &ADMINISTER));
        assert!(acl.has_permission(&Identity::user("admin"), &MANAGE));
    }

    #[test]
    fn unknown_permission_is_skipped_not_fatal() {
        let mut config = config();
        config.security.grants.push(grant(
            "bob",
            &["overall.Nonsense", "garbage", "overall.Read"],
            "/",
        ));
        let instance = Instance::from_config(&config).expect("instance");
        let acl = instance.acl(&ObjectPath::root());
        assert!(acl.has_permission(&Identity::user("bob"), &READ));
        assert!(!acl.has_permission(&Identity::user("bob"), &MANAGE));
    }

    #[test]
    fn override_registers_ancestors() {
        let mut config = config();
        config.security.overrides.push(OverrideConfig {
            object: "folder/team/secret".into(),
            grants: vec![grant("carol", &["overall.Read"], "/")],
        });
        let instance = Instance::from_config(&config).expect("instance");
        let resolver = instance.resolver();
        assert!(resolver.contains(&ObjectPath::new("folder")));
        assert!(resolver.contains(&ObjectPath::new("folder/team")));
        assert_eq!(resolver.overridden(), vec![ObjectPath::new("folder/team/secret")]);

        let secret = instance.acl(&ObjectPath::new("folder/team/secret"));
        assert!(secret.has_permission(&Identity::user("carol"), &READ));
        let root = instance.acl(&ObjectPath::root());
        assert!(!root.has_permission(&Identity::user("carol"), &READ));
    }

    #[test]
    fn root_override_rejected() {
        let mut config = config();
        config.security.overrides.push(OverrideConfig {
            object: "/".into(),
            grants: Vec::new(),
        });
        let err = Instance::from_config(&config).expect_err("root override");
        assert!(matches!(err, RuntimeError::Resolver(ResolverError::RootReserved)));
    }

    #[test]
    fn bad_label_name_rejected() {
        let mut config = config();
        config.labels.insert("a/b".into(), LabelConfig::default());
        let err = Instance::from_config(&config).expect_err("bad label");
        assert!(matches!(err, RuntimeError::Config(_)));
    }

    #[test]
    fn plugins_loaded_from_config() {
        let mut config = config();
        config.plugins.installed = vec![
            PluginConfig {
                id: "git".into(),
                version: "5.2".into(),
                enabled: true,
                dependencies: vec![DependencyConfig {
                    target: "scm-api".into(),
                    optional: false,
                    min_version: Some("2.0".into()),
                }],
            },
            PluginConfig {
                id: "scm-api".into(),
                version: "2.6".into(),
                enabled: true,
                dependencies: Vec::new(),
            },
        ];
        let instance = Instance::from_config(&config).expect("instance");
        let graph = instance.plugins().graph();
        assert_eq!(graph.len(), 2);
        assert!(graph.would_break(&PluginId::new("scm-api")));
    }

    #[test]
    fn missing_plugin_dependency_is_fatal() {
        let mut config = config();
        config.plugins.installed = vec![PluginConfig {
            id: "git".into(),
            version: "5.2".into(),
            enabled: true,
            dependencies: vec![DependencyConfig {
                target: "scm-api".into(),
                optional: false,
                min_version: None,
            }],
        }];
        let err = Instance::from_config(&config).expect_err("missing dep");
        assert!(matches!(err, RuntimeError::Plugin(_)));
    }

    #[test]
    fn unsecured_grants_everything() {
        let mut config = WardenConfig::default();
        config.security.strategy = StrategyKind::Unsecured;
        let instance = Instance::from_config(&config).expect("instance");
        assert!(instance
            .acl(&ObjectPath::root())
            .has_permission(&Identity::anonymous(), &ADMINISTER));
    }

    #[test]
    fn system_settings_validation() {
        let settings = SystemSettings::from(&SystemConfig::default());
        let ok = settings
            .validated(&FormValues::from([("quiet_period".to_string(), "10".to_string())]))
            .expect("valid");
        assert_eq!(ok.quiet_period, 10);

        let err = settings
            .validated(&FormValues::from([("shell".to_string(), " ".to_string())]))
            .expect_err("empty shell");
        assert!(matches!(err, DispatchError::Invalid { .. }));
    }

    #[test]
    fn label_description_length_limit() {
        let label = Label::new("linux", "");
        let long = "x".repeat(MAX_DESCRIPTION_LEN + 1);
        assert!(label
            .validated(&FormValues::from([("description".to_string(), long)]))
            .is_err());
    }
}
