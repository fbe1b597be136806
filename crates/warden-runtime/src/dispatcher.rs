//! Request dispatch for the web and remote command surfaces.
//!
//! Every request is resolved to an [`Operation`] first. The operation names
//! the permission it needs and the object the check runs against, and the
//! coarse check runs before any domain logic:
//!
//! ```text
//! WebRequest ──route──┐                    ┌──► Response { status, body }
//!                     ├──► Operation ──check──► execute
//! command + args ─────┘         │               └──► CommandResult { code, .. }
//!                               └─ denied: 403 "forbidden" / exit `denied`
//! ```
//!
//! # Web surface
//!
//! | Path | Method | Permission (object) |
//! |------|--------|---------------------|
//! | `label/<name>/configure` | GET, POST | Manage (`label/<name>`) |
//! | `manage/configure` | GET | SystemRead or Manage (`/`) |
//! | `manage/configure` | POST | Manage (`/`) |
//! | `manage/plugins` | GET | Manage (`/`) |
//! | `manage/plugins/<id>/disable` | POST | Administer (`/`) |
//! | `manage/plugins/<id>/enable` | POST | Administer (`/`) |
//! | `manage/references` | GET | Administer (`/`) |
//! | `whoAmI` | GET | Read (`/`) |
//!
//! A path that matches no route is still checked against its prefix
//! (`manage/*` needs Manage, `label/<name>/*` needs Manage on the label,
//! anything else needs Read) before answering 404.
//!
//! # Remote commands
//!
//! | Command | Args | Permission (object) |
//! |---------|------|---------------------|
//! | `disable-plugin` | `<id>...` | Administer (`/`) |
//! | `enable-plugin` | `<id>...` | Administer (`/`) |
//! | `list-plugins` | | Manage (`/`) |
//! | `who-am-i` | | Read (`/`) |
//! | `get-label-description` | `<label>` | Read (`label/<label>`) |
//! | `set-label-description` | `<label> <text...>` | Manage (`label/<label>`) |
//! | `dump-references` | | Administer (`/`) |
//!
//! Plugin batches stop at the first failing id; earlier ids stay changed.

use crate::error::DispatchError;
use crate::form::{self, Configurable, FormValues};
use crate::instance::{label_path, Instance, Label, LABEL_ROOT};
use parking_lot::RwLock;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use warden_auth::permission::{ADMINISTER, MANAGE, READ, SYSTEM_READ};
use warden_auth::AccessDenied;
use warden_plugin::{LifecycleOutcome, PluginError};
use warden_types::{ErrorCode, Identity, ObjectPath, PermissionId, PluginId, RequestId};

/// HTTP-like method of a web request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Navigation.
    Get,
    /// Form submission.
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// A web navigation or form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebRequest {
    /// Request path, relative to the instance root.
    pub path: String,
    /// Method.
    pub method: Method,
    /// Submitted fields (empty for navigation).
    pub form: FormValues,
}

impl WebRequest {
    /// Creates a GET request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Method::Get,
            form: FormValues::new(),
        }
    }

    /// Creates a POST request carrying `form`.
    #[must_use]
    pub fn post(path: impl Into<String>, form: FormValues) -> Self {
        Self {
            path: path.into(),
            method: Method::Post,
            form,
        }
    }
}

/// Web response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl Response {
    /// A 200 response.
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// Maps a dispatch error onto a status code.
    #[must_use]
    pub fn from_error(err: &DispatchError) -> Self {
        let status = match err {
            DispatchError::Forbidden(_) => 403,
            DispatchError::NotFound(_) | DispatchError::Plugin(PluginError::NotFound(_)) => 404,
            DispatchError::MethodNotAllowed => 405,
            DispatchError::Blocked { .. } => 409,
            DispatchError::Unsatisfied { .. } => 424,
            DispatchError::UnknownCommand(_)
            | DispatchError::Usage(_)
            | DispatchError::Invalid { .. } => 400,
            DispatchError::Plugin(_) => 500,
        };
        Self {
            status,
            body: err.to_string(),
        }
    }

    /// Returns `true` for a 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outcome of a remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Process exit code.
    pub code: i32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

/// Every operation the dispatcher can run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Render the configuration form of a label.
    ViewLabel(String),
    /// Submit the configuration form of a label.
    ConfigureLabel(String),
    /// Render the system configuration form.
    ViewSystem,
    /// Submit the system configuration form.
    ConfigureSystem,
    /// List installed plugins.
    ListPlugins,
    /// Disable plugins, in order.
    DisablePlugins(Vec<PluginId>),
    /// Enable plugins, in order.
    EnablePlugins(Vec<PluginId>),
    /// Dump the live object tree, permissions and plugins.
    DumpReferences,
    /// Describe the calling identity.
    WhoAmI,
    /// Print a label description.
    GetLabelDescription(String),
    /// Replace a label description.
    SetLabelDescription {
        /// Label name.
        label: String,
        /// New description.
        text: String,
    },
}

impl Operation {
    /// Routes a web request.
    ///
    /// # Errors
    ///
    /// [`DispatchError::NotFound`] for an unknown path,
    /// [`DispatchError::MethodNotAllowed`] for a known path with the wrong
    /// method.
    pub fn from_web(method: Method, path: &str) -> Result<Self, DispatchError> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let op = match (segments.as_slice(), method) {
            ([LABEL_ROOT, name, "configure"], Method::Get) => Self::ViewLabel((*name).to_string()),
            ([LABEL_ROOT, name, "configure"], Method::Post) => {
                Self::ConfigureLabel((*name).to_string())
            }
            (["manage", "configure"], Method::Get) => Self::ViewSystem,
            (["manage", "configure"], Method::Post) => Self::ConfigureSystem,
            (["manage", "plugins"], Method::Get) => Self::ListPlugins,
            (["manage", "plugins", id, "disable"], Method::Post) => {
                Self::DisablePlugins(vec![PluginId::new(*id)])
            }
            (["manage", "plugins", id, "enable"], Method::Post) => {
                Self::EnablePlugins(vec![PluginId::new(*id)])
            }
            (["manage", "references"], Method::Get) => Self::DumpReferences,
            (["whoAmI"], Method::Get) => Self::WhoAmI,
            (
                ["manage", "plugins"]
                | ["manage", "references"]
                | ["whoAmI"]
                | ["manage", "plugins", _, "disable" | "enable"],
                _,
            ) => return Err(DispatchError::MethodNotAllowed),
            _ => return Err(DispatchError::NotFound(path.to_string())),
        };
        Ok(op)
    }

    /// Parses a remote command line.
    ///
    /// # Errors
    ///
    /// [`DispatchError::UnknownCommand`] or [`DispatchError::Usage`].
    pub fn from_command(name: &str, args: &[String]) -> Result<Self, DispatchError> {
        let op = match name {
            "disable-plugin" | "enable-plugin" => {
                if args.is_empty() {
                    return Err(DispatchError::Usage(format!("{name} <id>...")));
                }
                let ids = args.iter().map(|a| PluginId::new(a.as_str())).collect();
                if name == "disable-plugin" {
                    Self::DisablePlugins(ids)
                } else {
                    Self::EnablePlugins(ids)
                }
            }
            "list-plugins" => no_args(name, args, Self::ListPlugins)?,
            "who-am-i" => no_args(name, args, Self::WhoAmI)?,
            "dump-references" => no_args(name, args, Self::DumpReferences)?,
            "get-label-description" => match args {
                [label] => Self::GetLabelDescription(label.clone()),
                _ => return Err(DispatchError::Usage(format!("{name} <label>"))),
            },
            "set-label-description" => match args {
                [label, text @ ..] if !text.is_empty() => Self::SetLabelDescription {
                    label: label.clone(),
                    text: text.join(" "),
                },
                _ => return Err(DispatchError::Usage(format!("{name} <label> <text...>"))),
            },
            other => return Err(DispatchError::UnknownCommand(other.to_string())),
        };
        Ok(op)
    }

    /// Returns the minimal permission for the coarse check.
    #[must_use]
    pub fn required_permission(&self) -> PermissionId {
        match self {
            Self::ViewLabel(_)
            | Self::ConfigureLabel(_)
            | Self::SetLabelDescription { .. }
            | Self::ViewSystem
            | Self::ConfigureSystem
            | Self::ListPlugins => MANAGE,
            Self::DisablePlugins(_) | Self::EnablePlugins(_) | Self::DumpReferences => ADMINISTER,
            Self::WhoAmI | Self::GetLabelDescription(_) => READ,
        }
    }

    /// Returns a narrower permission that also admits the operation.
    ///
    /// Only the system configuration view has one: `overall.SystemRead`
    /// grants it read-only, without Manage.
    #[must_use]
    pub fn read_only_permission(&self) -> Option<PermissionId> {
        match self {
            Self::ViewSystem => Some(SYSTEM_READ),
            _ => None,
        }
    }

    /// Returns the object the coarse check runs against.
    #[must_use]
    pub fn target(&self) -> ObjectPath {
        match self {
            Self::ViewLabel(name)
            | Self::ConfigureLabel(name)
            | Self::GetLabelDescription(name)
            | Self::SetLabelDescription { label: name, .. } => label_path(name),
            _ => ObjectPath::root(),
        }
    }

    /// Returns a short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ViewLabel(_) => "view-label",
            Self::ConfigureLabel(_) => "configure-label",
            Self::ViewSystem => "view-system",
            Self::ConfigureSystem => "configure-system",
            Self::ListPlugins => "list-plugins",
            Self::DisablePlugins(_) => "disable-plugin",
            Self::EnablePlugins(_) => "enable-plugin",
            Self::DumpReferences => "dump-references",
            Self::WhoAmI => "who-am-i",
            Self::GetLabelDescription(_) => "get-label-description",
            Self::SetLabelDescription { .. } => "set-label-description",
        }
    }
}

fn no_args(name: &str, args: &[String], op: Operation) -> Result<Operation, DispatchError> {
    if args.is_empty() {
        Ok(op)
    } else {
        Err(DispatchError::Usage(format!("{name} takes no arguments")))
    }
}

/// Permission and object guarding an unrouted path.
fn prefix_guard(path: &str) -> (PermissionId, ObjectPath) {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        ["manage", ..] => (MANAGE, ObjectPath::root()),
        [LABEL_ROOT, name, ..] => (MANAGE, label_path(name)),
        [LABEL_ROOT] => (MANAGE, ObjectPath::new(LABEL_ROOT)),
        _ => (READ, ObjectPath::root()),
    }
}

/// Serves web requests and remote commands against one [`Instance`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use warden_runtime::config::{GrantConfig, SubjectKind, WardenConfig};
/// use warden_runtime::{CommandDispatcher, Instance, WebRequest};
/// use warden_types::Identity;
///
/// let mut config = WardenConfig::default();
/// config.security.grants.push(GrantConfig {
///     subject: "alice".into(),
///     kind: SubjectKind::User,
///     permissions: vec!["overall.Read".into()],
///     scope: "/".into(),
/// });
/// let dispatcher = CommandDispatcher::new(Arc::new(Instance::from_config(&config).unwrap()));
///
/// let alice = Identity::user("alice");
/// assert_eq!(dispatcher.handle(&alice, &WebRequest::get("whoAmI")).status, 200);
/// assert_eq!(dispatcher.handle(&alice, &WebRequest::get("manage/configure")).status, 403);
///
/// let result = dispatcher.run_command(&alice, "dump-references", &[]);
/// assert_eq!(result.code, 6);
/// assert_eq!(result.stderr.trim(), "forbidden");
/// ```
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    instance: Arc<Instance>,
}

impl CommandDispatcher {
    /// Creates a dispatcher over `instance`.
    #[must_use]
    pub fn new(instance: Arc<Instance>) -> Self {
        Self { instance }
    }

    /// Returns the instance.
    #[must_use]
    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    /// Runs the coarse check for `op`.
    ///
    /// # Errors
    ///
    /// Returns [`AccessDenied`] if `identity` holds neither the operation's
    /// permission nor its read-only permission on its target.
    pub fn authorize(&self, identity: &Identity, op: &Operation) -> Result<(), AccessDenied> {
        let acl = self.instance.acl(&op.target());
        if let Some(read_only) = op.read_only_permission() {
            if acl.has_permission(identity, &read_only) {
                tracing::debug!(
                    operation = op.name(),
                    permission = %read_only,
                    "admitted read-only"
                );
                return Ok(());
            }
        }
        acl.check(identity, &op.required_permission())
    }

    /// Serves a web request.
    pub fn handle(&self, identity: &Identity, request: &WebRequest) -> Response {
        let request_id = RequestId::new();
        let span = tracing::info_span!(
            "web",
            request_id = %request_id,
            method = %request.method,
            path = %request.path,
            principal = %identity.principal(),
        );
        let _enter = span.enter();

        let mut body = String::new();
        match self.serve(identity, request, &mut body) {
            Ok(()) => Response::ok(body),
            Err(e) => {
                tracing::debug!(code = %e.code(), "request failed");
                Response::from_error(&e)
            }
        }
    }

    /// Runs a remote command.
    pub fn run_command(&self, identity: &Identity, name: &str, args: &[String]) -> CommandResult {
        let request_id = RequestId::new();
        let span = tracing::info_span!(
            "command",
            request_id = %request_id,
            command = %name,
            principal = %identity.principal(),
        );
        let _enter = span.enter();

        let mut stdout = String::new();
        let outcome = Operation::from_command(name, args).and_then(|op| {
            self.authorize(identity, &op)?;
            self.execute(identity, &op, &FormValues::new(), &mut stdout)
        });
        match outcome {
            Ok(()) => CommandResult {
                code: self.instance.exit_codes().success,
                stdout,
                stderr: String::new(),
            },
            Err(e) => {
                tracing::debug!(code = %e.code(), "command failed");
                CommandResult {
                    code: self.exit_code(&e),
                    stdout,
                    stderr: format!("{e}\n"),
                }
            }
        }
    }

    /// Maps a dispatch error onto the configured exit codes.
    #[must_use]
    pub fn exit_code(&self, err: &DispatchError) -> i32 {
        let codes = self.instance.exit_codes();
        match err {
            DispatchError::Forbidden(_) => codes.denied,
            DispatchError::NotFound(_) | DispatchError::Plugin(PluginError::NotFound(_)) => {
                codes.not_found
            }
            DispatchError::Blocked { .. } => codes.blocked,
            DispatchError::UnknownCommand(_)
            | DispatchError::Usage(_)
            | DispatchError::MethodNotAllowed => codes.usage,
            DispatchError::Invalid { .. }
            | DispatchError::Unsatisfied { .. }
            | DispatchError::Plugin(_) => codes.failure,
        }
    }

    fn serve(
        &self,
        identity: &Identity,
        request: &WebRequest,
        body: &mut String,
    ) -> Result<(), DispatchError> {
        let op = match Operation::from_web(request.method, &request.path) {
            Ok(op) => op,
            Err(miss) => {
                let (permission, object) = prefix_guard(&request.path);
                self.instance.acl(&object).check(identity, &permission)?;
                return Err(miss);
            }
        };
        self.authorize(identity, &op)?;
        self.execute(identity, &op, &request.form, body)
    }

    fn execute(
        &self,
        identity: &Identity,
        op: &Operation,
        form_values: &FormValues,
        out: &mut String,
    ) -> Result<(), DispatchError> {
        match op {
            Operation::ViewLabel(name) => {
                out.push_str(&render(&self.label(name)?.read().render()));
            }
            Operation::ConfigureLabel(name) => {
                let applied = self.submit_label(identity, name, form_values)?;
                out.push_str(&saved(&applied));
            }
            Operation::ViewSystem => {
                out.push_str(&render(&self.instance.system().read().render()));
            }
            Operation::ConfigureSystem => {
                let acl = self.instance.acl(&ObjectPath::root());
                let applied = form::submit(self.instance.system(), &acl, identity, form_values)?;
                out.push_str(&saved(&applied));
            }
            Operation::ListPlugins => {
                for (descriptor, enabled) in self.instance.plugins().graph().iter() {
                    let state = if enabled { "enabled" } else { "disabled" };
                    out.push_str(&format!(
                        "{}\t{}\t{state}\n",
                        descriptor.id, descriptor.version
                    ));
                }
            }
            Operation::DisablePlugins(ids) => {
                for id in ids {
                    self.disable_plugin(identity, id)?;
                    out.push_str(&format!("{id}: disabled\n"));
                }
            }
            Operation::EnablePlugins(ids) => {
                for id in ids {
                    self.enable_plugin(identity, id)?;
                    out.push_str(&format!("{id}: enabled\n"));
                }
            }
            Operation::DumpReferences => {
                out.push_str(&format!("{:#}\n", self.references()));
            }
            Operation::WhoAmI => {
                out.push_str(&format!("{:#}\n", self.who_am_i(identity)));
            }
            Operation::GetLabelDescription(name) => {
                out.push_str(self.label(name)?.read().description());
                out.push('\n');
            }
            Operation::SetLabelDescription { label, text } => {
                let submitted = FormValues::from([("description".to_string(), text.clone())]);
                self.submit_label(identity, label, &submitted)?;
            }
        }
        Ok(())
    }

    fn label(&self, name: &str) -> Result<&RwLock<Label>, DispatchError> {
        self.instance
            .label(name)
            .ok_or_else(|| DispatchError::NotFound(label_path(name).to_string()))
    }

    fn submit_label(
        &self,
        identity: &Identity,
        name: &str,
        submitted: &FormValues,
    ) -> Result<Vec<String>, DispatchError> {
        let label = self.label(name)?;
        let acl = self.instance.acl(&label_path(name));
        let applied = form::submit(label, &acl, identity, submitted)?;
        tracing::info!(label = %name, fields = ?applied, "label configured");
        Ok(applied)
    }

    fn disable_plugin(&self, identity: &Identity, id: &PluginId) -> Result<(), DispatchError> {
        match self.instance.plugins().disable(identity, id)? {
            LifecycleOutcome::Ok => Ok(()),
            LifecycleOutcome::BlockedByDependents(dependents) => Err(DispatchError::Blocked {
                plugin: id.clone(),
                dependents,
            }),
            LifecycleOutcome::BlockedByDependencies(dependencies) => {
                Err(DispatchError::Unsatisfied {
                    plugin: id.clone(),
                    dependencies,
                })
            }
            LifecycleOutcome::Denied => Err(denied(identity)),
        }
    }

    fn enable_plugin(&self, identity: &Identity, id: &PluginId) -> Result<(), DispatchError> {
        match self.instance.plugins().enable(identity, id)? {
            LifecycleOutcome::Ok => Ok(()),
            LifecycleOutcome::BlockedByDependencies(dependencies) => {
                Err(DispatchError::Unsatisfied {
                    plugin: id.clone(),
                    dependencies,
                })
            }
            LifecycleOutcome::BlockedByDependents(dependents) => Err(DispatchError::Blocked {
                plugin: id.clone(),
                dependents,
            }),
            LifecycleOutcome::Denied => Err(denied(identity)),
        }
    }

    fn who_am_i(&self, identity: &Identity) -> serde_json::Value {
        let granted: Vec<String> = self
            .instance
            .acl(&ObjectPath::root())
            .granted(identity)
            .iter()
            .map(ToString::to_string)
            .collect();
        json!({
            "name": identity.principal(),
            "anonymous": identity.is_anonymous(),
            "authorities": identity.all_groups().collect::<Vec<_>>(),
            "permissions": granted,
        })
    }

    fn references(&self) -> serde_json::Value {
        let registry = self.instance.registry();
        let resolver = self.instance.resolver();
        let graph = self.instance.plugins().graph();

        let permissions: Vec<_> = registry
            .iter()
            .map(|p| {
                json!({
                    "id": p.id().to_string(),
                    "enabled": registry.is_enabled(p.id()),
                    "implied_by": p.implier().map(ToString::to_string),
                })
            })
            .collect();
        let plugins: Vec<_> = graph
            .iter()
            .map(|(d, enabled)| {
                json!({
                    "id": d.id.as_str(),
                    "version": d.version,
                    "enabled": enabled,
                    "dependencies": d.dependencies.iter().map(ToString::to_string).collect::<Vec<_>>(),
                })
            })
            .collect();

        json!({
            "flags": registry.flags().iter().collect::<Vec<_>>(),
            "permissions": permissions,
            "objects": resolver.objects().iter().map(ObjectPath::as_str).collect::<Vec<_>>(),
            "overrides": resolver.overridden().iter().map(ObjectPath::as_str).collect::<Vec<_>>(),
            "labels": self.instance.label_names().collect::<Vec<_>>(),
            "plugins": plugins,
            "plugin_generation": graph.generation(),
        })
    }
}

fn denied(identity: &Identity) -> DispatchError {
    DispatchError::Forbidden(AccessDenied::new(
        identity.principal(),
        ADMINISTER,
        ObjectPath::root(),
    ))
}

fn render(values: &FormValues) -> String {
    values
        .iter()
        .map(|(k, v)| format!("{k}={v}\n"))
        .collect()
}

fn saved(applied: &[String]) -> String {
    if applied.is_empty() {
        "saved\n".to_string()
    } else {
        format!("saved: {}\n", applied.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GrantConfig, LabelConfig, PluginConfig, SubjectKind, WardenConfig};

    fn grant(subject: &str, permissions: &[&str]) -> GrantConfig {
        GrantConfig {
            subject: subject.to_string(),
            kind: SubjectKind::User,
            permissions: permissions.iter().map(ToString::to_string).collect(),
            scope: "/".to_string(),
        }
    }

    fn dispatcher() -> CommandDispatcher {
        let mut config = WardenConfig::default();
        config.permissions.manage_enabled = true;
        config.security.grants = vec![
            grant("admin", &["overall.Administer"]),
            grant("manager", &["overall.Read", "overall.Manage"]),
            grant("reader", &["overall.Read"]),
        ];
        config.labels.insert(
            "linux".into(),
            LabelConfig {
                description: "old".into(),
            },
        );
        config.plugins.installed = vec![PluginConfig {
            id: "git".into(),
            version: "5.2".into(),
            enabled: true,
            dependencies: Vec::new(),
        }];
        let instance = Instance::from_config(&config).expect("instance");
        CommandDispatcher::new(Arc::new(instance))
    }

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn routes_web_paths() {
        assert_eq!(
            Operation::from_web(Method::Get, "/label/linux/configure").expect("route"),
            Operation::ViewLabel("linux".into())
        );
        assert_eq!(
            Operation::from_web(Method::Post, "manage/plugins/git/disable").expect("route"),
            Operation::DisablePlugins(vec![PluginId::new("git")])
        );
        assert!(matches!(
            Operation::from_web(Method::Post, "whoAmI"),
            Err(DispatchError::MethodNotAllowed)
        ));
        assert!(matches!(
            Operation::from_web(Method::Get, "nowhere"),
            Err(DispatchError::NotFound(_))
        ));
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            Operation::from_command("set-label-description", &args(&["linux", "fast", "boxes"]))
                .expect("parse"),
            Operation::SetLabelDescription {
                label: "linux".into(),
                text: "fast boxes".into()
            }
        );
        assert!(matches!(
            Operation::from_command("disable-plugin", &[]),
            Err(DispatchError::Usage(_))
        ));
        assert!(matches!(
            Operation::from_command("who-am-i", &args(&["extra"])),
            Err(DispatchError::Usage(_))
        ));
        assert!(matches!(
            Operation::from_command("reboot", &[]),
            Err(DispatchError::UnknownCommand(_))
        ));
    }

    #[test]
    fn operation_permissions() {
        assert_eq!(Operation::ListPlugins.required_permission(), MANAGE);
        assert_eq!(Operation::DumpReferences.required_permission(), ADMINISTER);
        assert_eq!(
            Operation::GetLabelDescription("x".into()).required_permission(),
            READ
        );
        assert_eq!(
            Operation::ConfigureLabel("x".into()).target(),
            ObjectPath::new("label/x")
        );
        assert!(Operation::WhoAmI.target().is_root());
    }

    #[test]
    fn only_the_system_view_has_a_read_only_permission() {
        assert_eq!(Operation::ViewSystem.read_only_permission(), Some(SYSTEM_READ));
        assert_eq!(Operation::ConfigureSystem.read_only_permission(), None);
        assert_eq!(Operation::ListPlugins.read_only_permission(), None);
    }

    #[test]
    fn manager_views_label() {
        let d = dispatcher();
        let response = d.handle(
            &Identity::user("manager"),
            &WebRequest::get("label/linux/configure"),
        );
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "description=old\n");
    }

    #[test]
    fn unknown_label_is_404_only_after_check() {
        let d = dispatcher();
        let manager = d.handle(
            &Identity::user("manager"),
            &WebRequest::get("label/nope/configure"),
        );
        assert_eq!(manager.status, 404);

        let reader = d.handle(
            &Identity::user("reader"),
            &WebRequest::get("label/nope/configure"),
        );
        assert_eq!(reader.status, 403);
        assert_eq!(reader.body, "forbidden");
    }

    #[test]
    fn unrouted_manage_path_checks_prefix_first() {
        let d = dispatcher();
        let reader = d.handle(&Identity::user("reader"), &WebRequest::get("manage/secret"));
        assert_eq!(reader.status, 403);
        let manager = d.handle(&Identity::user("manager"), &WebRequest::get("manage/secret"));
        assert_eq!(manager.status, 404);
        let anon = d.handle(&Identity::anonymous(), &WebRequest::get("elsewhere"));
        assert_eq!(anon.status, 403);
    }

    #[test]
    fn invalid_submission_is_400_and_applies_nothing() {
        let d = dispatcher();
        let form = FormValues::from([
            ("system_message".to_string(), "hi".to_string()),
            ("quiet_period".to_string(), "soon".to_string()),
        ]);
        let response = d.handle(
            &Identity::user("manager"),
            &WebRequest::post("manage/configure", form),
        );
        assert_eq!(response.status, 400);
        assert_eq!(d.instance().system().read().system_message, "");
    }

    #[test]
    fn exit_codes_per_error() {
        let d = dispatcher();
        let reader = Identity::user("reader");
        assert_eq!(d.run_command(&reader, "bogus", &[]).code, 2);
        assert_eq!(d.run_command(&reader, "list-plugins", &[]).code, 6);
        assert_eq!(
            d.run_command(&reader, "get-label-description", &args(&["nope"]))
                .code,
            3
        );
        let admin = Identity::user("admin");
        assert_eq!(
            d.run_command(&admin, "disable-plugin", &args(&["nope"])).code,
            3
        );
    }

    #[test]
    fn list_plugins_for_manager() {
        let d = dispatcher();
        let result = d.run_command(&Identity::user("manager"), "list-plugins", &[]);
        assert_eq!(result.code, 0);
        assert_eq!(result.stdout, "git\t5.2\tenabled\n");
    }

    #[test]
    fn who_am_i_lists_granted() {
        let d = dispatcher();
        let result = d.run_command(&Identity::user("manager"), "who-am-i", &[]);
        assert_eq!(result.code, 0);
        let value: serde_json::Value = serde_json::from_str(&result.stdout).expect("json");
        assert_eq!(value["name"], "manager");
        let permissions = value["permissions"].as_array().expect("array");
        assert!(permissions.iter().any(|p| p == "overall.Manage"));
        assert!(!permissions.iter().any(|p| p == "overall.Administer"));
    }

    #[test]
    fn references_for_admin() {
        let d = dispatcher();
        let response = d.handle(&Identity::user("admin"), &WebRequest::get("manage/references"));
        assert_eq!(response.status, 200);
        let value: serde_json::Value = serde_json::from_str(&response.body).expect("json");
        assert_eq!(value["labels"][0], "linux");
        assert_eq!(value["plugin_generation"], 0);
        assert!(value["objects"]
            .as_array()
            .expect("array")
            .iter()
            .any(|o| o == "label/linux"));
    }
}
