//! Per-field permission policy for configuration forms.
//!
//! A [`FormSchema`] tags every field with the minimum permission needed to
//! change it. A submission passes through two stages:
//!
//! ```text
//! submitted ──accept()──► accepted ──validated()──► next state ──swap──► live
//!             │                       │
//!             ├ unknown field: drop   └ any error: nothing applied
//!             └ not permitted: drop
//! ```
//!
//! Dropped fields are logged at debug level and never reported to the
//! caller.

use crate::error::DispatchError;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use warden_auth::Acl;
use warden_types::{Identity, PermissionId};

/// Field name to submitted (or rendered) value.
pub type FormValues = BTreeMap<String, String>;

/// One form field and the permission required to change it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name.
    pub name: &'static str,
    /// Minimum permission to change it.
    pub permission: PermissionId,
}

/// The fields of one form.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use warden_auth::permission::{ADMINISTER, MANAGE, READ};
/// use warden_auth::testing::MockAuthorizationStrategy;
/// use warden_auth::{AuthorizationStrategy, FeatureFlags, PermissionRegistry};
/// use warden_runtime::form::{FormSchema, FormValues};
/// use warden_types::{Identity, ObjectPath};
///
/// let registry = Arc::new(PermissionRegistry::with_builtins(FeatureFlags::new().with("manage")).unwrap());
/// let mut mock = MockAuthorizationStrategy::new(registry);
/// mock.grant([READ, MANAGE]).everywhere().to("alice");
/// let acl = mock.acl_for(&ObjectPath::root());
///
/// let schema = FormSchema::new()
///     .field("system_message", MANAGE)
///     .field("shell", ADMINISTER);
///
/// let submitted = FormValues::from([
///     ("system_message".to_string(), "hello".to_string()),
///     ("shell".to_string(), "/bin/zsh".to_string()),
///     ("bogus".to_string(), "x".to_string()),
/// ]);
/// let accepted = schema.accept(&acl, &Identity::user("alice"), &submitted);
/// assert_eq!(accepted.len(), 1);
/// assert_eq!(accepted["system_message"], "hello");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSchema {
    fields: Vec<FieldSpec>,
}

impl FormSchema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, name: &'static str, permission: PermissionId) -> Self {
        self.fields.push(FieldSpec { name, permission });
        self
    }

    /// Returns the fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Returns the field named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Keeps the submitted fields `identity` may change; silently drops
    /// the rest.
    #[must_use]
    pub fn accept(&self, acl: &Acl, identity: &Identity, submitted: &FormValues) -> FormValues {
        let mut accepted = FormValues::new();
        for (name, value) in submitted {
            match self.get(name) {
                None => {
                    tracing::debug!(field = %name, "unknown form field dropped");
                }
                Some(spec) if acl.has_permission(identity, &spec.permission) => {
                    accepted.insert(name.clone(), value.clone());
                }
                Some(spec) => {
                    tracing::debug!(
                        principal = %identity.principal(),
                        field = %name,
                        permission = %spec.permission,
                        "form field dropped: not permitted"
                    );
                }
            }
        }
        accepted
    }
}

/// State that is edited through a form.
pub trait Configurable: Clone {
    /// Returns the form schema.
    fn schema() -> FormSchema;

    /// Renders the current values.
    fn render(&self) -> FormValues;

    /// Returns a copy with every accepted value applied, or the first
    /// validation error. Must not mutate `self`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Invalid`] naming the offending field.
    fn validated(&self, accepted: &FormValues) -> Result<Self, DispatchError>;
}

/// Filters, validates and applies a submission atomically.
///
/// Returns the names of the fields that were applied.
///
/// # Errors
///
/// Returns [`DispatchError::Invalid`] if any accepted value is invalid; the
/// target is left unchanged.
pub fn submit<T: Configurable>(
    target: &RwLock<T>,
    acl: &Acl,
    identity: &Identity,
    submitted: &FormValues,
) -> Result<Vec<String>, DispatchError> {
    let accepted = T::schema().accept(acl, identity, submitted);
    let mut guard = target.write();
    let next = guard.validated(&accepted)?;
    *guard = next;
    Ok(accepted.into_keys().collect())
}

/// Parses an unsigned integer field.
pub(crate) fn parse_u32(field: &str, value: &str) -> Result<u32, DispatchError> {
    value
        .trim()
        .parse()
        .map_err(|_| DispatchError::invalid(field, "expected a non-negative integer"))
}
