//! Warden runtime: configuration, live instance and command dispatch.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  warden-types / warden-auth / warden-plugin                  │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Runtime Layer (THIS CRATE)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  config/     : WardenConfig, ConfigLoader, ExitCodes        │
//! │  instance    : Instance, Label, SystemSettings              │
//! │  form        : FormSchema, per-field permission filtering   │
//! │  dispatcher  : Operation, CommandDispatcher                 │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │  warden-cli  : one request per process                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! ## [`config`] - Configuration Management
//!
//! - [`WardenConfig`](config::WardenConfig): unified configuration type
//! - [`ConfigLoader`](config::ConfigLoader): defaults, global file,
//!   explicit file, `WARDEN_*` env
//!
//! ## [`instance`] - Live State
//!
//! [`Instance::from_config`] builds the permission registry, the ownership
//! tree with its overrides, labels, system settings and the plugin manager.
//!
//! ## [`form`] - Form Submission
//!
//! A [`FormSchema`](form::FormSchema) tags each field with a permission.
//! Fields the caller may not change are dropped; the rest are validated
//! together and applied at once.
//!
//! ## [`dispatcher`] - Request Dispatch
//!
//! [`CommandDispatcher`] serves web requests and remote commands, running
//! the coarse permission check before any domain logic.

pub mod config;
pub mod dispatcher;
mod error;
pub mod form;
pub mod instance;

pub use dispatcher::{CommandDispatcher, CommandResult, Method, Operation, Response, WebRequest};
pub use error::{DispatchError, RuntimeError};
pub use instance::{Instance, Label, SystemSettings};
