//! Warden CLI - one permission-gated request per invocation.
//!
//! # Configuration
//!
//! Configuration is loaded from multiple sources with priority:
//!
//! 1. Environment variables (`WARDEN_*`)
//! 2. Explicit file (`--config <path>`)
//! 3. Global config (`~/.warden/config.toml`)
//! 4. Default values (lowest priority)
//!
//! # Identity
//!
//! Authentication happens upstream. The caller is named with `--as <user>`
//! (plus `--group` memberships) or `--anonymous`, which is the default.
//!
//! # Exit Status
//!
//! The process exits with the dispatcher's code (`[remote.exit_codes]`).
//! Web requests map their status: 2xx is `success`, 403 `denied`,
//! 404 `not_found`, 400/405 `usage`, 409 `blocked`, anything else
//! `failure`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use warden_runtime::config::{ConfigLoader, ExitCodes, WardenConfig};
use warden_runtime::form::FormValues;
use warden_runtime::{CommandDispatcher, Instance, Response, WebRequest};
use warden_types::{Identity, ObjectPath, PermissionId};

/// Warden - permission-gated administration
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file layered over the global one
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Ignore ~/.warden/config.toml
    #[arg(long, global = true)]
    no_global_config: bool,

    /// Act as this user
    #[arg(long = "as", value_name = "USER", global = true, conflicts_with = "anonymous")]
    user: Option<String>,

    /// Group membership of the acting user (repeatable)
    #[arg(short, long = "group", value_name = "GROUP", global = true, requires = "user")]
    groups: Vec<String>,

    /// Act as the anonymous identity
    #[arg(long, global = true)]
    anonymous: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a remote command (e.g. `disable-plugin git`)
    Run {
        /// Command name
        name: String,
        /// Command arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Navigate to a web path
    Get {
        /// Path relative to the instance root
        path: String,
    },
    /// Submit a form to a web path
    Submit {
        /// Path relative to the instance root
        path: String,
        /// Fields as `name=value`
        #[arg(value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Report whether the identity holds a permission on an object
    Check {
        /// Permission id (`group.Name`)
        permission: PermissionId,
        /// Object path
        #[arg(long, default_value = "/")]
        on: String,
    },
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{s}'"))
}

impl Args {
    fn identity(&self) -> Identity {
        match &self.user {
            Some(user) if !self.anonymous => Identity::user(user).with_groups(&self.groups),
            _ => Identity::anonymous(),
        }
    }

    fn load_config(&self) -> Result<WardenConfig> {
        let mut loader = ConfigLoader::new();
        if self.no_global_config {
            loader = loader.skip_global_config();
        }
        if let Some(path) = &self.config {
            loader = loader.with_file(path);
        }
        loader.load().context("failed to load configuration")
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.load_config()?;

    // Terminal filter: --debug > --verbose > RUST_LOG > config > "warn"
    let filter = if args.debug {
        EnvFilter::new("debug")
    } else if args.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.logging.level))
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .init();

    let instance =
        Instance::from_config(&config).context("failed to initialise the instance")?;
    let dispatcher = CommandDispatcher::new(Arc::new(instance));
    let identity = args.identity();
    let codes = config.remote.exit_codes;
    info!(identity = %identity, "request started");

    let code = match &args.command {
        Command::Run { name, args: rest } => {
            let result = dispatcher.run_command(&identity, name, rest);
            print!("{}", result.stdout);
            eprint!("{}", result.stderr);
            result.code
        }
        Command::Get { path } => emit(&codes, &dispatcher.handle(&identity, &WebRequest::get(path))),
        Command::Submit { path, fields } => {
            let form: FormValues = fields.iter().cloned().collect();
            emit(&codes, &dispatcher.handle(&identity, &WebRequest::post(path, form)))
        }
        Command::Check { permission, on } => {
            let object = ObjectPath::new(on);
            let allowed = dispatcher
                .instance()
                .acl(&object)
                .has_permission(&identity, permission);
            println!(
                "{} {permission} on {object}",
                if allowed { "allowed" } else { "denied" }
            );
            if allowed {
                codes.success
            } else {
                codes.denied
            }
        }
    };

    std::io::stdout().flush().context("failed to flush stdout")?;
    if code != codes.success {
        std::process::exit(code);
    }
    Ok(())
}

/// Prints a web response and returns the matching exit code.
fn emit(codes: &ExitCodes, response: &Response) -> i32 {
    if response.is_success() {
        print!("{}", response.body);
        return codes.success;
    }
    eprintln!("{} {}", response.status, response.body.trim_end());
    match response.status {
        403 => codes.denied,
        404 => codes.not_found,
        400 | 405 => codes.usage,
        409 => codes.blocked,
        _ => codes.failure,
    }
}
