//! Shared E2E test helpers for `warden` binary tests.

use assert_cmd::cargo::cargo_bin_cmd;
use std::path::Path;
use std::time::Duration;

/// Default timeout for CLI tests.
pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Environment overrides the loader honours; removed so the host
/// environment cannot leak into a test.
const WARDEN_VARS: &[&str] = &[
    "WARDEN_PERMISSION_MANAGE_ENABLED",
    "WARDEN_PERMISSION_SYSTEM_READ_ENABLED",
    "WARDEN_ANONYMOUS_READ",
    "WARDEN_SECURITY_STRATEGY",
    "WARDEN_LOG_LEVEL",
    "RUST_LOG",
];

/// A minimal instance: MANAGE on, an admin, a managers group, a reader,
/// one label and a two-plugin chain.
pub const BASE_CONFIG: &str = r#"
[permissions]
manage_enabled = true

[[security.grants]]
subject = "admin"
kind = "user"
permissions = ["overall.Administer"]

[[security.grants]]
subject = "managers"
kind = "group"
permissions = ["overall.Read", "overall.Manage"]

[[security.grants]]
subject = "reader"
permissions = ["overall.Read"]

[labels.linux]
description = "linux builders"

[[plugins.installed]]
id = "scm-api"
version = "2.6"

[[plugins.installed]]
id = "git"
version = "5.2"

[[plugins.installed.dependencies]]
target = "scm-api"
"#;

/// Writes `content` as `config.toml` under `dir`.
pub fn write_config(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, content).expect("write config");
    path
}

/// Builds a `warden` command bound to `config`, ignoring the global file.
pub fn warden_cmd(config: &Path) -> assert_cmd::Command {
    let mut cmd: assert_cmd::Command = cargo_bin_cmd!("warden");
    cmd.timeout(TIMEOUT);
    for var in WARDEN_VARS {
        cmd.env_remove(var);
    }
    cmd.arg("--no-global-config")
        .arg("--config")
        .arg(config.to_str().expect("valid utf8"));
    cmd
}

/// Same as [`warden_cmd`] over a fresh temp dir holding [`BASE_CONFIG`].
/// Keep the guard alive for the test's duration.
pub fn base_cmd() -> (assert_cmd::Command, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let path = write_config(tmp.path(), BASE_CONFIG);
    (warden_cmd(&path), tmp)
}
