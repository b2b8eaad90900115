#![cfg(test)]

use crate::RunConfigBuilder;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Path of a script that behaves like ssh but runs the command locally
pub(crate) fn fake_ssh() -> PathBuf {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join("fake-ssh");
    // The executable bit does not survive every checkout
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A builder for running `script` through `ssh` on `hosts`
pub(crate) fn run_config(ssh: &Path, hosts: &[&str], script: &str) -> RunConfigBuilder {
    let mut builder = RunConfigBuilder::default();
    builder
        .hosts(hosts.iter().map(|h| h.to_string()).collect::<Vec<_>>())
        .command(vec![script.to_string()])
        .ssh_program(ssh.to_string_lossy().into_owned());
    builder
}
