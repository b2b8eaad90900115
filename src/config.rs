use crate::types::{Host, OutputMode, StderrMode};
use crate::{ErrorKind, Result};
use derive_builder::Builder;
use std::path::{Path, PathBuf};

/// The ssh client looked up on `PATH` unless configured otherwise
pub const DEFAULT_SSH_PROGRAM: &str = "ssh";
/// Seconds ssh waits for a connection before giving up on a host
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 6;

/// Everything a run needs to know, fixed before the first task starts.
///
/// Use [`RunConfigBuilder`] to create one:
///
/// ```
/// use passh::{OutputMode, RunConfigBuilder};
///
/// let config = RunConfigBuilder::default()
///     .hosts(vec!["web1".to_string(), "web2".to_string()])
///     .command(vec!["uptime".to_string()])
///     .max_concurrency(Some(10_usize))
///     .output_mode(OutputMode::Capture)
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub(crate) hosts: Vec<Host>,
    pub(crate) command: Vec<String>,
    pub(crate) input: Option<PathBuf>,
    pub(crate) max_concurrency: Option<usize>,
    pub(crate) output_mode: OutputMode,
    pub(crate) stderr_mode: StderrMode,
    pub(crate) ssh_program: String,
    pub(crate) ssh_options: Vec<String>,
    pub(crate) connect_timeout: u64,
    pub(crate) strict_host_key_checking: bool,
    pub(crate) kill_on_cancel: bool,
}

/// Builder fields of a [`RunConfig`].
///
/// Defaults: no concurrency limit, no input file (stdin is inherited),
/// forwarded stdout and stderr, `ssh` from `PATH` with a connect timeout of
/// six seconds and host key checking disabled. Outstanding processes are
/// killed when a run is cancelled.
#[derive(Builder, Debug)]
#[builder(build_fn(skip))]
#[builder(setter(into))]
#[builder(name = "RunConfigBuilder")]
pub struct RunConfigBuilderInternal {
    /// Hosts to run on, in order. Duplicates each get their own task.
    hosts: Vec<Host>,
    /// Remote command and its arguments
    command: Vec<String>,
    /// File whose contents are fed to the stdin of every ssh process
    input: Option<PathBuf>,
    /// Maximum number of ssh processes alive at once.
    /// `None` or `Some(0)` means one per host.
    max_concurrency: Option<usize>,
    output_mode: OutputMode,
    stderr_mode: StderrMode,
    /// The ssh client binary
    ssh_program: String,
    /// Extra `-o` options handed to ssh
    ssh_options: Vec<String>,
    connect_timeout: u64,
    /// Verify remote host keys against `known_hosts`
    strict_host_key_checking: bool,
    /// Kill running ssh processes when the run is dropped before completion
    kill_on_cancel: bool,
}

impl RunConfigBuilder {
    pub fn build(&mut self) -> Result<RunConfig> {
        let hosts = self.hosts.clone().unwrap_or_default();
        if let Some(pos) = hosts.iter().position(|h| h.trim().is_empty()) {
            return Err(ErrorKind::EmptyHost(pos));
        }

        let command = self.command.clone().unwrap_or_default();
        if command.is_empty() {
            return Err(ErrorKind::MissingCommand);
        }

        let ssh_program = self
            .ssh_program
            .clone()
            .unwrap_or_else(|| DEFAULT_SSH_PROGRAM.to_string());
        if ssh_program.is_empty() {
            return Err(ErrorKind::InvalidConfig("ssh program is empty".to_string()));
        }

        // Zero is how the command line spells "unlimited"
        let max_concurrency = self
            .max_concurrency
            .unwrap_or(None)
            .filter(|&limit| limit > 0);

        Ok(RunConfig {
            hosts,
            command,
            input: self.input.clone().unwrap_or(None),
            max_concurrency,
            output_mode: self.output_mode.unwrap_or_default(),
            stderr_mode: self.stderr_mode.unwrap_or_default(),
            ssh_program,
            ssh_options: self.ssh_options.clone().unwrap_or_default(),
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            strict_host_key_checking: self.strict_host_key_checking.unwrap_or(false),
            kill_on_cancel: self.kill_on_cancel.unwrap_or(true),
        })
    }
}

impl RunConfig {
    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn input(&self) -> Option<&Path> {
        self.input.as_deref()
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    pub fn stderr_mode(&self) -> StderrMode {
        self.stderr_mode
    }

    pub fn kill_on_cancel(&self) -> bool {
        self.kill_on_cancel
    }

    /// Number of permits in the pool: the configured limit, capped at one
    /// per host, and never less than one.
    pub fn concurrency(&self) -> usize {
        let hosts = self.hosts.len().max(1);
        match self.max_concurrency {
            Some(limit) => limit.min(hosts),
            None => hosts,
        }
    }
}
