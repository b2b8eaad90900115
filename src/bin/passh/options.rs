use anyhow::{anyhow, Error, Result};
use lazy_static::lazy_static;
use passh::{Host, StderrMode, DEFAULT_CONNECT_TIMEOUT, DEFAULT_SSH_PROGRAM};
use serde::Deserialize;
use std::str::FromStr;
use std::{fs, io::ErrorKind, path::PathBuf};
use structopt::{clap::AppSettings, StructOpt};

const PROCS: usize = 50;

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    String,
    Json,
}

impl FromStr for Format {
    type Err = Error;
    fn from_str(format: &str) -> Result<Self, Self::Err> {
        match format {
            "string" => Ok(Format::String),
            "json" => Ok(Format::Json),
            _ => Err(anyhow!("Could not parse format {}", format)),
        }
    }
}

impl Default for Format {
    fn default() -> Self {
        Format::String
    }
}

// this exists because structopt requires `&str` type values for defaults
// (we can't use e.g. `PROCS` or `procs()` which gets created for serde)
lazy_static! {
    static ref PROCS_STR: String = PROCS.to_string();
    static ref CONNECT_TIMEOUT_STR: String = DEFAULT_CONNECT_TIMEOUT.to_string();
}

// Macro for generating default functions to be used by serde
macro_rules! default_function {
    ( $( $name:ident : $T:ty = $e:expr; )* ) => {
        $(
            fn $name() -> $T {
                $e
            }
        )*
    };
}

// Generate the functions for serde defaults
default_function! {
    procs: usize = PROCS;
    ssh: String = DEFAULT_SSH_PROGRAM.to_string();
    connect_timeout: u64 = DEFAULT_CONNECT_TIMEOUT;
    stderr: StderrMode = StderrMode::Forward;
}

// Macro for merging configuration values
macro_rules! fold_in {
    ( $cli:ident , $toml:ident ; $( $key:ident : $default:expr; )* ) => {
        $(
            if $cli.$key == $default && $toml.$key != $default {
                $cli.$key = $toml.$key;
            }
        )*
    };
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "passh",
    about = "Run a command over SSH on many hosts in parallel.",
    setting = AppSettings::TrailingVarArg
)]
pub(crate) struct PasshOptions {
    /// Comma-separated list of hosts, e.g. `web1,web2,db1`.
    /// Order is kept and duplicates run once per occurrence.
    #[structopt(name = "hosts")]
    raw_hosts: String,

    /// The remote command and its arguments.
    /// Everything after the first word is passed on as is.
    #[structopt(name = "command", required = true, min_values = 1)]
    pub command: Vec<String>,

    /// File sent as standard input to every host
    #[structopt(short, long, parse(from_os_str))]
    input: Option<PathBuf>,

    /// Configuration file to use
    #[structopt(short, long = "config", default_value = "./passh.toml")]
    pub config_file: String,

    #[structopt(flatten)]
    pub config: Config,
}

impl PasshOptions {
    /// Hosts in command line order, without empty entries
    pub(crate) fn hosts(&self) -> Vec<Host> {
        split_hosts(&self.raw_hosts)
    }

    /// Input file with `~` and environment variables expanded
    pub(crate) fn input(&self) -> Result<Option<PathBuf>> {
        match &self.input {
            Some(path) => {
                let path = path.to_string_lossy();
                let expanded = shellexpand::full(&path)?;
                Ok(Some(PathBuf::from(expanded.as_ref())))
            }
            None => Ok(None),
        }
    }
}

fn split_hosts(raw: &str) -> Vec<Host> {
    raw.split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Debug, Deserialize, StructOpt)]
pub struct Config {
    /// Print the status of every host and a summary to stderr
    #[structopt(short, long)]
    #[serde(default)]
    pub verbose: bool,

    /// Maximum number of ssh processes running at once (0 = no limit)
    #[structopt(short = "n", long, default_value = &PROCS_STR)]
    #[serde(default = "procs")]
    pub procs: usize,

    /// The ssh client to run
    #[structopt(long, env = "PASSH_SSH", default_value = DEFAULT_SSH_PROGRAM)]
    #[serde(default = "ssh")]
    pub ssh: String,

    /// Extra ssh options, as given to `ssh -o` (e.g. `Port=2222`)
    #[structopt(short = "o", long = "ssh-option", number_of_values = 1)]
    #[serde(default)]
    pub ssh_options: Vec<String>,

    /// Seconds to wait for the connection to a host
    #[structopt(long, default_value = &CONNECT_TIMEOUT_STR)]
    #[serde(default = "connect_timeout")]
    pub connect_timeout: u64,

    /// Check remote host keys against the known hosts file
    #[structopt(long)]
    #[serde(default)]
    pub strict_host_key_checking: bool,

    /// Collect stdout of every host and print it grouped by host once all
    /// hosts are done, instead of printing lines as they arrive
    #[structopt(long)]
    #[serde(default)]
    pub capture: bool,

    /// What to do with stderr of the remote command (forward, capture, discard)
    #[structopt(long, default_value = "forward")]
    #[serde(default = "stderr")]
    pub stderr: StderrMode,

    /// Output format of the summary (string, json)
    #[structopt(short, long, default_value = "string")]
    #[serde(default)]
    pub format: Format,
}

impl Config {
    /// Load configuration from a file
    pub(crate) fn load_from_file(path: &str) -> Result<Option<Config>> {
        // Read configuration file
        let result = fs::read(path);

        // Ignore a file not found error
        let contents = match result {
            Ok(c) => c,
            Err(e) => {
                return match e.kind() {
                    ErrorKind::NotFound => Ok(None),
                    _ => Err(Error::from(e)),
                }
            }
        };

        Ok(Some(toml::from_slice(&contents)?))
    }

    /// Merge the configuration from TOML into the CLI configuration
    pub(crate) fn merge(&mut self, toml: Config) {
        fold_in! {
            // Destination and source configs
            self, toml;

            // Keys with defaults to assign
            verbose: false;
            procs: PROCS;
            ssh: DEFAULT_SSH_PROGRAM;
            ssh_options: Vec::<String>::new();
            connect_timeout: DEFAULT_CONNECT_TIMEOUT;
            strict_host_key_checking: false;
            capture: false;
            stderr: StderrMode::Forward;
            format: Format::String;
        }
    }
}
