use anyhow::anyhow;
use serde::{Deserialize, Serialize, Serializer};
use std::{fmt::Display, process::ExitStatus, str::FromStr};

/// A remote host as given on the command line (name or address)
pub type Host = String;

/// Exit code reported for hosts whose process never produced one
pub const SENTINEL_EXIT_CODE: i32 = -1;

/// How the standard output of the remote command is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Print every line as `[host] line` while the command runs
    Forward,
    /// Keep the raw bytes in memory until the run is over
    Capture,
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::Forward
    }
}

/// What happens to the standard error of the remote command.
///
/// This is independent of [`OutputMode`], so stderr can still be printed
/// live while stdout is captured (which is the default).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StderrMode {
    /// Print every line as `[host] line` to the local stderr
    Forward,
    /// Keep the raw bytes, separately from stdout
    Capture,
    /// Drop it
    Discard,
}

impl Default for StderrMode {
    fn default() -> Self {
        StderrMode::Forward
    }
}

impl FromStr for StderrMode {
    type Err = anyhow::Error;
    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode.to_lowercase().as_ref() {
            "forward" => Ok(StderrMode::Forward),
            "capture" => Ok(StderrMode::Capture),
            "discard" => Ok(StderrMode::Discard),
            _ => Err(anyhow!(
                "Only `forward`, `capture` and `discard` allowed, got {}",
                mode
            )),
        }
    }
}

/// Terminal status of the task of one host
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum Status {
    /// The remote command exited with 0
    Ok,
    /// The remote command (or ssh itself) exited with a non-zero code
    Failed(i32),
    /// The ssh process was killed by a signal
    Terminated,
    /// The ssh process could not be started
    SpawnFailed(String),
    /// Low-level error while waiting for the process or reading its output
    Error(String),
}

impl Status {
    pub fn is_success(&self) -> bool {
        matches!(self, Status::Ok)
    }

    /// The exit code, or [`SENTINEL_EXIT_CODE`] if the process has none
    pub fn code(&self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::Failed(code) => *code,
            _ => SENTINEL_EXIT_CODE,
        }
    }

    pub fn icon(&self) -> &str {
        match self {
            Status::Ok => "✅",
            Status::Failed(_) => "🚫",
            Status::Terminated => "💀",
            Status::SpawnFailed(_) => "⚡",
            Status::Error(_) => "⚡",
        }
    }
}

impl From<ExitStatus> for Status {
    fn from(status: ExitStatus) -> Self {
        match status.code() {
            Some(0) => Status::Ok,
            Some(code) => Status::Failed(code),
            None => Status::Terminated,
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Ok => write!(f, "OK"),
            Status::Failed(c) => write!(f, "Failed ({})", c),
            Status::Terminated => write!(f, "Terminated by signal"),
            Status::SpawnFailed(e) => write!(f, "Cannot start ssh ({})", e),
            Status::Error(e) => write!(f, "Runtime error ({})", e),
        }
    }
}

impl Serialize for Status {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Outcome of the task of one host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub host: Host,
    pub status: Status,
}

impl Report {
    pub fn new(host: Host, status: Status) -> Self {
        Report { host, status }
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ({})", self.status.icon(), self.host, self.status)
    }
}
