use crate::config::RunConfig;
use crate::limiter::{Limiter, Permit};
use crate::router::{OutputRouter, Route, Stream};
use crate::types::{Host, OutputMode, Report, Status, StderrMode};
use std::fs::File;
use std::io;
use std::process::Stdio;
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};

const SSH_BASE_ARGS: &[&str] = &["-T", "-o", "LogLevel=ERROR"];
const INSECURE_ARGS: &[&str] = &[
    "-o",
    "StrictHostKeyChecking=no",
    "-o",
    "UserKnownHostsFile=/dev/null",
];

/// A spawned ssh process and the permit it runs under
pub(crate) struct Running {
    child: Child,
    permit: Permit,
}

/// What a finished task hands back to the runner
#[derive(Debug)]
pub(crate) struct Outcome {
    pub(crate) report: Report,
    pub(crate) stdout: Vec<u8>,
    pub(crate) stderr: Vec<u8>,
}

impl Outcome {
    fn empty(report: Report) -> Self {
        Outcome {
            report,
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }
}

/// The ssh invocation for a single host.
///
/// `wait` needs the [`Running`] handle returned by `start`, so a task cannot
/// be waited on before it was started.
pub(crate) struct Task<'a> {
    host: Host,
    config: &'a RunConfig,
}

impl<'a> Task<'a> {
    pub(crate) fn new(host: Host, config: &'a RunConfig) -> Self {
        Task { host, config }
    }

    /// Full argv of the ssh process, program first
    pub(crate) fn argv(&self) -> Vec<String> {
        let config = self.config;
        let mut argv = vec![config.ssh_program.clone()];
        argv.extend(SSH_BASE_ARGS.iter().map(|s| s.to_string()));
        argv.push("-o".to_string());
        argv.push(format!("ConnectTimeout={}", config.connect_timeout));
        if !config.strict_host_key_checking {
            argv.extend(INSECURE_ARGS.iter().map(|s| s.to_string()));
        }
        for option in &config.ssh_options {
            argv.push("-o".to_string());
            argv.push(option.clone());
        }
        argv.push(self.host.clone());
        argv.extend(config.command.iter().cloned());
        argv
    }

    fn command(&self) -> io::Result<Command> {
        let argv = self.argv();
        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]);

        // Every process reads the input file from the start through its own handle
        let stdin = match &self.config.input {
            Some(path) => Stdio::from(File::open(path)?),
            None => Stdio::inherit(),
        };
        cmd.stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(self.config.kill_on_cancel);
        Ok(cmd)
    }

    fn routes(&self) -> (Route, Route) {
        let stdout = match self.config.output_mode {
            OutputMode::Forward => Route::Forward(Stream::Stdout),
            OutputMode::Capture => Route::Capture,
        };
        let stderr = match self.config.stderr_mode {
            StderrMode::Forward => Route::Forward(Stream::Stderr),
            StderrMode::Capture => Route::Capture,
            StderrMode::Discard => Route::Discard,
        };
        (stdout, stderr)
    }

    /// Take a permit and spawn ssh.
    ///
    /// If ssh cannot be started the task is done right away, the permit is
    /// given back and the returned status is [`Status::SpawnFailed`].
    pub(crate) async fn start(&self, limiter: &Limiter) -> Result<Running, Status> {
        let permit = limiter.acquire().await;

        match self.command().and_then(|mut cmd| cmd.spawn()) {
            Ok(child) => {
                debug!(
                    "Started ssh for {} (pid {:?}, slot {})",
                    self.host,
                    child.id(),
                    permit.slot()
                );
                Ok(Running { child, permit })
            }
            Err(e) => {
                warn!("Cannot start ssh for {}: {}", self.host, e);
                permit.release();
                Err(Status::SpawnFailed(e.to_string()))
            }
        }
    }

    /// Wait for the process to exit while draining its output.
    /// The permit is only released once both streams hit EOF.
    pub(crate) async fn wait(&self, running: Running) -> Outcome {
        let Running { mut child, permit } = running;
        let router = OutputRouter::new(&self.host);
        let (stdout_route, stderr_route) = self.routes();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (exit, stdout, stderr) = futures::join!(
            child.wait(),
            drain(&router, stdout, stdout_route),
            drain(&router, stderr, stderr_route),
        );
        permit.release();

        let (status, stdout, stderr) = match (exit, stdout, stderr) {
            (Err(e), stdout, stderr) => (
                Status::Error(e.to_string()),
                stdout.unwrap_or_default(),
                stderr.unwrap_or_default(),
            ),
            (Ok(exit), Ok(stdout), Ok(stderr)) => (Status::from(exit), stdout, stderr),
            (Ok(exit), stdout, stderr) => {
                let status = Status::from(exit);
                let status = match (&status, stdout.as_ref().err().or(stderr.as_ref().err())) {
                    (Status::Ok, Some(e)) => Status::Error(e.to_string()),
                    _ => status,
                };
                (status, stdout.unwrap_or_default(), stderr.unwrap_or_default())
            }
        };

        match &status {
            Status::Ok => debug!("{} finished", self.host),
            status => info!("{} failed: {}", self.host, status),
        }

        Outcome {
            report: Report::new(self.host.clone(), status),
            stdout,
            stderr,
        }
    }

    /// Run the task from start to finish
    pub(crate) async fn execute(self, limiter: &Limiter) -> Outcome {
        match self.start(limiter).await {
            Ok(running) => self.wait(running).await,
            Err(status) => Outcome::empty(Report::new(self.host.clone(), status)),
        }
    }
}

async fn drain<R>(router: &OutputRouter, reader: Option<R>, route: Route) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    match reader {
        Some(reader) => router.drain(reader, route).await,
        None => Ok(Vec::new()),
    }
}
