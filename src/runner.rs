use crate::config::RunConfig;
use crate::limiter::Limiter;
use crate::result::RunResult;
use crate::task::Task;
use crate::{ErrorKind, Result};
use futures::future::join_all;
use std::{fs, io};

/// Runs the configured command on every host.
///
/// All tasks are futures polled from a single task, so nothing in a run
/// needs to be `Send`. The ssh processes themselves run in parallel, at most
/// [`RunConfig::concurrency`] at a time.
#[derive(Debug, Clone)]
pub struct Runner {
    config: RunConfig,
}

impl Runner {
    pub fn new(config: RunConfig) -> Self {
        Runner { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run on all hosts, blocking the current thread until every host is done.
    ///
    /// This creates its own single-threaded runtime and therefore must not
    /// be called from within an async context; use [`Runner::wait`] there.
    pub fn run(&self) -> Result<RunResult> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ErrorKind::Runtime)?;
        runtime.block_on(self.wait())
    }

    /// Run on all hosts and resolve once every host is done.
    ///
    /// An unreadable input file fails the whole run before any process is
    /// spawned. Dropping the returned future early kills the ssh processes
    /// still running, unless `kill_on_cancel` was disabled.
    pub async fn wait(&self) -> Result<RunResult> {
        self.check_input()?;

        let hosts = self.config.hosts();
        if hosts.is_empty() {
            debug!("No hosts given, nothing to do");
            return Ok(RunResult::default());
        }

        let limiter = Limiter::new(self.config.concurrency());
        info!(
            "Running {:?} on {} host(s), {} at a time",
            self.config.command(),
            hosts.len(),
            limiter.capacity()
        );

        let tasks = hosts
            .iter()
            .map(|host| Task::new(host.clone(), &self.config).execute(&limiter));
        let outcomes = join_all(tasks).await;

        Ok(RunResult::new(
            outcomes,
            self.config.output_mode(),
            self.config.stderr_mode(),
        ))
    }

    fn check_input(&self) -> Result<()> {
        let path = match self.config.input() {
            Some(path) => path,
            None => return Ok(()),
        };
        let metadata = fs::metadata(path).map_err(|e| ErrorKind::InputFile(path.to_path_buf(), e))?;
        if metadata.is_dir() {
            return Err(ErrorKind::InputFile(
                path.to_path_buf(),
                io::Error::new(io::ErrorKind::Other, "is a directory"),
            ));
        }
        fs::File::open(path).map_err(|e| ErrorKind::InputFile(path.to_path_buf(), e))?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::{fake_ssh, run_config};
    use crate::{OutputMode, Status, StderrMode};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::path::Path;
    use std::time::Duration;

    fn outputs(pairs: &[(&str, &[u8])]) -> HashMap<String, Vec<u8>> {
        pairs
            .iter()
            .map(|(host, out)| (host.to_string(), out.to_vec()))
            .collect()
    }

    #[tokio::test]
    async fn test_capture_echo() {
        let config = run_config(&fake_ssh(), &["h1", "h2"], "echo hello")
            .output_mode(OutputMode::Capture)
            .build()
            .unwrap();

        let result = Runner::new(config).wait().await.unwrap();
        assert!(result.is_success());
        assert_eq!(
            result.outputs(),
            &outputs(&[("h1", b"hello\n"), ("h2", b"hello\n")])
        );
    }

    #[tokio::test]
    async fn test_one_host_fails() {
        let config = run_config(
            &fake_ssh(),
            &["h1", "h2"],
            "echo $PASSH_TEST_HOST; test $PASSH_TEST_HOST != h1",
        )
        .output_mode(OutputMode::Capture)
        .build()
        .unwrap();

        let result = Runner::new(config).wait().await.unwrap();
        assert!(!result.is_success());
        assert_eq!(result.failed_hosts(), vec!["h1"]);
        assert_eq!(result.reports()[0].status, Status::Failed(1));
        assert_eq!(result.reports()[1].status, Status::Ok);
        assert_eq!(
            result.outputs(),
            &outputs(&[("h1", b"h1\n"), ("h2", b"h2\n")])
        );
    }

    #[tokio::test]
    async fn test_empty_hosts() {
        let config = run_config(Path::new("/nonexistent/ssh"), &[], "echo hello")
            .output_mode(OutputMode::Capture)
            .build()
            .unwrap();

        let result = Runner::new(config).wait().await.unwrap();
        assert!(result.is_success());
        assert!(result.outputs().is_empty());
        assert!(result.reports().is_empty());
    }

    #[tokio::test]
    async fn test_concurrency_limit() {
        let dir = tempfile::tempdir().unwrap();
        let running = dir.path().join("running");
        let log = dir.path().join("log");
        fs::create_dir(&running).unwrap();

        // Every process registers itself, records how many are registered and
        // deregisters before it exits
        let script = format!(
            "touch {running}/$$; ls {running} | wc -l >> {log}; sleep 0.2; rm {running}/$$",
            running = running.display(),
            log = log.display()
        );
        let hosts = ["h1", "h2", "h3", "h4", "h5", "h6"];
        let config = run_config(&fake_ssh(), &hosts, &script)
            .max_concurrency(Some(2_usize))
            .build()
            .unwrap();

        let result = Runner::new(config).wait().await.unwrap();
        assert!(result.is_success());

        let counts: Vec<usize> = fs::read_to_string(&log)
            .unwrap()
            .lines()
            .map(|l| l.trim().parse().unwrap())
            .collect();
        assert_eq!(counts.len(), hosts.len());
        let max = counts.into_iter().max().unwrap();
        assert!(max >= 1 && max <= 2, "saw {} processes at once", max);
    }

    #[tokio::test]
    async fn test_missing_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("spawned");
        let input = dir.path().join("does-not-exist");
        let config = run_config(
            &fake_ssh(),
            &["h1", "h2"],
            &format!("touch {}", marker.display()),
        )
        .input(input.clone())
        .build()
        .unwrap();

        let err = Runner::new(config).wait().await.unwrap_err();
        assert!(matches!(err, ErrorKind::InputFile(ref path, _) if path == &input));
        assert!(!marker.exists(), "no process may be spawned");
    }

    #[tokio::test]
    async fn test_input_file_is_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("payload");
        fs::write(&input, b"line one\nline two\n").unwrap();
        let config = run_config(&fake_ssh(), &["h1", "h2"], "cat")
            .input(input)
            .output_mode(OutputMode::Capture)
            .build()
            .unwrap();

        let result = Runner::new(config).wait().await.unwrap();
        assert!(result.is_success());
        assert_eq!(
            result.outputs(),
            &outputs(&[
                ("h1", b"line one\nline two\n"),
                ("h2", b"line one\nline two\n")
            ])
        );
    }

    #[tokio::test]
    async fn test_partial_last_line_captured() {
        let config = run_config(&fake_ssh(), &["h1"], "printf 'a\\nb'")
            .output_mode(OutputMode::Capture)
            .build()
            .unwrap();

        let result = Runner::new(config).wait().await.unwrap();
        assert_eq!(result.outputs(), &outputs(&[("h1", b"a\nb")]));
    }

    #[tokio::test]
    async fn test_stderr_captured_separately() {
        let config = run_config(&fake_ssh(), &["h1"], "echo out; echo err >&2")
            .output_mode(OutputMode::Capture)
            .stderr_mode(StderrMode::Capture)
            .build()
            .unwrap();

        let result = Runner::new(config).wait().await.unwrap();
        assert_eq!(result.outputs(), &outputs(&[("h1", b"out\n")]));
        assert_eq!(result.errors(), &outputs(&[("h1", b"err\n")]));
    }

    #[tokio::test]
    async fn test_spawn_failure_does_not_abort_others() {
        let config = run_config(Path::new("/nonexistent/ssh"), &["h1", "h2"], "true")
            .output_mode(OutputMode::Capture)
            .build()
            .unwrap();

        let result = Runner::new(config).wait().await.unwrap();
        assert!(!result.is_success());
        assert_eq!(result.reports().len(), 2);
        assert!(result
            .reports()
            .iter()
            .all(|r| matches!(r.status, Status::SpawnFailed(_))));
        assert_eq!(result.outputs(), &outputs(&[("h1", b""), ("h2", b"")]));
    }

    #[test]
    fn test_blocking_run_is_repeatable() {
        let config = run_config(&fake_ssh(), &["h1", "h2", "h1"], "echo same")
            .output_mode(OutputMode::Capture)
            .build()
            .unwrap();
        let runner = Runner::new(config);

        let first = runner.run().unwrap();
        let second = runner.run().unwrap();
        assert!(first.is_success());
        assert_eq!(first.reports().len(), 3);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_cancel_kills_processes() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("finished");
        let config = run_config(
            &fake_ssh(),
            &["h1"],
            &format!("sleep 1; touch {}", marker.display()),
        )
        .build()
        .unwrap();
        let runner = Runner::new(config);

        let cancelled = tokio::time::timeout(Duration::from_millis(200), runner.wait()).await;
        assert!(cancelled.is_err());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists(), "cancelled process kept running");
    }

    #[tokio::test]
    async fn test_cancel_detaches_processes() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("finished");
        let config = run_config(
            &fake_ssh(),
            &["h1"],
            &format!("sleep 1; touch {}", marker.display()),
        )
        .kill_on_cancel(false)
        .build()
        .unwrap();
        let runner = Runner::new(config);

        let cancelled = tokio::time::timeout(Duration::from_millis(200), runner.wait()).await;
        assert!(cancelled.is_err());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(marker.exists(), "detached process did not run to completion");
    }

    #[tokio::test]
    async fn test_permit_held_until_output_drained() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log");
        // h1 exits right away, but a background child keeps its stdout open
        let script = format!(
            "if [ $PASSH_TEST_HOST = h1 ]; then \
             (sleep 0.3; echo late; echo h1-drained >> {log}) & echo early; \
             else echo h2-started >> {log}; fi",
            log = log.display()
        );
        let config = run_config(&fake_ssh(), &["h1", "h2"], &script)
            .max_concurrency(Some(1_usize))
            .output_mode(OutputMode::Capture)
            .build()
            .unwrap();

        let result = Runner::new(config).wait().await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.outputs()["h1"], b"early\nlate\n".to_vec());
        assert_eq!(
            fs::read_to_string(&log).unwrap(),
            "h1-drained\nh2-started\n"
        );
    }
}
