/*!
 * `passh` runs a command over SSH on many hosts in parallel.
 *
 * One `ssh` process is spawned per host, with a configurable cap on how
 * many are alive at once. Output is either forwarded live, every line
 * prefixed with `[host] `, or captured per host for use after the run.
 *
 * ```no_run
 * use passh::{OutputMode, RunConfigBuilder, Runner};
 *
 * #[tokio::main]
 * async fn main() -> Result<(), Box<dyn std::error::Error>> {
 *     let config = RunConfigBuilder::default()
 *         .hosts(vec!["web1".to_string(), "web2".to_string()])
 *         .command(vec!["uname".to_string(), "-r".to_string()])
 *         .output_mode(OutputMode::Capture)
 *         .build()?;
 *     let result = Runner::new(config).wait().await?;
 *     for (host, output) in result.outputs() {
 *         println!("{}: {}", host, String::from_utf8_lossy(output));
 *     }
 *     Ok(())
 * }
 * ```
 */
#[macro_use]
extern crate log;

mod config;
mod error;
mod limiter;
mod result;
mod router;
mod runner;
mod task;
mod types;

#[cfg(test)]
mod test_utils;

pub use config::{RunConfig, RunConfigBuilder, DEFAULT_CONNECT_TIMEOUT, DEFAULT_SSH_PROGRAM};
pub use error::{ErrorKind, Result};
pub use limiter::{Limiter, Permit};
pub use result::RunResult;
pub use runner::Runner;
pub use types::*;
