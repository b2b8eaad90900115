#[macro_use]
extern crate log;

use anyhow::{Context, Result};
use console::style;
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use structopt::StructOpt;

mod options;
mod stats;

use crate::options::{Config, Format, PasshOptions};
use crate::stats::{color_report, RunStats};

use passh::{Host, OutputMode, RunConfigBuilder, RunResult, Runner, StderrMode};

/// A C-like enum that can be cast to `i32` and used as process exit code.
enum ExitCode {
    Success = 0,
    // NOTE: exit code 1 is used for any `Result::Err` bubbled up to `main()` using the `?` operator.
    // This covers everything that stops the run before any host is contacted
    // (unreadable input file, bad configuration).
    #[allow(unused)]
    UnexpectedFailure = 1,
    HostFailure = 2,
}

fn main() -> Result<()> {
    pretty_env_logger::init();
    // std::process::exit doesn't guarantee that all destructors will be ran,
    // therefore we wrap "main" code in another function to guarantee that.
    // See: https://doc.rust-lang.org/stable/std/process/fn.exit.html
    let exit_code = run_main()?;
    std::process::exit(exit_code);
}

fn run_main() -> Result<i32> {
    let mut opts = PasshOptions::from_args();

    // Load a potentially existing config file and merge it into the config from the CLI
    if let Some(c) = Config::load_from_file(&opts.config_file)
        .with_context(|| format!("Cannot load configuration from {}", opts.config_file))?
    {
        info!("Using configuration from {}", opts.config_file);
        opts.config.merge(c)
    }
    let cfg = &opts.config;

    let output_mode = if cfg.capture {
        OutputMode::Capture
    } else {
        OutputMode::Forward
    };
    let config = RunConfigBuilder::default()
        .hosts(opts.hosts())
        .command(opts.command.clone())
        .input(opts.input()?)
        .max_concurrency(Some(cfg.procs))
        .output_mode(output_mode)
        .stderr_mode(cfg.stderr)
        .ssh_program(cfg.ssh.clone())
        .ssh_options(cfg.ssh_options.clone())
        .connect_timeout(cfg.connect_timeout)
        .strict_host_key_checking(cfg.strict_host_key_checking)
        .build()?;

    let result = Runner::new(config).run()?;

    if cfg.capture {
        show_captured(&result, result.outputs(), &mut io::stdout())?;
    }
    if cfg.stderr == StderrMode::Capture {
        show_captured(&result, result.errors(), &mut io::stderr())?;
    }
    if cfg.verbose {
        show_summary(&result, &cfg.format)?;
    }

    if result.is_success() {
        return Ok(ExitCode::Success as i32);
    }
    let failed: Vec<&str> = result.failed_hosts().into_iter().map(Host::as_str).collect();
    eprintln!("failed at: {}", failed.join(" "));
    Ok(ExitCode::HostFailure as i32)
}

/// Print captured bytes grouped by host, in command line order
fn show_captured<W: Write>(
    result: &RunResult,
    captured: &HashMap<Host, Vec<u8>>,
    out: &mut W,
) -> Result<()> {
    let mut seen = HashSet::new();
    for report in result.reports() {
        // Duplicate hosts share one entry
        if !seen.insert(&report.host) {
            continue;
        }
        let bytes = match captured.get(&report.host) {
            Some(bytes) => bytes,
            None => continue,
        };
        writeln!(out, "{}", style(format!("==> {} <==", report.host)).bold())?;
        out.write_all(bytes)?;
        if !bytes.is_empty() && !bytes.ends_with(b"\n") {
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn fmt(stats: &RunStats, format: &Format) -> Result<String> {
    Ok(match format {
        Format::String => stats.to_string(),
        Format::Json => serde_json::to_string_pretty(&stats)?,
    })
}

/// Remote output owns stdout, so the summary goes to stderr
fn show_summary(result: &RunResult, format: &Format) -> Result<()> {
    let stats = RunStats::from(result);
    if *format == Format::String {
        for report in result.reports() {
            eprintln!("{}", color_report(report));
        }
        eprintln!();
    }
    eprintln!("{}", fmt(&stats, format)?);
    Ok(())
}
