use console::style;
use pad::{Alignment, PadStr};
use serde::Serialize;

use std::fmt::{self, Display};

use passh::{Report, RunResult, Status};

// Maximum padding for each entry in the final statistics output
const MAX_PADDING: usize = 20;

pub fn color_report(report: &Report) -> String {
    let out = match report.status {
        Status::Ok => style(report).green().bright(),
        Status::Failed(_) => style(report).red().bright(),
        Status::Terminated => style(report).red().bright(),
        Status::SpawnFailed(_) => style(report).yellow().bright(),
        Status::Error(_) => style(report).yellow().bright(),
    };
    out.to_string()
}

#[derive(Serialize)]
pub struct RunStats {
    total: usize,
    successful: usize,
    failures: usize,
    errors: usize,
    failed: Vec<Report>,
}

impl RunStats {
    pub fn new() -> Self {
        RunStats {
            total: 0,
            successful: 0,
            failures: 0,
            errors: 0,
            failed: Vec::new(),
        }
    }

    pub fn add(&mut self, report: &Report) {
        self.total += 1;
        match report.status {
            Status::Ok => self.successful += 1,
            Status::Failed(_) | Status::Terminated => self.failures += 1,
            Status::SpawnFailed(_) | Status::Error(_) => self.errors += 1,
        }
        if !report.status.is_success() {
            self.failed.push(report.clone());
        }
    }
}

impl From<&RunResult> for RunStats {
    fn from(result: &RunResult) -> Self {
        let mut stats = RunStats::new();
        for report in result.reports() {
            stats.add(report);
        }
        stats
    }
}

fn write_stat(f: &mut fmt::Formatter, title: &str, stat: usize) -> fmt::Result {
    let fill = title.chars().count();
    f.write_str(title)?;
    f.write_str(
        &stat
            .to_string()
            .pad(MAX_PADDING - fill, '.', Alignment::Right, false),
    )?;
    f.write_str("\n")
}

impl Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = "-".repeat(MAX_PADDING + 1);

        writeln!(f, "📝 Summary")?;
        writeln!(f, "{}", separator)?;
        write_stat(f, "🖥 Hosts", self.total)?;
        write_stat(f, "✅ Successful", self.successful)?;
        write_stat(f, "🚫 Failed", self.failures)?;
        write_stat(f, "⚡ Errors", self.errors)?;

        if !self.failed.is_empty() {
            writeln!(f)?;
            writeln!(f, "Failed hosts")?;
        }
        for report in &self.failed {
            writeln!(f, "{}", color_report(report))?;
        }
        Ok(())
    }
}
