use crate::task::Outcome;
use crate::types::{Host, OutputMode, Report, StderrMode};
use std::collections::HashMap;

/// Aggregate outcome of a run over all hosts
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunResult {
    reports: Vec<Report>,
    outputs: HashMap<Host, Vec<u8>>,
    errors: HashMap<Host, Vec<u8>>,
}

impl RunResult {
    /// Collect the outcomes of all tasks, given in configuration order.
    /// Output of a host listed more than once is the one of its last task.
    pub(crate) fn new(
        outcomes: Vec<Outcome>,
        output_mode: OutputMode,
        stderr_mode: StderrMode,
    ) -> Self {
        let mut result = RunResult::default();
        for outcome in outcomes {
            if output_mode == OutputMode::Capture {
                result
                    .outputs
                    .insert(outcome.report.host.clone(), outcome.stdout);
            }
            if stderr_mode == StderrMode::Capture {
                result
                    .errors
                    .insert(outcome.report.host.clone(), outcome.stderr);
            }
            result.reports.push(outcome.report);
        }
        result
    }

    /// True iff every host exited with status 0.
    /// A run over no hosts is successful.
    pub fn is_success(&self) -> bool {
        self.reports.iter().all(|r| r.status.is_success())
    }

    /// One report per task, in configuration order
    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    /// Captured stdout of every host. Empty unless stdout was captured.
    pub fn outputs(&self) -> &HashMap<Host, Vec<u8>> {
        &self.outputs
    }

    /// Captured stderr of every host. Empty unless stderr was captured.
    pub fn errors(&self) -> &HashMap<Host, Vec<u8>> {
        &self.errors
    }

    /// Hosts whose task did not succeed, in configuration order
    pub fn failed_hosts(&self) -> Vec<&Host> {
        self.reports
            .iter()
            .filter(|r| !r.status.is_success())
            .map(|r| &r.host)
            .collect()
    }
}
