//! Run summary
//!
//! Aggregates terminal outcomes once every job has finished and writes the
//! closing report to the log.

use crate::jobs::{format_elapsed, JobOutcome, JobReport, RunLayout};
use std::time::Duration;
use tracing::{info, warn};

/// Aggregate counters of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Files discovered (and launched)
    pub total: usize,
    /// Success plus SuccessButArchivalFailed
    pub succeeded: usize,
    pub failed: usize,
    /// Successes whose original could not be archived
    pub archival_warnings: usize,
}

impl RunSummary {
    /// Count one terminal outcome
    pub fn record(&mut self, outcome: JobOutcome) {
        self.total += 1;
        match outcome {
            JobOutcome::Success => self.succeeded += 1,
            JobOutcome::SuccessButArchivalFailed => {
                self.succeeded += 1;
                self.archival_warnings += 1;
            }
            JobOutcome::Failed => self.failed += 1,
        }
    }

    pub fn from_reports(reports: &[JobReport]) -> Self {
        let mut summary = Self::default();
        for report in reports {
            summary.record(report.outcome);
        }
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} processed, {} succeeded, {} failed",
            self.total, self.succeeded, self.failed
        )
    }
}

/// Log the closing summary
pub fn report_summary(summary: &RunSummary, layout: &RunLayout, elapsed: Duration) {
    info!(
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Conversion finished: {}",
        summary
    );
    if summary.archival_warnings > 0 {
        warn!(
            "{} converted file(s) could not be moved to {}",
            summary.archival_warnings,
            layout.done_dir.display()
        );
    }
    info!("Converted files: {}", layout.output_dir.display());
    info!("Originals: {}", layout.done_dir.display());
    info!("Total time: {}", format_elapsed(elapsed));
}
