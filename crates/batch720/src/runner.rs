//! Run orchestration
//!
//! Provides the startup sequence and the single pass over the input
//! directory: discover, admit each file in order, wait for every job, report.

use crate::concurrency::{derive_plan, ConcurrencyPlan};
use crate::config::Config;
use crate::encode::{remove_partial_output, EncoderProfile};
use crate::job_executor::JobExecutor;
use crate::jobs::{Job, JobOutcome, JobReport, RunLayout};
use crate::scan::discover_videos;
use crate::startup::{run_startup_checks, StartupError};
use crate::summary::{report_summary, RunSummary};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::AcquireError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Error type for run-level failures
///
/// Per-file problems never show up here; they become job outcomes.
#[derive(Debug, Error)]
pub enum RunError {
    /// Startup check failed
    #[error("Startup check failed: {0}")]
    Startup(#[from] StartupError),

    /// Input directory could not be listed
    #[error("Failed to scan input directory: {0}")]
    Scan(#[from] walkdir::Error),

    /// The admission semaphore was closed
    #[error("Job admission failed: {0}")]
    Admission(#[from] AcquireError),
}

/// Result of a complete run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    /// Job reports in discovery order
    pub jobs: Vec<JobReport>,
    pub elapsed: Duration,
}

impl RunReport {
    /// Process exit status: 0 when nothing failed, 2 when at least one file failed
    pub fn exit_status(&self) -> u8 {
        if self.summary.has_failures() {
            2
        } else {
            0
        }
    }
}

/// Runner state containing all runtime components
pub struct Runner {
    /// Configuration loaded from file and environment
    pub config: Config,
    /// Resolved directories
    pub layout: RunLayout,
    /// Derived concurrency plan
    pub concurrency_plan: ConcurrencyPlan,
    /// Job executor for processing encoding jobs
    pub executor: Arc<JobExecutor>,
}

impl Runner {
    /// Initialize the runner
    ///
    /// This performs the full startup sequence:
    /// 1. Resolve directories against `input_dir`
    /// 2. Create output and done directories
    /// 3. Probe the encoder and select the primary profile
    /// 4. Derive the concurrency plan (`jobs_override` > 0 replaces the ceiling)
    ///
    /// Nothing in `input_dir` is touched when this fails.
    pub fn new(config: Config, input_dir: &Path, jobs_override: u32) -> Result<Self, RunError> {
        let layout = RunLayout::resolve(input_dir, &config.directories);

        let profile = run_startup_checks(&config.encoder, &layout.output_dir, &layout.done_dir)?;

        let concurrency_plan = derive_plan(&config).with_job_override(jobs_override);

        Ok(Self::with_profile(config, layout, concurrency_plan, profile))
    }

    /// Initialize the runner without running startup checks
    ///
    /// The caller supplies the primary profile and is responsible for the
    /// output and done directories existing.
    pub fn with_profile(
        config: Config,
        layout: RunLayout,
        concurrency_plan: ConcurrencyPlan,
        profile: EncoderProfile,
    ) -> Self {
        let executor = Arc::new(JobExecutor::new(
            &concurrency_plan,
            profile,
            &config.encoder,
        ));

        Self {
            config,
            layout,
            concurrency_plan,
            executor,
        }
    }

    /// Primary profile selected for this run
    pub fn profile(&self) -> &EncoderProfile {
        self.executor.primary_profile()
    }

    /// Process every video in the input directory once
    ///
    /// Jobs are launched in discovery order; launching blocks while the
    /// admission ceiling is reached. The summary is only computed after every
    /// launched job has reported.
    pub async fn run(&self) -> Result<RunReport, RunError> {
        let started = Instant::now();

        let videos = discover_videos(&self.layout.input_dir)?;
        if videos.is_empty() {
            info!("No video files found in {}", self.layout.input_dir.display());
            let report = RunReport {
                summary: RunSummary::default(),
                jobs: Vec::new(),
                elapsed: started.elapsed(),
            };
            report_summary(&report.summary, &self.layout, report.elapsed);
            return Ok(report);
        }

        info!(
            "Converting {} file(s) with {}, up to {} at a time",
            videos.len(),
            self.profile(),
            self.concurrency_plan.max_concurrent_jobs
        );

        // Output paths already owned by an earlier job in this run
        let mut claimed: HashSet<PathBuf> = HashSet::with_capacity(videos.len());
        let mut pending = Vec::with_capacity(videos.len());
        for video in &videos {
            let Some(job) = Job::describe(video, &self.layout) else {
                warn!("Skipping {}: no file name", video.display());
                continue;
            };

            if !claimed.insert(job.output_path.clone()) {
                error!(
                    file = %job.name(),
                    "Not converting {}: output {} is already produced by another file in this run",
                    job.name(),
                    job.output_path.display()
                );
                pending.push(Pending::Rejected(job.finish(JobOutcome::Failed)));
                continue;
            }

            let descriptor = job.clone();
            let handle = self.executor.launch(job).await?;
            pending.push(Pending::Launched(descriptor, handle));
        }

        // Barrier: every job reaches its terminal outcome before reporting
        let mut jobs = Vec::with_capacity(pending.len());
        for entry in pending {
            let report = match entry {
                Pending::Rejected(report) => report,
                Pending::Launched(descriptor, handle) => match handle.await {
                    Ok(report) => report,
                    Err(join_err) => {
                        error!("Job for {} aborted: {}", descriptor.name(), join_err);
                        aborted_report(descriptor)
                    }
                },
            };
            jobs.push(report);
        }

        let summary = RunSummary::from_reports(&jobs);
        let elapsed = started.elapsed();
        report_summary(&summary, &self.layout, elapsed);
        debug!(
            "Peak concurrent jobs: {} of {}",
            self.executor.peak_running(),
            self.concurrency_plan.max_concurrent_jobs
        );

        Ok(RunReport {
            summary,
            jobs,
            elapsed,
        })
    }
}

/// A job in discovery order, either running or already refused
enum Pending {
    Launched(Job, JoinHandle<JobReport>),
    Rejected(JobReport),
}

/// Failed report for a job whose task died without reporting
///
/// The task may have been mid-encode, so its output is treated as partial.
fn aborted_report(job: Job) -> JobReport {
    if let Err(e) = remove_partial_output(&job.output_path) {
        error!("{}", e);
    }
    job.finish(JobOutcome::Failed)
}
