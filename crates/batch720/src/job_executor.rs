//! Job executor module
//!
//! Runs one job through its pipeline (primary encode, optional single
//! fallback, relocation of the original) and limits how many jobs run at once
//! with a semaphore sized from the concurrency plan.

use crate::config::EncoderConfig;
use crate::encode::{
    fallback_profile, remove_partial_output, run_ffmpeg, EncodeError, EncodeSettings,
    EncoderProfile, FfmpegEncodeParams,
};
use crate::jobs::{format_elapsed, AttemptRecord, Job, JobOutcome, JobReport};
use crate::relocate::relocate_to_done;
use crate::ConcurrencyPlan;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Job executor that runs encode jobs with concurrency limiting
///
/// Uses a tokio Semaphore so that launching a job blocks exactly while the
/// admission ceiling is reached.
pub struct JobExecutor {
    /// Semaphore for limiting concurrent jobs
    semaphore: Arc<Semaphore>,
    /// Profile of every job's first attempt
    primary: EncoderProfile,
    /// Profile of the single retry
    baseline: EncoderProfile,
    settings: EncodeSettings,
    /// Jobs currently holding a permit
    running: AtomicUsize,
    /// Highest value `running` has reached
    peak_running: AtomicUsize,
}

impl JobExecutor {
    /// Create a new JobExecutor
    ///
    /// # Arguments
    /// * `plan` - Concurrency plan determining max concurrent jobs
    /// * `primary` - Profile chosen by the capability probe
    /// * `encoder` - Encoder configuration providing the baseline profile and fixed settings
    pub fn new(plan: &ConcurrencyPlan, primary: EncoderProfile, encoder: &EncoderConfig) -> Self {
        let permits = plan.max_concurrent_jobs.max(1) as usize;
        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
            primary,
            baseline: EncoderProfile::baseline(encoder),
            settings: EncodeSettings::from(encoder),
            running: AtomicUsize::new(0),
            peak_running: AtomicUsize::new(0),
        }
    }

    /// Profile used for every job's first attempt
    pub fn primary_profile(&self) -> &EncoderProfile {
        &self.primary
    }

    /// Highest number of jobs that were running at the same time
    pub fn peak_running(&self) -> usize {
        self.peak_running.load(Ordering::SeqCst)
    }

    /// Acquire a permit for job execution
    ///
    /// This will wait until a permit is available if all slots are in use.
    pub async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        self.semaphore.clone().acquire_owned().await
    }

    /// Admit a job and start it on its own task
    ///
    /// Waits for a free slot before spawning, so callers launching jobs in
    /// discovery order get first-come-first-served admission. The permit is
    /// held by the task until the job reaches its terminal outcome.
    pub async fn launch(
        self: &Arc<Self>,
        job: Job,
    ) -> Result<JoinHandle<JobReport>, AcquireError> {
        let permit = self.acquire_permit().await?;
        let executor = Arc::clone(self);

        Ok(tokio::spawn(async move {
            let _permit = permit;
            let _running = executor.enter();
            executor.execute(job).await
        }))
    }

    /// Execute a job through the pipeline
    ///
    /// 1. Encode with the primary profile
    /// 2. If that failed and the primary was high-efficiency, encode once more with the baseline
    /// 3. After any successful encode, move the original to the done directory
    ///
    /// Never fails: every error ends up as the job's terminal outcome.
    pub async fn execute(&self, mut job: Job) -> JobReport {
        let started_at = job.mark_started();
        info!(
            file = %job.name(),
            "Starting {} at {}",
            job.name(),
            started_at.format("%Y-%m-%d %H:%M:%S")
        );

        let mut encoded = self.attempt(&mut job, self.primary.clone()).await;

        if !encoded {
            if let Some(fallback) = fallback_profile(&self.primary, &self.baseline) {
                info!(
                    file = %job.name(),
                    "Retrying {} with {}",
                    job.name(),
                    fallback.codec
                );
                encoded = self.attempt(&mut job, fallback.clone()).await;
            }
        }

        let outcome = if encoded {
            self.archive(&job)
        } else {
            error!(
                file = %job.name(),
                "Conversion failed for {} after {} attempt(s)",
                job.name(),
                job.attempts.len()
            );
            JobOutcome::Failed
        };

        let report = job.finish(outcome);
        info!(
            file = %report.source_path.display(),
            outcome = %report.outcome,
            "Finished in {}",
            format_elapsed(report.elapsed)
        );
        report
    }

    /// One encode attempt; records it on the job and returns whether it succeeded
    async fn attempt(&self, job: &mut Job, profile: EncoderProfile) -> bool {
        let params = FfmpegEncodeParams::new(
            job.source_path.clone(),
            job.output_path.clone(),
            profile.clone(),
            self.settings.clone(),
        );
        let output_path = job.output_path.clone();

        let result = match tokio::task::spawn_blocking(move || run_ffmpeg(&params)).await {
            Ok(result) => result,
            Err(join_err) => {
                // The blocking task died mid-encode; whatever it wrote is partial
                let aborted = EncodeError::Aborted(join_err.to_string());
                match remove_partial_output(&output_path) {
                    Ok(()) => Err(aborted),
                    Err(cleanup_err) => Err(cleanup_err),
                }
            }
        };

        let record = AttemptRecord {
            codec: profile.codec.clone(),
            tier: profile.tier,
            error: result.as_ref().err().map(|e| e.to_string()),
        };
        job.attempts.push(record);

        match result {
            Ok(()) => {
                info!(file = %job.name(), "Encoded {} with {}", job.name(), profile.codec);
                true
            }
            Err(e @ EncodeError::CleanupFailed { .. }) => {
                error!(file = %job.name(), "{} attempt with {}: {}", job.name(), profile.codec, e);
                false
            }
            Err(e) => {
                warn!(file = %job.name(), "{} attempt with {} failed: {}", job.name(), profile.codec, e);
                false
            }
        }
    }

    /// Relocation step after a successful encode
    fn archive(&self, job: &Job) -> JobOutcome {
        match relocate_to_done(&job.source_path, &job.done_path) {
            Ok(()) => {
                info!(
                    file = %job.name(),
                    "Moved {} to {}",
                    job.name(),
                    job.done_path.display()
                );
                JobOutcome::Success
            }
            Err(e) => {
                warn!(
                    file = %job.name(),
                    "Encoded {} but could not archive the original: {}",
                    job.name(),
                    e
                );
                JobOutcome::SuccessButArchivalFailed
            }
        }
    }

    /// Count a job as running until the returned guard is dropped
    fn enter(&self) -> RunningGuard<'_> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_running.fetch_max(now, Ordering::SeqCst);
        RunningGuard { executor: self }
    }
}

#[cfg(test)]
impl JobExecutor {
    pub(crate) fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub(crate) fn try_acquire_permit(&self) -> Option<OwnedSemaphorePermit> {
        self.semaphore.clone().try_acquire_owned().ok()
    }

    pub(crate) fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }
}

/// Decrements the running count on drop, including when a job panics
struct RunningGuard<'a> {
    executor: &'a JobExecutor,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.executor.running.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DirectoriesConfig;
    use crate::encode::CodecTier;
    use crate::jobs::RunLayout;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_test_plan(max_concurrent_jobs: u32) -> ConcurrencyPlan {
        ConcurrencyPlan {
            total_cores: 8,
            fraction: 0.8,
            max_concurrent_jobs,
        }
    }

    fn encoder_config(program: &str) -> EncoderConfig {
        EncoderConfig {
            program: PathBuf::from(program),
            ..EncoderConfig::default()
        }
    }

    fn create_executor(max_jobs: u32, program: &str, high_efficiency: bool) -> JobExecutor {
        let cfg = encoder_config(program);
        let primary = if high_efficiency {
            EncoderProfile::preferred(&cfg)
        } else {
            EncoderProfile::baseline(&cfg)
        };
        JobExecutor::new(&create_test_plan(max_jobs), primary, &cfg)
    }

    fn test_layout(root: &Path) -> RunLayout {
        let layout = RunLayout::resolve(root, &DirectoriesConfig::default());
        fs::create_dir_all(&layout.output_dir).unwrap();
        fs::create_dir_all(&layout.done_dir).unwrap();
        layout
    }

    #[tokio::test]
    async fn test_executor_initial_permits() {
        let executor = create_executor(3, "ffmpeg", true);
        assert_eq!(executor.available_permits(), 3);
        assert_eq!(executor.peak_running(), 0);
    }

    #[tokio::test]
    async fn test_zero_ceiling_still_admits_one() {
        let executor = create_executor(0, "ffmpeg", true);
        assert_eq!(executor.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_semaphore_permit_limiting() {
        let executor = create_executor(2, "ffmpeg", true);

        let permit1 = executor.try_acquire_permit();
        assert!(permit1.is_some());
        let permit2 = executor.try_acquire_permit();
        assert!(permit2.is_some());
        assert_eq!(executor.available_permits(), 0);

        // Ceiling reached
        assert!(executor.try_acquire_permit().is_none());

        drop(permit1);
        assert_eq!(executor.available_permits(), 1);
        assert!(executor.try_acquire_permit().is_some());
    }

    #[tokio::test]
    async fn test_launch_waits_for_free_slot() {
        let executor = Arc::new(create_executor(1, "/nonexistent/batch720/ffmpeg", true));
        let held = executor.acquire_permit().await.unwrap();

        let temp_dir = TempDir::new().unwrap();
        let layout = test_layout(temp_dir.path());
        let job = Job::describe(&temp_dir.path().join("a.mkv"), &layout).unwrap();

        let launcher = Arc::clone(&executor);
        let launch = tokio::spawn(async move { launcher.launch(job).await.map(|_| ()) });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!launch.is_finished(), "launch must block while the ceiling is reached");

        drop(held);
        let launched = tokio::time::timeout(Duration::from_secs(5), launch).await;
        assert!(matches!(launched, Ok(Ok(Ok(())))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_baseline_primary_failure_has_no_fallback() {
        // `false` fails every attempt
        let temp_dir = TempDir::new().unwrap();
        let layout = test_layout(temp_dir.path());
        let source = temp_dir.path().join("d.webm");
        fs::write(&source, b"video").unwrap();

        let executor = create_executor(1, "false", false);
        let job = Job::describe(&source, &layout).unwrap();
        let report = executor.execute(job).await;

        assert_eq!(report.outcome, JobOutcome::Failed);
        assert_eq!(report.attempts.len(), 1);
        assert_eq!(report.attempts[0].tier, CodecTier::Baseline);
        assert!(source.exists());
        assert!(!report.output_path.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_high_efficiency_failure_falls_back_once() {
        let temp_dir = TempDir::new().unwrap();
        let layout = test_layout(temp_dir.path());
        let source = temp_dir.path().join("d.webm");
        fs::write(&source, b"video").unwrap();

        let executor = create_executor(1, "false", true);
        let job = Job::describe(&source, &layout).unwrap();
        let report = executor.execute(job).await;

        assert_eq!(report.outcome, JobOutcome::Failed);
        let tiers: Vec<_> = report.attempts.iter().map(|a| a.tier).collect();
        assert_eq!(tiers, vec![CodecTier::HighEfficiency, CodecTier::Baseline]);
        assert!(report.attempts.iter().all(|a| !a.succeeded()));
        assert!(source.exists(), "failed original stays in place");
        assert!(!layout.done_dir.join("d.webm").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_moves_original() {
        // `true` exits cleanly; a pre-written output stands in for the encode
        let temp_dir = TempDir::new().unwrap();
        let layout = test_layout(temp_dir.path());
        let source = temp_dir.path().join("a.mp4");
        fs::write(&source, b"video").unwrap();
        fs::write(layout.output_dir.join("a.mp4"), b"encoded").unwrap();

        let executor = create_executor(1, "true", true);
        let job = Job::describe(&source, &layout).unwrap();
        let report = executor.execute(job).await;

        assert_eq!(report.outcome, JobOutcome::Success);
        assert_eq!(report.attempts.len(), 1);
        assert!(!source.exists());
        assert!(layout.done_dir.join("a.mp4").exists());
        assert!(report.output_path.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_archival_failure_keeps_output_and_original() {
        let temp_dir = TempDir::new().unwrap();
        let layout = test_layout(temp_dir.path());
        let source = temp_dir.path().join("e.mov");
        fs::write(&source, b"video").unwrap();
        fs::write(layout.output_dir.join("e.mp4"), b"encoded").unwrap();
        // Occupied destination makes the move fail
        fs::write(layout.done_dir.join("e.mov"), b"older").unwrap();

        let executor = create_executor(1, "true", true);
        let job = Job::describe(&source, &layout).unwrap();
        let report = executor.execute(job).await;

        assert_eq!(report.outcome, JobOutcome::SuccessButArchivalFailed);
        assert!(report.outcome.is_success());
        assert!(source.exists());
        assert!(report.output_path.exists());
    }

    #[test]
    fn test_running_count_released_when_job_panics() {
        let executor = create_executor(2, "ffmpeg", true);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _running = executor.enter();
            assert_eq!(executor.running(), 1);
            panic!("encode task died");
        }));

        assert!(result.is_err());
        assert_eq!(executor.running(), 0);
        assert_eq!(executor.peak_running(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_permit_acquisition() {
        let executor = Arc::new(create_executor(2, "ffmpeg", true));

        let executor1 = executor.clone();
        let executor2 = executor.clone();
        let executor3 = executor.clone();

        let handle1 = tokio::spawn(async move {
            let _permit = executor1.acquire_permit().await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        });

        let handle2 = tokio::spawn(async move {
            let _permit = executor2.acquire_permit().await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        });

        // Give first two tasks time to acquire permits
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Third task has to wait for a slot
        let start = std::time::Instant::now();
        let handle3 = tokio::spawn(async move {
            let _permit = executor3.acquire_permit().await.unwrap();
        });

        let _ = tokio::join!(handle1, handle2, handle3);

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50));
    }
}
