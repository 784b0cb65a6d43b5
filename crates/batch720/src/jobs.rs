//! Job descriptors and terminal outcomes.
//!
//! A [`Job`] is built for each discovered input, owned by exactly one task for
//! its whole life, and turned into a [`JobReport`] once it reaches a terminal
//! outcome.

use crate::config::DirectoriesConfig;
use crate::encode::CodecTier;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Extension of every encoded output.
pub const OUTPUT_EXTENSION: &str = "mp4";

/// Resolved directories of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    /// Directory scanned for inputs.
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub done_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl RunLayout {
    /// Resolves configured directories; relative ones are taken relative to `input_dir`.
    pub fn resolve(input_dir: &Path, dirs: &DirectoriesConfig) -> Self {
        let under_input = |dir: &Path| {
            if dir.is_absolute() {
                dir.to_path_buf()
            } else {
                input_dir.join(dir)
            }
        };

        Self {
            input_dir: input_dir.to_path_buf(),
            output_dir: under_input(&dirs.output_dir),
            done_dir: under_input(&dirs.done_dir),
            log_dir: under_input(&dirs.log_dir),
        }
    }
}

/// Final classification of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Encoded and the original moved to the done directory.
    Success,
    /// Encoded, but the original could not be moved.
    SuccessButArchivalFailed,
    /// No valid output was produced.
    Failed,
}

impl JobOutcome {
    /// Whether the converted file was produced.
    pub fn is_success(&self) -> bool {
        !matches!(self, JobOutcome::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobOutcome::Success => "success",
            JobOutcome::SuccessButArchivalFailed => "success_archival_failed",
            JobOutcome::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of one encode attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub codec: String,
    pub tier: CodecTier,
    /// `None` when the attempt succeeded.
    pub error: Option<String>,
}

impl AttemptRecord {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Output path for an input: `<output_dir>/<stem>.mp4`.
///
/// Only the final extension is stripped, so `a.b.mkv` becomes `a.b.mp4`.
pub fn output_path_for(source: &Path, output_dir: &Path) -> Option<PathBuf> {
    let stem = source.file_stem()?;
    let mut name = stem.to_os_string();
    name.push(".");
    name.push(OUTPUT_EXTENSION);
    Some(output_dir.join(name))
}

/// Done path for an input: `<done_dir>/<original file name>`.
pub fn done_path_for(source: &Path, done_dir: &Path) -> Option<PathBuf> {
    source.file_name().map(|name| done_dir.join(name))
}

/// One input file's lifecycle.
#[derive(Debug, Clone)]
pub struct Job {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    pub done_path: PathBuf,
    /// Wall-clock start, set when the job's task begins.
    pub started_at: Option<DateTime<Local>>,
    pub attempts: Vec<AttemptRecord>,
    started: Option<Instant>,
}

impl Job {
    /// Builds the descriptor for `source`; `None` if it has no file name.
    pub fn describe(source: &Path, layout: &RunLayout) -> Option<Self> {
        Some(Self {
            source_path: source.to_path_buf(),
            output_path: output_path_for(source, &layout.output_dir)?,
            done_path: done_path_for(source, &layout.done_dir)?,
            started_at: None,
            attempts: Vec::new(),
            started: None,
        })
    }

    /// File name for log lines.
    pub fn name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }

    /// Stamps the start of the job and returns the wall-clock time.
    pub fn mark_started(&mut self) -> DateTime<Local> {
        let now = Local::now();
        self.started_at = Some(now);
        self.started = Some(Instant::now());
        now
    }

    /// Consumes the job into its terminal report.
    pub fn finish(self, outcome: JobOutcome) -> JobReport {
        let elapsed = self
            .started
            .map(|start| start.elapsed())
            .unwrap_or_default();

        JobReport {
            source_path: self.source_path,
            output_path: self.output_path,
            done_path: self.done_path,
            started_at: self.started_at,
            attempts: self.attempts,
            outcome,
            elapsed,
        }
    }
}

/// Terminal record of a job.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    pub done_path: PathBuf,
    pub started_at: Option<DateTime<Local>>,
    pub attempts: Vec<AttemptRecord>,
    pub outcome: JobOutcome,
    pub elapsed: Duration,
}

/// Formats a duration as `H:MM:SS`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}
