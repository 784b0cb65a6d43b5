//! batch720
//!
//! Converts every video in a directory to a 720p MP4, several at a time,
//! and moves each successfully converted original into a done directory.

pub mod concurrency;
pub mod encode;
pub mod job_executor;
pub mod jobs;
pub mod logging;
pub mod relocate;
pub mod runner;
pub mod scan;
pub mod startup;
pub mod summary;

pub use batch720_config as config;
pub use batch720_config::Config;
pub use concurrency::{derive_plan, ConcurrencyPlan};
pub use encode::{
    build_ffmpeg_command, fallback_profile, run_ffmpeg, CodecTier, EncodeError, EncodeSettings,
    EncoderProfile, FfmpegEncodeParams,
};
pub use job_executor::JobExecutor;
pub use jobs::{AttemptRecord, Job, JobOutcome, JobReport, RunLayout};
pub use logging::{init_logging, LogHandle, LoggingError};
pub use relocate::{relocate_to_done, RelocateError};
pub use runner::{RunError, RunReport, Runner};
pub use scan::{discover_videos, is_video_file, VIDEO_EXTENSIONS};
pub use startup::{probe_encoder_profile, run_startup_checks, select_profile, StartupError};
pub use summary::{report_summary, RunSummary};
