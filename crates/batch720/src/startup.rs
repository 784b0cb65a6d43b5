//! Startup checks
//!
//! Runs once before any file is touched:
//! - Creates the output and done directories
//! - Queries the encoder's advertised encoder list and picks the run's profile
//!
//! Any failure here aborts the run.

use crate::config::EncoderConfig;
use crate::encode::EncoderProfile;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, info};

/// Error types for startup checks
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Encoder not available: {0}")]
    EncoderUnavailable(String),

    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Create each directory (and parents) if missing
pub fn ensure_directories(dirs: &[&Path]) -> Result<(), StartupError> {
    for dir in dirs {
        std::fs::create_dir_all(dir).map_err(|e| StartupError::DirectoryCreation {
            path: dir.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

/// Run `<program> -hide_banner -encoders` and return its listing
pub fn list_encoders(program: &Path) -> Result<String, StartupError> {
    let output = Command::new(program)
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            StartupError::EncoderUnavailable(format!(
                "{} -encoders failed; is ffmpeg installed and in PATH? Error: {}",
                program.display(),
                e
            ))
        })?;

    if !output.status.success() {
        return Err(StartupError::EncoderUnavailable(format!(
            "{} -encoders exited with {}",
            program.display(),
            output.status
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Whether an encoder listing advertises `codec`
///
/// Listing lines look like ` V....D hevc_nvenc   NVIDIA NVENC hevc encoder`;
/// the codec name is the second column. Legend lines (` V..... = Video`) never
/// match because their second column is `=`.
pub fn encoder_listed(listing: &str, codec: &str) -> bool {
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .any(|name| name == codec)
}

/// Pick the run's primary profile from an encoder listing
pub fn select_profile(listing: &str, cfg: &EncoderConfig) -> EncoderProfile {
    if encoder_listed(listing, &cfg.preferred_codec) {
        EncoderProfile::preferred(cfg)
    } else {
        EncoderProfile::baseline(cfg)
    }
}

/// Query the encoder once and choose the run's primary profile
///
/// Emits a one-time notice when the preferred codec is missing and the
/// baseline is used for every job.
pub fn probe_encoder_profile(cfg: &EncoderConfig) -> Result<EncoderProfile, StartupError> {
    let listing = list_encoders(&cfg.program)?;
    debug!(encoders = listing.lines().count(), "Encoder listing received");

    let profile = select_profile(&listing, cfg);
    if profile.is_high_efficiency() {
        info!("Using {} encoder", profile);
    } else {
        info!(
            "{} not available, using {} for all files",
            cfg.preferred_codec, profile
        );
    }

    Ok(profile)
}

/// Run all startup checks in order
///
/// 1. Create output and done directories
/// 2. Probe the encoder and select the primary profile
pub fn run_startup_checks(
    cfg: &EncoderConfig,
    output_dir: &Path,
    done_dir: &Path,
) -> Result<EncoderProfile, StartupError> {
    ensure_directories(&[output_dir, done_dir])?;
    probe_encoder_profile(cfg)
}
