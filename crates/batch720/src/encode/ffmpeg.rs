//! ffmpeg encode invoker
//!
//! Builds and executes a single ffmpeg invocation that converts one input to a
//! letterboxed 1280x720 MP4. An attempt only counts as successful when the
//! process exits cleanly AND a non-empty output file exists afterwards. Any
//! failed attempt removes its partial output before returning.

use super::profile::EncoderProfile;
use crate::config::EncoderConfig;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use thiserror::Error;
use tracing::debug;

/// Fit inside 1280x720 keeping the aspect ratio, then pad to exactly 1280x720, centered
pub const SCALE_PAD_FILTER: &str =
    "scale=1280:720:force_original_aspect_ratio=decrease,pad=1280:720:(ow-iw)/2:(oh-ih)/2";

/// Codec tag that lets Apple players open HEVC in MP4
pub const HEVC_TAG: &str = "hvc1";

/// Container flags moving the index to the front for progressive download
pub const MOVFLAGS: &str = "+faststart";

/// Error type for a single encode attempt
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The encoder could not be started at all
    #[error("Failed to start encoder: {0}")]
    Spawn(#[source] io::Error),

    /// Encoder exited with non-zero status
    #[error("Encoder failed with exit code: {0}")]
    ToolFailed(i32),

    /// Encoder was terminated by a signal
    #[error("Encoder process was terminated by signal")]
    Terminated,

    /// Encoder reported success but left no output behind
    #[error("Encoder exited cleanly but produced no output at {0}")]
    MissingOutput(PathBuf),

    /// Encoder reported success but the output is empty
    #[error("Encoder exited cleanly but the output at {0} is empty")]
    EmptyOutput(PathBuf),

    /// The encoding task died before reporting
    #[error("Encoding task aborted: {0}")]
    Aborted(String),

    /// A partial output could not be removed
    #[error("Failed to remove partial output {path}: {source}")]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Per-run encode settings shared by every attempt
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    /// Encoder executable
    pub program: PathBuf,
    /// Value passed with the profile's quality flag
    pub quality: u32,
    pub preset: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl From<&EncoderConfig> for EncodeSettings {
    fn from(cfg: &EncoderConfig) -> Self {
        Self {
            program: cfg.program.clone(),
            quality: cfg.quality,
            preset: cfg.preset.clone(),
            audio_codec: cfg.audio_codec.clone(),
            audio_bitrate: cfg.audio_bitrate.clone(),
        }
    }
}

/// Parameters for one ffmpeg encode attempt
#[derive(Debug, Clone)]
pub struct FfmpegEncodeParams {
    /// Path to the input video file
    pub input_path: PathBuf,
    /// Path for the encoded output file
    pub output_path: PathBuf,
    /// Codec and quality flag of this attempt
    pub profile: EncoderProfile,
    pub settings: EncodeSettings,
}

impl FfmpegEncodeParams {
    pub fn new(
        input_path: PathBuf,
        output_path: PathBuf,
        profile: EncoderProfile,
        settings: EncodeSettings,
    ) -> Self {
        Self {
            input_path,
            output_path,
            profile,
            settings,
        }
    }
}

/// Build the ffmpeg command for one attempt
///
/// The argument template is fixed; only the codec, its quality flag and the
/// HEVC tag vary with the profile:
///
/// ```text
/// ffmpeg -hide_banner -nostdin -y -i <in> -vf <scale+pad>
///        -c:v <codec> <quality-flag> <quality> -preset <preset> [-tag:v hvc1]
///        -c:a <audio> -b:a <bitrate> -movflags +faststart <out>
/// ```
pub fn build_ffmpeg_command(params: &FfmpegEncodeParams) -> Command {
    let settings = &params.settings;
    let mut cmd = Command::new(&settings.program);

    // Quiet banner, never read the terminal, overwrite stale outputs from earlier runs
    cmd.args(["-hide_banner", "-nostdin", "-y"]);

    cmd.arg("-i").arg(&params.input_path);
    cmd.arg("-vf").arg(SCALE_PAD_FILTER);

    cmd.arg("-c:v").arg(&params.profile.codec);
    cmd.arg(&params.profile.quality_flag)
        .arg(settings.quality.to_string());
    cmd.arg("-preset").arg(&settings.preset);

    if params.profile.is_high_efficiency() {
        cmd.arg("-tag:v").arg(HEVC_TAG);
    }

    cmd.arg("-c:a").arg(&settings.audio_codec);
    cmd.arg("-b:a").arg(&settings.audio_bitrate);

    cmd.arg("-movflags").arg(MOVFLAGS);

    cmd.arg(&params.output_path);

    cmd
}

/// Delete a partial output, treating an already-absent file as done
pub fn remove_partial_output(path: &Path) -> Result<(), EncodeError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(EncodeError::CleanupFailed {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Execute one ffmpeg encode attempt
///
/// Blocks until the encoder exits. Both output streams are forwarded to the
/// run log under the `batch720::tool` target.
///
/// # Errors
/// Returns an error if:
/// - The encoder cannot be started
/// - The encoder exits with non-zero status or is killed by a signal
/// - The encoder exits cleanly but the output file is missing or empty
///
/// In every error case the output path is gone when this returns, unless the
/// error is [`EncodeError::CleanupFailed`].
pub fn run_ffmpeg(params: &FfmpegEncodeParams) -> Result<(), EncodeError> {
    let mut cmd = build_ffmpeg_command(params);
    cmd.stdin(Stdio::null());

    let output = match cmd.output() {
        Ok(output) => output,
        Err(e) => {
            remove_partial_output(&params.output_path)?;
            return Err(EncodeError::Spawn(e));
        }
    };

    log_tool_output(&params.input_path, &output);

    if !output.status.success() {
        remove_partial_output(&params.output_path)?;
        return Err(match output.status.code() {
            Some(code) => EncodeError::ToolFailed(code),
            None => EncodeError::Terminated,
        });
    }

    // A clean exit is not trusted on its own
    verify_output(&params.output_path)
}

/// Check that an output file exists and has content, removing it if empty
fn verify_output(path: &Path) -> Result<(), EncodeError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        Ok(meta) if meta.is_file() => {
            remove_partial_output(path)?;
            Err(EncodeError::EmptyOutput(path.to_path_buf()))
        }
        _ => Err(EncodeError::MissingOutput(path.to_path_buf())),
    }
}

fn log_tool_output(input: &Path, output: &Output) {
    let file = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    for stream in [&output.stdout, &output.stderr] {
        for line in String::from_utf8_lossy(stream).lines() {
            let line = line.trim_end();
            if !line.is_empty() {
                debug!(target: "batch720::tool", file = %file, "{}", line);
            }
        }
    }
}
