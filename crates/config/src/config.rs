//! Core configuration structures and loading logic

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file
    Io(std::io::Error),
    /// TOML parsing error
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Directory layout of a run
///
/// Relative paths are resolved against the input directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectoriesConfig {
    /// Where encoded `.mp4` files are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Where originals are moved after a successful encode
    #[serde(default = "default_done_dir")]
    pub done_dir: PathBuf,
    /// Where the timestamped run log is created
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("720p")
}

fn default_done_dir() -> PathBuf {
    PathBuf::from("done")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for DirectoriesConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            done_dir: default_done_dir(),
            log_dir: default_log_dir(),
        }
    }
}

/// External encoder settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncoderConfig {
    /// Encoder executable (name on PATH or absolute path)
    #[serde(default = "default_program")]
    pub program: PathBuf,
    /// High-efficiency codec tried first when the tool advertises it
    #[serde(default = "default_preferred_codec")]
    pub preferred_codec: String,
    /// Quality flag used with the preferred codec
    #[serde(default = "default_preferred_quality_flag")]
    pub preferred_quality_flag: String,
    /// Codec that is always available and used as fallback
    #[serde(default = "default_baseline_codec")]
    pub baseline_codec: String,
    /// Quality flag used with the baseline codec
    #[serde(default = "default_baseline_quality_flag")]
    pub baseline_quality_flag: String,
    /// Quality value passed to either quality flag
    #[serde(default = "default_quality")]
    pub quality: u32,
    /// Encoding-effort preset
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,
}

fn default_program() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_preferred_codec() -> String {
    "hevc_nvenc".to_string()
}

fn default_preferred_quality_flag() -> String {
    "-cq".to_string()
}

fn default_baseline_codec() -> String {
    "libx264".to_string()
}

fn default_baseline_quality_flag() -> String {
    "-crf".to_string()
}

fn default_quality() -> u32 {
    23
}

fn default_preset() -> String {
    "medium".to_string()
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_audio_bitrate() -> String {
    "128k".to_string()
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            preferred_codec: default_preferred_codec(),
            preferred_quality_flag: default_preferred_quality_flag(),
            baseline_codec: default_baseline_codec(),
            baseline_quality_flag: default_baseline_quality_flag(),
            quality: default_quality(),
            preset: default_preset(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
        }
    }
}

/// CPU-related configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CpuConfig {
    /// Number of logical cores (auto-detected if None)
    pub logical_cores: Option<u32>,
    /// Fraction of cores admitted as concurrent jobs (0.05-1.0, default 0.8)
    #[serde(default = "default_concurrency_fraction")]
    pub concurrency_fraction: f32,
}

fn default_concurrency_fraction() -> f32 {
    0.8
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            logical_cores: None,
            concurrency_fraction: default_concurrency_fraction(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub directories: DirectoriesConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub cpu: CpuConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Parses the config file and handles missing optional fields with defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Overrides the following values if environment variables are set:
    /// - BATCH720_OUTPUT_DIR -> directories.output_dir
    /// - BATCH720_DONE_DIR -> directories.done_dir
    /// - BATCH720_LOG_DIR -> directories.log_dir
    /// - BATCH720_FFMPEG -> encoder.program
    /// - BATCH720_QUALITY -> encoder.quality
    /// - BATCH720_CONCURRENCY_FRACTION -> cpu.concurrency_fraction
    /// - BATCH720_LOGICAL_CORES -> cpu.logical_cores
    ///
    /// Values that fail to parse are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(dir) = non_empty_var("BATCH720_OUTPUT_DIR") {
            self.directories.output_dir = PathBuf::from(dir);
        }

        if let Some(dir) = non_empty_var("BATCH720_DONE_DIR") {
            self.directories.done_dir = PathBuf::from(dir);
        }

        if let Some(dir) = non_empty_var("BATCH720_LOG_DIR") {
            self.directories.log_dir = PathBuf::from(dir);
        }

        if let Some(program) = non_empty_var("BATCH720_FFMPEG") {
            self.encoder.program = PathBuf::from(program);
        }

        if let Some(val) = non_empty_var("BATCH720_QUALITY") {
            if let Ok(quality) = val.parse::<u32>() {
                self.encoder.quality = quality;
            }
        }

        if let Some(val) = non_empty_var("BATCH720_CONCURRENCY_FRACTION") {
            if let Ok(fraction) = val.parse::<f32>() {
                self.cpu.concurrency_fraction = fraction;
            }
        }

        if let Some(val) = non_empty_var("BATCH720_LOGICAL_CORES") {
            if let Ok(cores) = val.parse::<u32>() {
                self.cpu.logical_cores = Some(cores);
            }
        }
    }

    /// Load configuration from file and apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Defaults with environment overrides, for runs without a config file
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
