//! Encoding modules: profile selection inputs and the ffmpeg invoker

pub mod ffmpeg;
pub mod profile;

pub use ffmpeg::{
    build_ffmpeg_command, remove_partial_output, run_ffmpeg, EncodeError, EncodeSettings,
    FfmpegEncodeParams,
};
pub use profile::{fallback_profile, CodecTier, EncoderProfile};
