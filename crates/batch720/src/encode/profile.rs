//! Encoder profiles
//!
//! A profile is the codec plus quality-flag pair an encode attempt uses. One
//! profile is chosen per run as the primary; the baseline profile doubles as
//! the fallback.

use crate::config::EncoderConfig;

/// Which of the two configured codecs a profile refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecTier {
    /// Preferred codec, only used when the tool advertises it
    HighEfficiency,
    /// Always-available codec
    Baseline,
}

impl CodecTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodecTier::HighEfficiency => "high-efficiency",
            CodecTier::Baseline => "baseline",
        }
    }
}

/// Codec and quality parameterization for one encode attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderProfile {
    /// Encoder name as understood by ffmpeg (`hevc_nvenc`, `libx264`, ...)
    pub codec: String,
    /// Flag carrying the quality value (`-cq`, `-crf`, ...)
    pub quality_flag: String,
    pub tier: CodecTier,
}

impl EncoderProfile {
    /// The preferred high-efficiency profile
    pub fn preferred(cfg: &EncoderConfig) -> Self {
        Self {
            codec: cfg.preferred_codec.clone(),
            quality_flag: cfg.preferred_quality_flag.clone(),
            tier: CodecTier::HighEfficiency,
        }
    }

    /// The baseline profile
    pub fn baseline(cfg: &EncoderConfig) -> Self {
        Self {
            codec: cfg.baseline_codec.clone(),
            quality_flag: cfg.baseline_quality_flag.clone(),
            tier: CodecTier::Baseline,
        }
    }

    pub fn is_high_efficiency(&self) -> bool {
        self.tier == CodecTier::HighEfficiency
    }
}

impl std::fmt::Display for EncoderProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} {})", self.codec, self.tier.as_str(), self.quality_flag)
    }
}

/// Profile for the single retry after a failed primary attempt
///
/// Only a high-efficiency primary has a fallback. A baseline primary failing
/// is terminal.
pub fn fallback_profile<'a>(
    primary: &EncoderProfile,
    baseline: &'a EncoderProfile,
) -> Option<&'a EncoderProfile> {
    if primary.is_high_efficiency() {
        Some(baseline)
    } else {
        None
    }
}
