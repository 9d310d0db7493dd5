//! Adapting the default curve to a clip.
//!
//! High-bitrate, high-frame-rate, longer sources hold up under a steep
//! front-loaded ramp; everything else gets the gentler hybrid.

use curvecut_project_model::easing::{EasingPreset, EasingSpec};
use curvecut_project_model::media::ClipMetadata;

/// Bitrate at or above which a source counts as high quality.
pub const HIGH_BITRATE: u32 = 8_000_000;
/// Frame rate at or above which a source counts as high frame rate.
pub const HIGH_FRAME_RATE: f64 = 48.0;
/// Source duration at or above which a source counts as long.
pub const LONG_SOURCE_SECS: f64 = 4.0;
/// Score at which the harsh hybrid is chosen.
pub const HARSH_THRESHOLD: u8 = 2;

/// Quality score in `0..=3`.
pub fn adaptation_score(metadata: &ClipMetadata) -> u8 {
    let mut score = 0;
    if metadata.bitrate >= HIGH_BITRATE {
        score += 1;
    }
    if metadata.frame_rate >= HIGH_FRAME_RATE {
        score += 1;
    }
    if metadata.duration_secs >= LONG_SOURCE_SECS {
        score += 1;
    }
    score
}

/// Hybrid preset chosen for an `Auto` spec on this clip.
pub fn auto_preset(metadata: &ClipMetadata) -> EasingPreset {
    if adaptation_score(metadata) >= HARSH_THRESHOLD {
        EasingPreset::InExpoOutCubic
    } else {
        EasingPreset::InCubicOutQuad
    }
}

/// Replace `Auto` with the clip-specific hybrid; other specs pass through.
pub fn adapt(spec: EasingSpec, metadata: &ClipMetadata) -> EasingSpec {
    if spec.is_auto() {
        EasingSpec::Preset(auto_preset(metadata))
    } else {
        spec
    }
}
