//! Pipeline configuration shared by every stage.

use curvecut_common::config::{PipelineDefaults, WarpModel};
use curvecut_processing_core::tiers::TierLimits;
use curvecut_project_model::media::secs_to_us;

/// Resolved pipeline parameters, in the units the stages work in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub warp_model: WarpModel,
    /// Shortest sample the warp may emit (microseconds).
    pub min_sample_us: u64,
    /// Floor applied to segment target durations (microseconds).
    pub min_segment_us: u64,
    /// Prepared audio is never shorter than this (seconds).
    pub min_audio_secs: f64,
    pub tiers: TierLimits,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&PipelineDefaults::default())
    }
}

impl From<&PipelineDefaults> for PipelineConfig {
    fn from(defaults: &PipelineDefaults) -> Self {
        Self {
            warp_model: defaults.warp_model,
            min_sample_us: secs_to_us(defaults.min_sample_duration_secs).max(1),
            min_segment_us: secs_to_us(defaults.min_segment_duration_secs).max(1),
            min_audio_secs: defaults.min_audio_duration_secs.max(0.0),
            tiers: TierLimits::from(defaults),
        }
    }
}

impl PipelineConfig {
    pub fn with_warp_model(mut self, warp_model: WarpModel) -> Self {
        self.warp_model = warp_model;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_convert_to_microseconds() {
        let config = PipelineConfig::default();
        assert_eq!(config.min_sample_us, 4_000);
        assert_eq!(config.min_segment_us, 100_000);
        assert_eq!(config.warp_model, WarpModel::Elastic);
        assert_eq!(config.tiers.hd_long_edge, 1920);
    }
}
