//! Encode tier ladders.
//!
//! Candidates are ordered highest fidelity first: native resolution on a high
//! codec profile, then a 1080p cap on main, then a 720p cap on baseline. The
//! first candidate the engine accepts wins.

use curvecut_common::config::PipelineDefaults;
use curvecut_common::error::{CurvecutError, CurvecutResult};
use curvecut_project_model::media::{EncodeTier, TierKind};

/// H.264 High, level 5.1.
pub const PROFILE_HIGH: &str = "avc1.640033";
/// H.264 Main, level 4.0.
pub const PROFILE_MAIN: &str = "avc1.4d0028";
/// H.264 Constrained Baseline, level 3.1.
pub const PROFILE_BASELINE: &str = "avc1.42001f";

/// Resolution caps and bitrates for the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    pub native_bitrate_floor: u32,
    pub hd_long_edge: u32,
    pub hd_short_edge: u32,
    pub hd_max_bitrate: u32,
    pub sd_long_edge: u32,
    pub sd_short_edge: u32,
    pub sd_max_bitrate: u32,
}

impl Default for TierLimits {
    fn default() -> Self {
        Self::from(&PipelineDefaults::default())
    }
}

impl From<&PipelineDefaults> for TierLimits {
    fn from(defaults: &PipelineDefaults) -> Self {
        Self {
            native_bitrate_floor: defaults.native_bitrate_floor,
            hd_long_edge: defaults.hd_long_edge,
            hd_short_edge: defaults.hd_short_edge,
            hd_max_bitrate: defaults.hd_max_bitrate,
            sd_long_edge: defaults.sd_long_edge,
            sd_short_edge: defaults.sd_short_edge,
            sd_max_bitrate: defaults.sd_max_bitrate,
        }
    }
}

/// Round down to an even value, never below 2.
pub fn even(value: u32) -> u32 {
    (value & !1).max(2)
}

/// Scale `(width, height)` to fit the caps, preserving aspect ratio.
/// The caps apply to the long and short edge, so portrait sources fit the same
/// way landscape ones do. Never upscales.
pub fn fit_within(width: u32, height: u32, long_cap: u32, short_cap: u32) -> (u32, u32) {
    let width = width.max(1);
    let height = height.max(1);
    let long = width.max(height) as f64;
    let short = width.min(height) as f64;
    let scale = (long_cap as f64 / long)
        .min(short_cap as f64 / short)
        .min(1.0);
    let scaled_w = (width as f64 * scale).round() as u32;
    let scaled_h = (height as f64 * scale).round() as u32;
    (even(scaled_w), even(scaled_h))
}

/// Build the three-rung ladder for a source of the given size and bitrate.
pub fn build_ladder(width: u32, height: u32, bitrate: u32, limits: &TierLimits) -> Vec<EncodeTier> {
    let native_bitrate = bitrate.max(limits.native_bitrate_floor);

    let (hd_w, hd_h) = fit_within(width, height, limits.hd_long_edge, limits.hd_short_edge);
    let (sd_w, sd_h) = fit_within(width, height, limits.sd_long_edge, limits.sd_short_edge);

    vec![
        EncodeTier {
            kind: TierKind::Native,
            width: even(width),
            height: even(height),
            bitrate: native_bitrate,
            codec_profile: PROFILE_HIGH.to_string(),
        },
        EncodeTier {
            kind: TierKind::Capped1080,
            width: hd_w,
            height: hd_h,
            bitrate: native_bitrate.min(limits.hd_max_bitrate),
            codec_profile: PROFILE_MAIN.to_string(),
        },
        EncodeTier {
            kind: TierKind::Capped720,
            width: sd_w,
            height: sd_h,
            bitrate: native_bitrate.min(limits.sd_max_bitrate),
            codec_profile: PROFILE_BASELINE.to_string(),
        },
    ]
}

/// First candidate `can_encode` accepts.
///
/// Fails with `NoSupportedEncodeTier` when every candidate is rejected; the
/// caller must not have opened an encoder yet.
pub fn select_tier(
    candidates: &[EncodeTier],
    mut can_encode: impl FnMut(&EncodeTier) -> bool,
) -> CurvecutResult<EncodeTier> {
    for tier in candidates {
        if can_encode(tier) {
            tracing::debug!(tier = %tier, "Encode tier accepted");
            return Ok(tier.clone());
        }
        tracing::debug!(tier = %tier, "Encode tier rejected");
    }

    let (width, height) = candidates
        .first()
        .map(|tier| (tier.width, tier.height))
        .unwrap_or((0, 0));
    Err(CurvecutError::NoSupportedEncodeTier {
        width,
        height,
        tried: candidates.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_rounds_down() {
        assert_eq!(even(1081), 1080);
        assert_eq!(even(1080), 1080);
        assert_eq!(even(1), 2);
        assert_eq!(even(0), 2);
    }

    #[test]
    fn test_4k_ladder_downscales_with_aspect() {
        let ladder = build_ladder(3840, 2160, 40_000_000, &TierLimits::default());
        assert_eq!(ladder.len(), 3);

        assert_eq!((ladder[0].width, ladder[0].height), (3840, 2160));
        assert_eq!(ladder[0].bitrate, 40_000_000);
        assert_eq!(ladder[0].codec_profile, PROFILE_HIGH);

        assert_eq!((ladder[1].width, ladder[1].height), (1920, 1080));
        assert_eq!(ladder[1].bitrate, 8_000_000);

        assert_eq!((ladder[2].width, ladder[2].height), (1280, 720));
        assert_eq!(ladder[2].bitrate, 5_000_000);
        assert_eq!(ladder[2].codec_profile, PROFILE_BASELINE);
    }

    #[test]
    fn test_portrait_caps_use_long_edge() {
        let (w, h) = fit_within(2160, 3840, 1920, 1080);
        assert_eq!((w, h), (1080, 1920));
    }

    #[test]
    fn test_small_source_is_never_upscaled() {
        let ladder = build_ladder(641, 361, 500_000, &TierLimits::default());
        for tier in &ladder {
            assert_eq!((tier.width, tier.height), (640, 360));
            assert_eq!(tier.bitrate, 2_000_000);
        }
    }

    #[test]
    fn test_select_tier_picks_first_supported() {
        let ladder = build_ladder(3840, 2160, 40_000_000, &TierLimits::default());
        let chosen = select_tier(&ladder, |tier| tier.width <= 1920).unwrap();
        assert_eq!(chosen.kind, TierKind::Capped1080);
    }

    #[test]
    fn test_select_tier_fails_when_nothing_is_supported() {
        let ladder = build_ladder(1920, 1080, 8_000_000, &TierLimits::default());
        let mut queries = 0;
        let err = select_tier(&ladder, |_| {
            queries += 1;
            false
        })
        .unwrap_err();
        assert_eq!(queries, 3);
        assert!(matches!(
            err,
            CurvecutError::NoSupportedEncodeTier { tried: 3, .. }
        ));
    }
}
