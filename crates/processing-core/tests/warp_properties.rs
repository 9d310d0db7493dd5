//! Property-based tests for curve evaluation and time warping.

use curvecut_common::config::WarpModel;
use curvecut_processing_core::easing::Curve;
use curvecut_processing_core::time_warp::{PositionModel, TimeWarp, WarpEmitter};
use curvecut_project_model::easing::{EasingPreset, EasingSpec};
use curvecut_project_model::media::VideoSample;
use proptest::prelude::*;

const MIN_SAMPLE_US: u64 = 4_000;

fn preset_strategy() -> impl Strategy<Value = EasingPreset> {
    (0..EasingPreset::ALL.len()).prop_map(|i| EasingPreset::ALL[i])
}

fn warp_all(
    curve: Curve,
    model: WarpModel,
    source_us: u64,
    target_us: u64,
    input: Vec<VideoSample>,
    expected: usize,
) -> Vec<VideoSample> {
    let warp = TimeWarp::new(curve, source_us, target_us, MIN_SAMPLE_US);
    let mut emitter = WarpEmitter::new(warp, PositionModel::from_config(model, expected));
    let mut out = Vec::new();
    for sample in input {
        if emitter.is_done() {
            break;
        }
        out.extend(emitter.push(sample));
    }
    let (last, _) = emitter.finish();
    out.extend(last);
    out
}

// =============================================================================
// Curve endpoints
// =============================================================================

proptest! {
    /// Every bezier with in-range control points maps 0 → 0 and 1 → 1.
    #[test]
    fn bezier_endpoints_are_pinned(
        x1 in 0.0f64..=1.0,
        y1 in 0.0f64..=1.0,
        x2 in 0.0f64..=1.0,
        y2 in 0.0f64..=1.0,
    ) {
        let curve = Curve::from_spec(EasingSpec::bezier(x1, y1, x2, y2));
        prop_assert!(curve.evaluate(0.0).abs() < 1e-4);
        prop_assert!((curve.evaluate(1.0) - 1.0).abs() < 1e-4);
    }

    /// Output always stays inside [0, 1].
    #[test]
    fn presets_stay_in_unit_range(preset in preset_strategy(), t in -1.0f64..2.0) {
        let value = Curve::from_preset(preset).evaluate(t);
        prop_assert!((0.0..=1.0).contains(&value));
    }

    /// With `y1 = 0, y2 = 1` the solved curve is monotone in `t`.
    #[test]
    fn bezier_is_monotone_in_t(
        x1 in 0.0f64..=1.0,
        x2 in 0.0f64..=1.0,
        a in 0.0f64..=1.0,
        b in 0.0f64..=1.0,
    ) {
        let curve = Curve::from_spec(EasingSpec::bezier(x1, 0.0, x2, 1.0));
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assume!(hi - lo > 1e-3);
        prop_assert!(curve.evaluate(lo) <= curve.evaluate(hi) + 1e-4);
    }
}

// =============================================================================
// Warp invariants
// =============================================================================

proptest! {
    /// Output duration equals the target exactly, whatever the sample count.
    #[test]
    fn warped_total_equals_target(
        preset in preset_strategy(),
        frame_count in 1usize..200,
        expected in 1usize..200,
        target_us in 100_000u64..10_000_000,
        elastic in any::<bool>(),
    ) {
        let step = 33_333u64;
        let input: Vec<_> = (0..frame_count)
            .map(|i| VideoSample::new(i as u64 * step, step, vec![0u8]))
            .collect();
        let model = if elastic { WarpModel::Elastic } else { WarpModel::Timestamp };
        let source_us = expected as u64 * step;

        let out = warp_all(Curve::from_preset(preset), model, source_us, target_us, input, expected);

        prop_assert!(!out.is_empty());
        prop_assert_eq!(out[0].timestamp_us, 0);
        let total: u64 = out.iter().map(|s| s.duration_us).sum();
        prop_assert_eq!(total, target_us);
        prop_assert_eq!(out.last().map(VideoSample::end_us), Some(target_us));
        prop_assert!(out.iter().all(|s| s.duration_us >= MIN_SAMPLE_US));
    }

    /// Non-decreasing input timestamps give contiguous, increasing output.
    #[test]
    fn warped_timestamps_never_decrease(
        preset in preset_strategy(),
        deltas in prop::collection::vec(0u64..100_000, 1..120),
        target_us in 100_000u64..5_000_000,
    ) {
        let mut ts = 0u64;
        let input: Vec<_> = deltas
            .iter()
            .map(|&delta| {
                ts += delta;
                VideoSample::new(ts, 10_000, vec![1u8])
            })
            .collect();
        let source_us = ts.max(1);

        let out = warp_all(
            Curve::from_preset(preset),
            WarpModel::Timestamp,
            source_us,
            target_us,
            input,
            1,
        );

        for pair in out.windows(2) {
            prop_assert!(pair[0].timestamp_us < pair[1].timestamp_us);
            prop_assert_eq!(pair[0].end_us(), pair[1].timestamp_us);
        }
    }
}
