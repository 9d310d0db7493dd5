//! Time warping: remapping decoded samples onto a target-duration timeline.
//!
//! [`TimeWarp`] is the pure position mapping. [`WarpEmitter`] streams samples
//! through it one at a time and enforces the output invariants:
//!
//! - emitted starts strictly increase and never precede the previous end;
//! - no emitted sample is shorter than the minimum sample duration (short
//!   spans are merged into the held sample instead of emitted);
//! - samples landing at or after the target (less one minimum sample) are
//!   dropped and the stream stops;
//! - [`WarpEmitter::finish`] stretches the last sample so the output ends
//!   exactly at the target duration.

use curvecut_common::config::WarpModel;
use curvecut_project_model::media::VideoSample;

use crate::easing::Curve;

/// Pure mapping from source positions to output positions.
#[derive(Debug, Clone, Copy)]
pub struct TimeWarp {
    curve: Curve,
    source_duration_us: u64,
    target_duration_us: u64,
    min_sample_us: u64,
}

impl TimeWarp {
    pub fn new(
        curve: Curve,
        source_duration_us: u64,
        target_duration_us: u64,
        min_sample_us: u64,
    ) -> Self {
        Self {
            curve,
            source_duration_us,
            target_duration_us,
            min_sample_us: min_sample_us.max(1),
        }
    }

    pub fn target_duration_us(&self) -> u64 {
        self.target_duration_us
    }

    pub fn min_sample_us(&self) -> u64 {
        self.min_sample_us
    }

    /// Output position for a normalized source fraction.
    pub fn map_fraction(&self, fraction: f64) -> u64 {
        let warped = self.curve.evaluate(fraction) * self.target_duration_us as f64;
        (warped.round() as u64).min(self.target_duration_us)
    }

    /// Output position for a source position measured from the clip start.
    pub fn map_timestamp(&self, position_us: u64) -> u64 {
        if self.source_duration_us == 0 {
            return 0;
        }
        self.map_fraction(position_us as f64 / self.source_duration_us as f64)
    }

    /// Output position for sample slot `index` of `expected`.
    pub fn map_index(&self, index: usize, expected: usize) -> u64 {
        self.map_fraction(index as f64 / expected.max(1) as f64)
    }
}

/// How a decoded sample's position is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionModel {
    /// Decoder timestamps, relative to the first one seen.
    Timestamp,
    /// Slot `i` of `expected` samples, ignoring timestamps.
    Elastic { expected: usize },
}

impl PositionModel {
    /// Build from the configured model and the probed expected sample count.
    pub fn from_config(model: WarpModel, expected: usize) -> Self {
        match model {
            WarpModel::Timestamp => PositionModel::Timestamp,
            WarpModel::Elastic => PositionModel::Elastic {
                expected: expected.max(1),
            },
        }
    }
}

#[derive(Debug)]
struct Held {
    sample: VideoSample,
    start_us: u64,
}

/// Streaming warp over decoded samples.
#[derive(Debug)]
pub struct WarpEmitter {
    warp: TimeWarp,
    model: PositionModel,
    origin_us: Option<u64>,
    index: usize,
    held: Option<Held>,
    emitted: usize,
    merged: usize,
    dropped: usize,
    done: bool,
}

/// Counters reported once the stream is finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarpStats {
    pub emitted: usize,
    pub merged: usize,
    pub dropped: usize,
}

impl WarpEmitter {
    pub fn new(warp: TimeWarp, model: PositionModel) -> Self {
        Self {
            warp,
            model,
            origin_us: None,
            index: 0,
            held: None,
            emitted: 0,
            merged: 0,
            dropped: 0,
            done: false,
        }
    }

    /// Whether a sample has landed past the target; further input is ignored.
    pub fn is_done(&self) -> bool {
        self.done
    }

    fn position(&mut self, sample: &VideoSample) -> u64 {
        let index = self.index;
        self.index += 1;
        match self.model {
            PositionModel::Timestamp => {
                let origin = *self.origin_us.get_or_insert(sample.timestamp_us);
                self.warp
                    .map_timestamp(sample.timestamp_us.saturating_sub(origin))
            }
            PositionModel::Elastic { expected } => self.warp.map_index(index, expected),
        }
    }

    /// Feed one decoded sample. Returns the previously held sample once its
    /// output span is known.
    pub fn push(&mut self, sample: VideoSample) -> Option<VideoSample> {
        if self.done {
            self.dropped += 1;
            return None;
        }

        let warped_start = self.position(&sample);
        let min = self.warp.min_sample_us();
        let last_start_limit = self.warp.target_duration_us().saturating_sub(min);

        let Some(held) = self.held.take() else {
            self.held = Some(Held {
                sample,
                start_us: warped_start.min(last_start_limit),
            });
            return None;
        };

        let start = warped_start.max(held.start_us);
        if start >= last_start_limit {
            self.done = true;
            self.dropped += 1;
            self.held = Some(held);
            return None;
        }

        if start - held.start_us < min {
            self.merged += 1;
            self.held = Some(held);
            return None;
        }

        let emitted = held.sample.retimed(held.start_us, start - held.start_us);
        self.emitted += 1;
        self.held = Some(Held {
            sample,
            start_us: start,
        });
        Some(emitted)
    }

    /// Flush the held sample, stretched to end exactly at the target.
    pub fn finish(mut self) -> (Option<VideoSample>, WarpStats) {
        let last = self.held.take().map(|held| {
            self.emitted += 1;
            let duration = self
                .warp
                .target_duration_us()
                .saturating_sub(held.start_us);
            held.sample.retimed(held.start_us, duration)
        });
        let stats = WarpStats {
            emitted: self.emitted,
            merged: self.merged,
            dropped: self.dropped,
        };
        (last, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: u64 = 4_000;

    fn frames(count: usize, step_us: u64) -> Vec<VideoSample> {
        (0..count)
            .map(|i| VideoSample::new(i as u64 * step_us, step_us, vec![i as u8]))
            .collect()
    }

    fn run(emitter: WarpEmitter, input: Vec<VideoSample>) -> (Vec<VideoSample>, WarpStats) {
        let mut emitter = emitter;
        let mut out = Vec::new();
        for sample in input {
            if emitter.is_done() {
                break;
            }
            out.extend(emitter.push(sample));
        }
        let (last, stats) = emitter.finish();
        out.extend(last);
        (out, stats)
    }

    #[test]
    fn test_positions_clamp_to_target() {
        let warp = TimeWarp::new(Curve::Linear, 1_000_000, 2_000_000, MIN);
        assert_eq!(warp.map_timestamp(250_000), 500_000);
        assert_eq!(warp.map_timestamp(3_000_000), 2_000_000);
        assert_eq!(warp.map_index(5, 10), 1_000_000);
    }

    #[test]
    fn test_linear_elastic_slows_down_evenly() {
        let warp = TimeWarp::new(Curve::Linear, 1_000_000, 2_000_000, MIN);
        let emitter = WarpEmitter::new(warp, PositionModel::Elastic { expected: 10 });
        let (out, stats) = run(emitter, frames(10, 100_000));

        assert_eq!(out.len(), 10);
        assert_eq!(stats.merged, 0);
        for (i, sample) in out.iter().enumerate() {
            assert_eq!(sample.timestamp_us, i as u64 * 200_000);
            assert_eq!(sample.duration_us, 200_000);
        }
    }

    #[test]
    fn test_under_delivery_stretches_last_sample() {
        let warp = TimeWarp::new(Curve::Linear, 1_000_000, 1_000_000, MIN);
        let emitter = WarpEmitter::new(warp, PositionModel::Elastic { expected: 10 });
        let (out, _) = run(emitter, frames(4, 100_000));

        let last = out.last().unwrap();
        assert_eq!(last.timestamp_us, 300_000);
        assert_eq!(last.end_us(), 1_000_000);
    }

    #[test]
    fn test_over_delivery_stops_at_target() {
        let warp = TimeWarp::new(Curve::Linear, 1_000_000, 1_000_000, MIN);
        let emitter = WarpEmitter::new(warp, PositionModel::Elastic { expected: 5 });
        let (out, stats) = run(emitter, frames(20, 50_000));

        assert_eq!(out.len(), 5);
        assert_eq!(stats.dropped, 1);
        assert_eq!(out.last().unwrap().end_us(), 1_000_000);
    }

    #[test]
    fn test_undersized_samples_merge() {
        // 100 frames squeezed into 0.2 s: 2 ms each, below the 4 ms floor.
        let warp = TimeWarp::new(Curve::Linear, 1_000_000, 200_000, MIN);
        let emitter = WarpEmitter::new(warp, PositionModel::Elastic { expected: 100 });
        let (out, stats) = run(emitter, frames(100, 10_000));

        assert!(stats.merged > 0);
        assert!(out.iter().all(|s| s.duration_us >= MIN));
        let total: u64 = out.iter().map(|s| s.duration_us).sum();
        assert_eq!(total, 200_000);
    }

    #[test]
    fn test_timestamp_model_uses_first_timestamp_as_origin() {
        let warp = TimeWarp::new(Curve::Linear, 400_000, 800_000, MIN);
        let emitter = WarpEmitter::new(warp, PositionModel::Timestamp);
        let input: Vec<_> = (0..4)
            .map(|i| VideoSample::new(5_000_000 + i * 100_000, 100_000, vec![0u8]))
            .collect();
        let (out, _) = run(emitter, input);

        let starts: Vec<u64> = out.iter().map(|s| s.timestamp_us).collect();
        assert_eq!(starts, vec![0, 200_000, 400_000, 600_000]);
        assert_eq!(out.last().unwrap().end_us(), 800_000);
    }

    #[test]
    fn test_backwards_timestamps_never_reorder_output() {
        let warp = TimeWarp::new(Curve::Linear, 400_000, 400_000, MIN);
        let emitter = WarpEmitter::new(warp, PositionModel::Timestamp);
        let input = vec![
            VideoSample::new(0, 100_000, vec![0u8]),
            VideoSample::new(200_000, 100_000, vec![1u8]),
            VideoSample::new(100_000, 100_000, vec![2u8]),
            VideoSample::new(300_000, 100_000, vec![3u8]),
        ];
        let (out, stats) = run(emitter, input);

        assert_eq!(stats.merged, 1);
        for pair in out.windows(2) {
            assert_eq!(pair[0].end_us(), pair[1].timestamp_us);
        }
    }

    #[test]
    fn test_empty_stream_emits_nothing() {
        let warp = TimeWarp::new(Curve::Linear, 1_000_000, 1_000_000, MIN);
        let emitter = WarpEmitter::new(warp, PositionModel::Elastic { expected: 1 });
        let (last, stats) = emitter.finish();
        assert!(last.is_none());
        assert_eq!(stats, WarpStats::default());
    }
}
