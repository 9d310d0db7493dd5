//! Loop-fill and linear fade envelopes over interleaved `f32` PCM.

use curvecut_project_model::media::AudioBuffer;

/// Fade lengths in frames, already scaled to fit the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadePlan {
    pub fade_in_frames: usize,
    pub fade_out_frames: usize,
}

impl FadePlan {
    /// Convert fade seconds to frames. If the two fades together exceed the
    /// buffer, both shrink by the same factor so they never overlap.
    pub fn new(total_frames: usize, sample_rate: u32, fade_in_secs: f64, fade_out_secs: f64) -> Self {
        let to_frames = |secs: f64| {
            if !secs.is_finite() || secs <= 0.0 {
                0.0
            } else {
                secs * f64::from(sample_rate)
            }
        };
        let mut fade_in = to_frames(fade_in_secs);
        let mut fade_out = to_frames(fade_out_secs);

        let sum = fade_in + fade_out;
        if sum > total_frames as f64 {
            let scale = total_frames as f64 / sum;
            fade_in *= scale;
            fade_out *= scale;
        }

        let fade_in_frames = (fade_in.round() as usize).min(total_frames);
        let fade_out_frames =
            (fade_out.round() as usize).min(total_frames.saturating_sub(fade_in_frames));
        Self {
            fade_in_frames,
            fade_out_frames,
        }
    }

    /// Gain applied to `frame` of a `total_frames` buffer.
    pub fn gain(&self, frame: usize, total_frames: usize) -> f32 {
        let mut gain = 1.0f64;
        if self.fade_in_frames > 0 && frame < self.fade_in_frames {
            gain *= frame as f64 / self.fade_in_frames as f64;
        }
        let remaining = total_frames.saturating_sub(frame);
        if self.fade_out_frames > 0 && remaining <= self.fade_out_frames {
            gain *= remaining as f64 / self.fade_out_frames as f64;
        }
        gain as f32
    }
}

/// Multiply every channel of each frame by the fade gain.
pub fn apply_fades(samples: &mut [f32], channels: u16, plan: FadePlan) {
    let channels = usize::from(channels.max(1));
    let total_frames = samples.len() / channels;
    for (frame, chunk) in samples.chunks_exact_mut(channels).enumerate() {
        let gain = plan.gain(frame, total_frames);
        if gain != 1.0 {
            for sample in chunk {
                *sample *= gain;
            }
        }
    }
}

/// Frame index where playback starts for an offset in seconds, wrapped to the
/// source length (negative offsets wrap from the end).
pub fn offset_frames(offset_secs: f64, sample_rate: u32, source_frames: usize) -> usize {
    if source_frames == 0 || !offset_secs.is_finite() {
        return 0;
    }
    let frames = (offset_secs * f64::from(sample_rate)).round() as i64;
    frames.rem_euclid(source_frames as i64) as usize
}

/// `frames_needed` frames of `source`, starting at `start_frame` and looping
/// back to the beginning as often as needed. Truncates when the source is
/// longer than needed.
pub fn loop_fill(source: &AudioBuffer, frames_needed: usize, start_frame: usize) -> Vec<f32> {
    let channels = usize::from(source.channels.max(1));
    let source_frames = source.frames();
    let mut out = Vec::with_capacity(frames_needed * channels);
    if source_frames == 0 {
        out.resize(frames_needed * channels, 0.0);
        return out;
    }

    let mut cursor = start_frame % source_frames;
    let mut remaining = frames_needed;
    while remaining > 0 {
        let run = remaining.min(source_frames - cursor);
        out.extend_from_slice(&source.samples[cursor * channels..(cursor + run) * channels]);
        remaining -= run;
        cursor = 0;
    }
    out
}
