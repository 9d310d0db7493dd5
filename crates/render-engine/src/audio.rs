//! Audio preparation: decode, loop-fill to length, apply fades.

use curvecut_common::error::{CurvecutError, CurvecutResult};
use curvecut_processing_core::envelope::{apply_fades, loop_fill, offset_frames, FadePlan};
use curvecut_project_model::media::AudioBuffer;
use curvecut_project_model::request::AudioTrack;

use crate::engine::MediaEngine;

/// Builds the single audio buffer written under the stitched video.
pub struct AudioPreparer<'a> {
    engine: &'a dyn MediaEngine,
    min_duration_secs: f64,
}

impl<'a> AudioPreparer<'a> {
    pub fn new(engine: &'a dyn MediaEngine, min_duration_secs: f64) -> Self {
        Self {
            engine,
            min_duration_secs,
        }
    }

    /// Decode `track` and shape it to `target_duration_secs` (never shorter than
    /// the configured minimum), looping the source as needed.
    pub fn prepare(&self, track: &AudioTrack, target_duration_secs: f64) -> CurvecutResult<AudioBuffer> {
        let decoded = self
            .engine
            .decode_audio(track.source.bytes())?
            .ok_or_else(|| {
                CurvecutError::no_audio_track(format!(
                    "{} has no audio track",
                    track.source.identity()
                ))
            })?;
        if decoded.is_empty() || decoded.sample_rate == 0 {
            return Err(CurvecutError::no_audio_track(format!(
                "{} has an empty audio track",
                track.source.identity()
            )));
        }

        let duration_secs = if target_duration_secs.is_finite() {
            target_duration_secs.max(self.min_duration_secs)
        } else {
            self.min_duration_secs
        };
        let frames = (duration_secs * f64::from(decoded.sample_rate)).round() as usize;
        let start = offset_frames(track.offset_secs, decoded.sample_rate, decoded.frames());

        let mut samples = loop_fill(&decoded, frames, start);
        let plan = FadePlan::new(
            frames,
            decoded.sample_rate,
            track.fade_in_secs,
            track.fade_out_secs,
        );
        apply_fades(&mut samples, decoded.channels, plan);

        tracing::debug!(
            source = track.source.identity(),
            sample_rate = decoded.sample_rate,
            channels = decoded.channels,
            source_frames = decoded.frames(),
            frames,
            start_frame = start,
            fade_in_frames = plan.fade_in_frames,
            fade_out_frames = plan.fade_out_frames,
            "Audio prepared"
        );

        Ok(AudioBuffer {
            sample_rate: decoded.sample_rate,
            channels: decoded.channels,
            samples,
        })
    }
}
