//! Stitching speed-curved clips into one container.

use curvecut_common::cancel::CancelFlag;
use curvecut_common::error::{CurvecutError, CurvecutResult};
use curvecut_processing_core::tiers::{build_ladder, even, select_tier};
use curvecut_project_model::media::{AudioBuffer, AudioCodec, EncodeTier, EncodedClip, Rotation};

use crate::config::PipelineConfig;
use crate::engine::{ContainerMuxer, MediaEngine, MuxerConfig};

/// The finished container plus what went into it.
#[derive(Debug, Clone)]
pub struct StitchOutput {
    pub bytes: Vec<u8>,
    /// Video duration: the sum of every clip's duration.
    pub duration_us: u64,
    pub tier: EncodeTier,
    pub rotation: Rotation,
    /// Negotiated audio codec, `None` for video-only output.
    pub audio_codec: Option<AudioCodec>,
    /// Start offset of each clip on the output timeline.
    pub clip_offsets_us: Vec<u64>,
}

struct ClipPlan {
    width: u32,
    height: u32,
    rotation: Rotation,
    bitrate: u32,
    declared_duration_us: u64,
}

/// Concatenates clips behind one shared encode tier.
pub struct Stitcher<'a> {
    engine: &'a dyn MediaEngine,
    config: PipelineConfig,
    cancel: CancelFlag,
}

impl<'a> Stitcher<'a> {
    pub fn new(engine: &'a dyn MediaEngine, config: PipelineConfig, cancel: CancelFlag) -> Self {
        Self {
            engine,
            config,
            cancel,
        }
    }

    /// Stitch `clips` in order, optionally adding `audio` after all video.
    /// `on_progress` receives stage-local percentages.
    pub fn stitch(
        &self,
        clips: &[EncodedClip],
        audio: Option<&AudioBuffer>,
        on_progress: &mut dyn FnMut(f64),
    ) -> CurvecutResult<StitchOutput> {
        if clips.is_empty() {
            return Err(CurvecutError::empty_input("no clips to stitch"));
        }

        let plans = clips
            .iter()
            .enumerate()
            .map(|(index, clip)| self.plan_clip(index, clip))
            .collect::<CurvecutResult<Vec<_>>>()?;

        let width = even(plans.iter().map(|p| p.width).max().unwrap_or(0));
        let height = even(plans.iter().map(|p| p.height).max().unwrap_or(0));
        let bitrate = plans.iter().map(|p| p.bitrate).max().unwrap_or(0);
        let rotation = plans[0].rotation;
        if let Some((index, other)) = plans
            .iter()
            .enumerate()
            .find(|(_, p)| p.rotation != rotation)
        {
            tracing::warn!(
                first_rotation = rotation.degrees(),
                clip_index = index,
                clip_rotation = other.rotation.degrees(),
                "Clip rotations differ; keeping the first clip's rotation"
            );
        }

        let ladder = build_ladder(width, height, bitrate, &self.config.tiers);
        let tier = select_tier(&ladder, |tier| self.engine.can_encode_video(tier))?;
        tracing::info!(
            clips = clips.len(),
            canonical_width = width,
            canonical_height = height,
            tier = %tier,
            "Stitching clips"
        );

        let mut muxer = self.engine.open_muxer(&MuxerConfig {
            tier: tier.clone(),
            rotation,
        })?;

        let mut cumulative_us = 0u64;
        let mut clip_offsets_us = Vec::with_capacity(clips.len());
        for (index, (clip, plan)) in clips.iter().zip(&plans).enumerate() {
            self.cancel.check("stitching")?;
            clip_offsets_us.push(cumulative_us);

            let mut decoder = self.engine.open_video_decoder(&clip.bytes)?;
            let mut first_ts = None;
            let mut observed_end_us = 0u64;
            while let Some(sample) = decoder.next_sample()? {
                let origin = *first_ts.get_or_insert(sample.timestamp_us);
                let relative = sample.timestamp_us.saturating_sub(origin);
                observed_end_us = observed_end_us.max(relative + sample.duration_us);
                let shifted = sample.retimed(cumulative_us + relative, sample.duration_us);
                muxer.push_video(shifted)?;
            }
            drop(decoder);

            if first_ts.is_none() {
                return Err(CurvecutError::no_video_track(format!(
                    "clip {index} decoded no video samples"
                )));
            }
            let clip_duration_us = plan.declared_duration_us.max(observed_end_us);
            tracing::debug!(
                clip_index = index,
                offset_us = cumulative_us,
                duration_us = clip_duration_us,
                "Clip appended"
            );
            cumulative_us += clip_duration_us;
            on_progress(90.0 * (index + 1) as f64 / clips.len() as f64);
        }

        let audio_codec = match audio.filter(|buffer| !buffer.is_empty()) {
            Some(buffer) => self.write_audio(muxer.as_mut(), buffer)?,
            None => None,
        };

        let bytes = muxer.finalize()?;
        on_progress(100.0);

        Ok(StitchOutput {
            bytes,
            duration_us: cumulative_us,
            tier,
            rotation,
            audio_codec,
            clip_offsets_us,
        })
    }

    fn plan_clip(&self, index: usize, clip: &EncodedClip) -> CurvecutResult<ClipPlan> {
        let report = self.engine.probe(&clip.bytes)?;
        let video = report.video.ok_or_else(|| {
            CurvecutError::no_video_track(format!("clip {index} has no video track"))
        })?;
        Ok(ClipPlan {
            width: video.width,
            height: video.height,
            rotation: video.rotation,
            bitrate: video.bitrate,
            declared_duration_us: report.best_duration_us().unwrap_or(clip.duration_us),
        })
    }

    /// Negotiate a codec and write the buffer in one call. Returns `None` when
    /// no codec is supported; the output is then video-only.
    fn write_audio(
        &self,
        muxer: &mut (dyn ContainerMuxer + 'a),
        buffer: &AudioBuffer,
    ) -> CurvecutResult<Option<AudioCodec>> {
        let codec = AudioCodec::PREFERENCE
            .into_iter()
            .find(|codec| {
                self.engine
                    .can_encode_audio(*codec, buffer.sample_rate, buffer.channels)
            });
        let Some(codec) = codec else {
            tracing::warn!(
                sample_rate = buffer.sample_rate,
                channels = buffer.channels,
                "No supported audio codec; writing video-only output"
            );
            return Ok(None);
        };

        muxer.add_audio_track(codec, buffer.sample_rate, buffer.channels)?;
        muxer.push_audio(buffer)?;
        tracing::debug!(codec = codec.codec_string(), frames = buffer.frames(), "Audio written");
        Ok(Some(codec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryCapabilities, MemoryContainer, MemoryEngine};
    use curvecut_project_model::media::secs_to_us;

    fn clip(width: u32, height: u32, secs: f64, rotation: Rotation) -> EncodedClip {
        let mut container = MemoryContainer::synthetic_video(width, height, 10.0, secs, 4_000_000);
        if let Some(track) = container.video.as_mut() {
            track.rotation = rotation;
        }
        EncodedClip {
            bytes: container.to_bytes().unwrap().into(),
            duration_us: secs_to_us(secs),
            width,
            height,
        }
    }

    fn stitcher(engine: &MemoryEngine) -> Stitcher<'_> {
        Stitcher::new(engine, PipelineConfig::default(), CancelFlag::new())
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let engine = MemoryEngine::new();
        let err = stitcher(&engine).stitch(&[], None, &mut |_| {}).unwrap_err();
        assert!(matches!(err, CurvecutError::EmptyInput { .. }));
    }

    #[test]
    fn test_clip_starts_are_cumulative() {
        let engine = MemoryEngine::new();
        let clips = vec![
            clip(640, 360, 1.5, Rotation::R0),
            clip(640, 360, 1.5, Rotation::R0),
            clip(640, 360, 1.5, Rotation::R0),
        ];
        let output = stitcher(&engine).stitch(&clips, None, &mut |_| {}).unwrap();

        assert_eq!(output.clip_offsets_us, vec![0, 1_500_000, 3_000_000]);
        assert_eq!(output.duration_us, 4_500_000);

        let container = MemoryContainer::from_bytes(&output.bytes).unwrap();
        let samples = container.video.unwrap().samples;
        assert_eq!(samples.len(), 45);
        assert_eq!(samples[15].timestamp_us, 1_500_000);
        assert_eq!(samples[30].timestamp_us, 3_000_000);
        for pair in samples.windows(2) {
            assert_eq!(
                pair[0].timestamp_us + pair[0].duration_us,
                pair[1].timestamp_us
            );
        }
    }

    #[test]
    fn test_canonical_resolution_is_the_largest_clip() {
        let engine = MemoryEngine::new();
        let clips = vec![
            clip(640, 360, 0.5, Rotation::R0),
            clip(1281, 721, 0.5, Rotation::R90),
        ];
        let output = stitcher(&engine).stitch(&clips, None, &mut |_| {}).unwrap();
        assert_eq!((output.tier.width, output.tier.height), (1280, 720));
        assert_eq!(output.rotation, Rotation::R0);
    }

    #[test]
    fn test_audio_falls_through_codec_preference() {
        let engine = MemoryEngine::with_capabilities(MemoryCapabilities {
            audio_codecs: vec![AudioCodec::Mp3, AudioCodec::Opus],
            ..Default::default()
        });
        let buffer = AudioBuffer {
            sample_rate: 1_000,
            channels: 2,
            samples: vec![0.1; 2_000],
        };
        let output = stitcher(&engine)
            .stitch(&[clip(64, 64, 1.0, Rotation::R0)], Some(&buffer), &mut |_| {})
            .unwrap();
        assert_eq!(output.audio_codec, Some(AudioCodec::Opus));
    }

    #[test]
    fn test_unsupported_audio_gives_video_only_output() {
        let engine = MemoryEngine::with_capabilities(MemoryCapabilities {
            audio_codecs: Vec::new(),
            ..Default::default()
        });
        let buffer = AudioBuffer {
            sample_rate: 1_000,
            channels: 1,
            samples: vec![0.1; 1_000],
        };
        let output = stitcher(&engine)
            .stitch(&[clip(64, 64, 1.0, Rotation::R0)], Some(&buffer), &mut |_| {})
            .unwrap();
        assert_eq!(output.audio_codec, None);
        let container = MemoryContainer::from_bytes(&output.bytes).unwrap();
        assert!(container.audio.is_none());
    }
}
