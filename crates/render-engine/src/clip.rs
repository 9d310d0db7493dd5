//! Speed-curve clip processing: one source clip in, one target-duration clip out.

use curvecut_common::cancel::CancelFlag;
use curvecut_common::error::{CurvecutError, CurvecutResult};
use curvecut_processing_core::curve_choice;
use curvecut_processing_core::easing::Curve;
use curvecut_processing_core::tiers::{build_ladder, select_tier};
use curvecut_processing_core::time_warp::{PositionModel, TimeWarp, WarpEmitter};
use curvecut_project_model::easing::EasingSpec;
use curvecut_project_model::media::{secs_to_us, us_to_secs, ClipMetadata, EncodedClip};
use curvecut_project_model::segment::MediaSource;

use crate::config::PipelineConfig;
use crate::engine::{MediaEngine, MuxerConfig, ProbeReport, VideoTrackInfo};

/// Progress checkpoints (percent of one clip).
const PROGRESS_METADATA: f64 = 18.0;
const PROGRESS_TIER: f64 = 22.0;
const PROGRESS_LOOP_START: f64 = 25.0;
const PROGRESS_LOOP_END: f64 = 90.0;
const PROGRESS_FINALIZE: f64 = 95.0;
const PROGRESS_DONE: f64 = 100.0;

/// Inputs for one clip.
#[derive(Debug, Clone)]
pub struct ClipJob<'a> {
    pub source: &'a MediaSource,
    /// Used when the container declares no duration.
    pub duration_hint_secs: Option<f64>,
    pub target_duration_us: u64,
    pub easing: EasingSpec,
}

/// Decodes, warps, and re-encodes single clips.
pub struct SpeedCurveProcessor<'a> {
    engine: &'a dyn MediaEngine,
    config: PipelineConfig,
    cancel: CancelFlag,
}

struct Probed {
    source: MediaSource,
    report: ProbeReport,
    video: VideoTrackInfo,
}

impl<'a> SpeedCurveProcessor<'a> {
    pub fn new(engine: &'a dyn MediaEngine, config: PipelineConfig, cancel: CancelFlag) -> Self {
        Self {
            engine,
            config,
            cancel,
        }
    }

    /// Process one clip. `on_progress` receives clip-local percentages.
    pub fn process(
        &self,
        job: &ClipJob<'_>,
        on_progress: &mut dyn FnMut(f64),
    ) -> CurvecutResult<EncodedClip> {
        let Probed {
            source,
            report,
            video,
        } = self.probe_with_refetch(job.source)?;
        let bytes = source.bytes();

        let scan = self.engine.scan_packets(bytes)?;
        let source_duration_us = report
            .best_duration_us()
            .or_else(|| job.duration_hint_secs.map(secs_to_us).filter(|d| *d > 0))
            .or_else(|| {
                scan.map(|s| s.last_timestamp_us.saturating_sub(s.first_timestamp_us))
                    .filter(|d| *d > 0)
            })
            .unwrap_or(0);
        let expected = match scan {
            Some(scan) => scan.sample_count,
            None => (us_to_secs(source_duration_us) * video.frame_rate).round() as usize,
        }
        .max(1);

        let metadata = ClipMetadata {
            duration_secs: us_to_secs(source_duration_us),
            bitrate: video.bitrate,
            frame_rate: video.frame_rate,
            width: video.width,
            height: video.height,
            rotation: video.rotation,
        };
        let easing = curve_choice::adapt(job.easing, &metadata);
        tracing::debug!(
            source = source.identity(),
            source_duration_us,
            expected_samples = expected,
            easing = %easing,
            "Clip analyzed"
        );
        on_progress(PROGRESS_METADATA);

        let ladder = build_ladder(video.width, video.height, video.bitrate, &self.config.tiers);
        let tier = select_tier(&ladder, |tier| self.engine.can_encode_video(tier))?;
        on_progress(PROGRESS_TIER);

        let warp = TimeWarp::new(
            Curve::from_spec(easing),
            source_duration_us,
            job.target_duration_us,
            self.config.min_sample_us,
        );
        let mut emitter =
            WarpEmitter::new(warp, PositionModel::from_config(self.config.warp_model, expected));

        let mut decoder = self.engine.open_video_decoder(bytes)?;
        let mut muxer = self.engine.open_muxer(&MuxerConfig {
            tier: tier.clone(),
            rotation: video.rotation,
        })?;
        on_progress(PROGRESS_LOOP_START);

        let mut decoded = 0usize;
        let mut last_reported = PROGRESS_LOOP_START;
        while let Some(sample) = decoder.next_sample()? {
            self.cancel.check("applying curves")?;
            decoded += 1;
            if let Some(out) = emitter.push(sample) {
                muxer.push_video(out)?;
            }
            if emitter.is_done() {
                break;
            }

            let fraction = (decoded as f64 / expected as f64).min(1.0);
            let percent = PROGRESS_LOOP_START + (PROGRESS_LOOP_END - PROGRESS_LOOP_START) * fraction;
            if percent - last_reported >= 1.0 {
                on_progress(percent);
                last_reported = percent;
            }
        }
        drop(decoder);

        let (last, stats) = emitter.finish();
        let last = last.ok_or_else(|| {
            CurvecutError::no_video_track(format!("{} decoded no video samples", source.identity()))
        })?;
        muxer.push_video(last)?;
        on_progress(PROGRESS_FINALIZE);

        let bytes = muxer.finalize()?;
        on_progress(PROGRESS_DONE);

        tracing::info!(
            source = source.identity(),
            tier = %tier,
            decoded,
            emitted = stats.emitted,
            merged = stats.merged,
            dropped = stats.dropped,
            target_us = job.target_duration_us,
            "Speed curve applied"
        );

        Ok(EncodedClip {
            bytes: bytes.into(),
            duration_us: job.target_duration_us,
            width: tier.width,
            height: tier.height,
        })
    }

    /// Probe, re-fetching the source once if the engine cannot read it.
    fn probe_with_refetch(&self, source: &MediaSource) -> CurvecutResult<Probed> {
        let (source, report) = match self.engine.probe(source.bytes()) {
            Ok(report) => (source.clone(), report),
            Err(CurvecutError::UnreadableSource { message, .. }) => {
                tracing::warn!(
                    source = source.identity(),
                    error = %message,
                    "Source unreadable, re-fetching once"
                );
                let fresh = match source.refetch() {
                    Some(Ok(fresh)) => fresh,
                    Some(Err(e)) => {
                        tracing::warn!(source = source.identity(), error = %e, "Re-fetch failed");
                        return Err(no_media(source));
                    }
                    None => return Err(no_media(source)),
                };
                match self.engine.probe(fresh.bytes()) {
                    Ok(report) => (fresh, report),
                    Err(CurvecutError::UnreadableSource { .. }) => return Err(no_media(source)),
                    Err(other) => return Err(other),
                }
            }
            Err(other) => return Err(other),
        };

        let video = report.video.ok_or_else(|| {
            CurvecutError::no_video_track(format!("{} has no video track", source.identity()))
        })?;
        Ok(Probed {
            source,
            report,
            video,
        })
    }
}

fn no_media(source: &MediaSource) -> CurvecutError {
    CurvecutError::unreadable(source.identity(), "no media in source")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryCapabilities, MemoryContainer, MemoryEngine};
    use curvecut_project_model::easing::EasingPreset;

    fn clip_bytes(width: u32, height: u32, secs: f64) -> Vec<u8> {
        MemoryContainer::synthetic_video(width, height, 30.0, secs, 6_000_000)
            .to_bytes()
            .unwrap()
    }

    fn run(
        engine: &MemoryEngine,
        source: &MediaSource,
        target_us: u64,
    ) -> (CurvecutResult<EncodedClip>, Vec<f64>) {
        let processor = SpeedCurveProcessor::new(engine, PipelineConfig::default(), CancelFlag::new());
        let job = ClipJob {
            source,
            duration_hint_secs: None,
            target_duration_us: target_us,
            easing: EasingSpec::Preset(EasingPreset::EaseInOutCubic),
        };
        let mut checkpoints = Vec::new();
        let result = processor.process(&job, &mut |p| checkpoints.push(p));
        (result, checkpoints)
    }

    #[test]
    fn test_output_matches_target_duration() {
        let engine = MemoryEngine::new();
        let source = MediaSource::from_bytes("clip", clip_bytes(1280, 720, 2.0));
        let (result, checkpoints) = run(&engine, &source, 1_500_000);
        let clip = result.unwrap();

        assert_eq!(clip.duration_us, 1_500_000);
        let container = MemoryContainer::from_bytes(&clip.bytes).unwrap();
        let video = container.video.unwrap();
        let end = video.samples.last().map(|s| s.timestamp_us + s.duration_us);
        assert_eq!(end, Some(1_500_000));
        assert_eq!(video.codec_profile.as_deref(), Some("avc1.640033"));

        assert_eq!(checkpoints.first(), Some(&PROGRESS_METADATA));
        assert_eq!(checkpoints.last(), Some(&PROGRESS_DONE));
        assert!(checkpoints.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(engine.counters().open_handles, 0);
    }

    #[test]
    fn test_falls_back_to_lower_tier() {
        let engine = MemoryEngine::with_capabilities(MemoryCapabilities {
            max_video_pixels: Some(1280 * 720),
            ..Default::default()
        });
        let source = MediaSource::from_bytes("4k", clip_bytes(3840, 2160, 1.0));
        let clip = run(&engine, &source, 1_000_000).0.unwrap();
        assert_eq!((clip.width, clip.height), (1280, 720));
    }

    #[test]
    fn test_no_tier_means_no_encoder() {
        let engine = MemoryEngine::with_capabilities(MemoryCapabilities::no_video());
        let source = MediaSource::from_bytes("clip", clip_bytes(640, 360, 1.0));
        let err = run(&engine, &source, 1_000_000).0.unwrap_err();
        assert!(matches!(err, CurvecutError::NoSupportedEncodeTier { .. }));
        assert_eq!(engine.counters().encoders_opened, 0);
        assert_eq!(engine.counters().decoders_opened, 0);
    }

    #[test]
    fn test_audio_only_source_has_no_video() {
        let engine = MemoryEngine::new();
        let bytes = MemoryContainer::synthetic_tone(8_000, 1, 1.0, 440.0)
            .to_bytes()
            .unwrap();
        let source = MediaSource::from_bytes("tone", bytes);
        let err = run(&engine, &source, 1_000_000).0.unwrap_err();
        assert!(matches!(err, CurvecutError::NoVideoTrack { .. }));
    }

    #[test]
    fn test_unreadable_memory_source_reports_no_media() {
        let engine = MemoryEngine::new();
        let source = MediaSource::from_bytes("broken", b"garbage".to_vec());
        let err = run(&engine, &source, 1_000_000).0.unwrap_err();
        match err {
            CurvecutError::UnreadableSource { source_id, message } => {
                assert_eq!(source_id, "broken");
                assert_eq!(message, "no media in source");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_refetch_recovers_stale_bytes() {
        let path = std::env::temp_dir().join("curvecut_test_refetch_clip.json");
        std::fs::write(&path, b"partial").unwrap();
        let stale = MediaSource::from_path(&path).unwrap();
        std::fs::write(&path, clip_bytes(320, 240, 1.0)).unwrap();

        let engine = MemoryEngine::new();
        let clip = run(&engine, &stale, 500_000).0.unwrap();
        assert_eq!(clip.duration_us, 500_000);
        assert_eq!(engine.counters().probes, 2);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_duration_hint_applies_when_container_declares_none() {
        use curvecut_common::config::WarpModel;

        // 2 s of samples at 10 fps, but neither the container nor the track
        // declares a duration.
        let mut container = MemoryContainer::synthetic_video(320, 240, 10.0, 2.0, 1_000_000);
        container.duration_us = None;
        if let Some(track) = container.video.as_mut() {
            track.duration_us = None;
        }
        let source = MediaSource::from_bytes("undeclared", container.to_bytes().unwrap());

        let engine = MemoryEngine::new();
        let config = PipelineConfig::default().with_warp_model(WarpModel::Timestamp);
        let processor = SpeedCurveProcessor::new(&engine, config, CancelFlag::new());
        let output = |hint: Option<f64>| {
            let job = ClipJob {
                source: &source,
                duration_hint_secs: hint,
                target_duration_us: 1_500_000,
                easing: EasingSpec::Preset(EasingPreset::Linear),
            };
            let clip = processor.process(&job, &mut |_| {}).unwrap();
            MemoryContainer::from_bytes(&clip.bytes)
                .unwrap()
                .video
                .unwrap()
                .samples
        };

        // A 1 s hint maps the first second onto the whole target.
        let hinted = output(Some(1.0));
        assert_eq!(hinted.len(), 10);
        assert_eq!(hinted[1].timestamp_us, 150_000);
        assert_eq!(hinted.last().map(|s| s.data[0]), Some(9));
        assert_eq!(hinted.last().map(|s| s.timestamp_us + s.duration_us), Some(1_500_000));

        // Without a hint the packet scan span (1.9 s) is used; the final
        // sample lands on the target and is dropped.
        let scanned = output(None);
        assert_eq!(scanned.len(), 19);
        assert_eq!(scanned.last().map(|s| s.data[0]), Some(18));
    }

    #[test]
    fn test_decode_failure_releases_handles() {
        let engine = MemoryEngine::with_capabilities(MemoryCapabilities {
            fail_decode_after: Some(5),
            ..Default::default()
        });
        let source = MediaSource::from_bytes("clip", clip_bytes(640, 360, 1.0));
        let err = run(&engine, &source, 1_000_000).0.unwrap_err();
        assert!(matches!(err, CurvecutError::DecodeFailure { .. }));
        assert_eq!(engine.counters().open_handles, 0);
    }

    #[test]
    fn test_cancelled_flag_stops_processing() {
        let engine = MemoryEngine::new();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let processor = SpeedCurveProcessor::new(&engine, PipelineConfig::default(), cancel);
        let source = MediaSource::from_bytes("clip", clip_bytes(640, 360, 1.0));
        let job = ClipJob {
            source: &source,
            duration_hint_secs: None,
            target_duration_us: 1_000_000,
            easing: EasingSpec::default(),
        };
        let err = processor.process(&job, &mut |_| {}).unwrap_err();
        assert!(matches!(err, CurvecutError::Cancelled { .. }));
        assert_eq!(engine.counters().open_handles, 0);
    }
}
