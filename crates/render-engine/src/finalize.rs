//! Finalize orchestration.
//!
//! Runs the stages in order:
//!
//! ```text
//! segments ──► ApplyingCurves (0–50%) ──► cache
//!                                          │
//! audio ─────► MixingAudio (50–75%) ───────┤
//!                                          ▼
//!                               Stitching (75|50–100%) ──► container bytes
//! ```
//!
//! The cache goes in by value and always comes back out, on success and on
//! failure, so segments finished before an error are not re-encoded next time.

use std::collections::HashSet;
use std::sync::Arc;

use curvecut_common::cancel::CancelFlag;
use curvecut_common::error::{CurvecutError, CurvecutResult};
use curvecut_project_model::cache::SpeedCurvedCache;
use curvecut_project_model::media::{
    us_to_secs, AudioBuffer, AudioCodec, EncodeTier, EncodedClip,
};
use curvecut_project_model::request::{FinalizeRequest, UpdateReason};
use curvecut_project_model::segment::SegmentId;

use crate::audio::AudioPreparer;
use crate::clip::{ClipJob, SpeedCurveProcessor};
use crate::config::PipelineConfig;
use crate::engine::MediaEngine;
use crate::progress::{FinalizeStage, ProgressEvent, ProgressSink, ProgressSpan};
use crate::stitch::Stitcher;

const CURVES_END: f64 = 50.0;
const AUDIO_END: f64 = 75.0;

/// Successful finalize output.
#[derive(Debug, Clone)]
pub struct FinalizeResult {
    /// Final container bytes.
    pub bytes: Vec<u8>,
    pub duration_us: u64,
    /// Refreshed cache for the next run.
    pub cache: SpeedCurvedCache,
    pub report: FinalizeReport,
}

/// What a run did.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizeReport {
    pub reason: UpdateReason,
    /// Segments re-encoded this run.
    pub processed: Vec<SegmentId>,
    /// Segments served from the cache.
    pub reused: Vec<SegmentId>,
    /// Cache entries dropped because their segment left the request.
    pub evicted: Vec<SegmentId>,
    pub tier: EncodeTier,
    pub audio_codec: Option<AudioCodec>,
    /// Set when audio was requested but could not be used.
    pub audio_error: Option<String>,
}

/// A failed run. The cache keeps every segment completed before the failure.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct FinalizeFailure {
    #[source]
    pub error: CurvecutError,
    pub cache: SpeedCurvedCache,
}

/// Sequences processor, preparer, and stitcher for one request.
pub struct Finalizer<'a> {
    engine: &'a dyn MediaEngine,
    config: PipelineConfig,
    progress: ProgressSink,
    cancel: CancelFlag,
}

impl<'a> Finalizer<'a> {
    pub fn new(engine: &'a dyn MediaEngine, config: PipelineConfig) -> Self {
        Self {
            engine,
            config,
            progress: ProgressSink::disabled(),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run one finalize.
    pub fn run(
        &self,
        request: &FinalizeRequest,
        mut cache: SpeedCurvedCache,
    ) -> Result<FinalizeResult, FinalizeFailure> {
        tracing::info!(
            reason = request.reason.as_str(),
            segments = request.segments.len(),
            audio = request.audio.is_some(),
            cached = cache.len(),
            "Starting finalize"
        );

        match self.run_stages(request, &mut cache) {
            Ok((bytes, duration_us, report)) => {
                self.progress
                    .emit(ProgressEvent::new(FinalizeStage::Complete, 100.0, "Finalize complete"));
                tracing::info!(
                    duration_us,
                    bytes = bytes.len(),
                    processed = report.processed.len(),
                    reused = report.reused.len(),
                    "Finalize complete"
                );
                Ok(FinalizeResult {
                    bytes,
                    duration_us,
                    cache,
                    report,
                })
            }
            Err(error) => {
                tracing::error!(error = %error, cached = cache.len(), "Finalize failed");
                self.progress.emit(ProgressEvent::new(
                    FinalizeStage::Error,
                    0.0,
                    error.to_string(),
                ));
                Err(FinalizeFailure { error, cache })
            }
        }
    }

    fn run_stages(
        &self,
        request: &FinalizeRequest,
        cache: &mut SpeedCurvedCache,
    ) -> CurvecutResult<(Vec<u8>, u64, FinalizeReport)> {
        if request.segments.is_empty() {
            return Err(CurvecutError::empty_input("finalize request has no segments"));
        }

        let evicted = self.apply_cache_policy(request, cache);
        let (clips, processed, reused) = self.apply_curves(request, cache)?;

        let audio_span = ProgressSpan::new(CURVES_END, AUDIO_END);
        let (audio, audio_error) = match &request.audio {
            Some(track) => {
                self.cancel.check("mixing audio")?;
                self.progress.emit(ProgressEvent::new(
                    FinalizeStage::MixingAudio,
                    audio_span.at(0.0),
                    "Preparing audio",
                ));
                // Sized to the clips actually stitched, which can differ from the
                // nominal targets (minimum floor, reused stale clips).
                let video_secs = us_to_secs(clips.iter().map(|clip| clip.duration_us).sum());
                let preparer = AudioPreparer::new(self.engine, self.config.min_audio_secs);
                let prepared = match preparer.prepare(track, video_secs) {
                    Ok(buffer) => (Some(buffer), None),
                    Err(e) if e.is_audio_recoverable() => {
                        tracing::warn!(error = %e, "Audio unavailable; continuing video-only");
                        (None, Some(e.to_string()))
                    }
                    Err(e) => return Err(e),
                };
                self.progress.emit(ProgressEvent::new(
                    FinalizeStage::MixingAudio,
                    audio_span.at(100.0),
                    "Audio ready",
                ));
                prepared
            }
            None => (None, None),
        };

        let stitch_span = if request.audio.is_some() {
            ProgressSpan::new(AUDIO_END, 100.0)
        } else {
            ProgressSpan::new(CURVES_END, 100.0)
        };
        let output = self.stitch(&clips, audio.as_ref(), stitch_span)?;

        Ok((
            output.bytes,
            output.duration_us,
            FinalizeReport {
                reason: request.reason,
                processed,
                reused,
                evicted,
                tier: output.tier,
                audio_codec: output.audio_codec,
                audio_error,
            },
        ))
    }

    /// Drop entries the request no longer needs. Returns the evicted ids.
    fn apply_cache_policy(
        &self,
        request: &FinalizeRequest,
        cache: &mut SpeedCurvedCache,
    ) -> Vec<SegmentId> {
        let present: HashSet<SegmentId> = request.segments.iter().map(|s| s.id).collect();
        let evicted = cache.retain(|id| present.contains(&id));
        if !evicted.is_empty() {
            tracing::debug!(evicted = ?evicted, "Dropped cache entries for removed segments");
        }

        match request.reason {
            UpdateReason::Full => {
                if !cache.is_empty() {
                    tracing::debug!(entries = cache.len(), "Full update; clearing cache");
                }
                cache.clear();
            }
            UpdateReason::SegmentParamsChanged => {
                for id in &request.changed_segments {
                    if cache.invalidate(*id) {
                        tracing::debug!(segment_id = %id, "Invalidated changed segment");
                    }
                }
            }
            UpdateReason::AudioFileChanged | UpdateReason::AudioFadeOnly => {}
        }
        evicted
    }

    #[allow(clippy::type_complexity)]
    fn apply_curves(
        &self,
        request: &FinalizeRequest,
        cache: &mut SpeedCurvedCache,
    ) -> CurvecutResult<(Vec<EncodedClip>, Vec<SegmentId>, Vec<SegmentId>)> {
        let total = request.segments.len();
        let processor = SpeedCurveProcessor::new(self.engine, self.config, self.cancel.clone());

        let mut clips = Vec::with_capacity(total);
        let mut processed = Vec::new();
        let mut reused = Vec::new();

        for (index, segment) in request.segments.iter().enumerate() {
            self.cancel.check("applying curves")?;
            let span = ProgressSpan::new(
                CURVES_END * index as f64 / total as f64,
                CURVES_END * (index + 1) as f64 / total as f64,
            );

            let cached = if request.reason.reuses_curved_clips() {
                cache.get(segment.id).map(|entry| entry.clip.clone())
            } else {
                cache.get_valid(segment).cloned()
            };
            if let Some(clip) = cached {
                tracing::debug!(segment_id = %segment.id, "Reusing cached curved clip");
                self.progress.emit(
                    ProgressEvent::new(
                        FinalizeStage::ApplyingCurves,
                        span.at(100.0),
                        format!("Reused {}", segment.id),
                    )
                    .with_position(index, total),
                );
                reused.push(segment.id);
                clips.push(clip);
                continue;
            }

            if request.reason.reuses_curved_clips() {
                tracing::info!(
                    segment_id = %segment.id,
                    reason = request.reason.as_str(),
                    "No cached clip for segment; processing it"
                );
            }

            self.progress.emit(
                ProgressEvent::new(
                    FinalizeStage::ApplyingCurves,
                    span.at(0.0),
                    format!("Applying curve to {}", segment.id),
                )
                .with_position(index, total),
            );
            let job = ClipJob {
                source: &segment.source,
                duration_hint_secs: segment.source_duration_hint_secs,
                target_duration_us: segment.target_duration_us().max(self.config.min_segment_us),
                easing: segment.easing(),
            };
            let clip = processor.process(&job, &mut |local| {
                self.progress.emit(
                    ProgressEvent::new(
                        FinalizeStage::ApplyingCurves,
                        span.at(local),
                        format!("Applying curve to {}", segment.id),
                    )
                    .with_position(index, total),
                );
            })?;

            cache.insert(segment, clip.clone());
            processed.push(segment.id);
            clips.push(clip);
        }

        Ok((clips, processed, reused))
    }

    fn stitch(
        &self,
        clips: &[EncodedClip],
        audio: Option<&AudioBuffer>,
        span: ProgressSpan,
    ) -> CurvecutResult<crate::stitch::StitchOutput> {
        self.progress.emit(ProgressEvent::new(
            FinalizeStage::Stitching,
            span.at(0.0),
            format!("Stitching {} clips", clips.len()),
        ));
        let stitcher = Stitcher::new(self.engine, self.config, self.cancel.clone());
        stitcher.stitch(clips, audio, &mut |local| {
            self.progress.emit(ProgressEvent::new(
                FinalizeStage::Stitching,
                span.at(local),
                "Stitching",
            ));
        })
    }
}

/// Run a finalize on tokio's blocking pool.
///
/// If the blocking task panics the cache is lost and an empty one is returned
/// with the error.
pub async fn finalize_project(
    engine: Arc<dyn MediaEngine>,
    config: PipelineConfig,
    request: FinalizeRequest,
    cache: SpeedCurvedCache,
    progress: ProgressSink,
    cancel: CancelFlag,
) -> Result<FinalizeResult, FinalizeFailure> {
    let task = tokio::task::spawn_blocking(move || {
        Finalizer::new(engine.as_ref(), config)
            .with_progress(progress)
            .with_cancel(cancel)
            .run(&request, cache)
    });

    match task.await {
        Ok(result) => result,
        Err(join_error) => Err(FinalizeFailure {
            error: CurvecutError::Other(anyhow::anyhow!("finalize task failed: {join_error}")),
            cache: SpeedCurvedCache::new(),
        }),
    }
}
