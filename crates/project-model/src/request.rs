//! Finalize requests: what to build and what changed since the last run.

use serde::{Deserialize, Serialize};

use crate::segment::{MediaSource, Segment, SegmentId};

/// What changed since the previous finalize, driving cache policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UpdateReason {
    /// Rebuild everything from scratch.
    #[default]
    Full,
    /// Only the audio file was replaced.
    AudioFileChanged,
    /// Only the audio fade or offset values changed.
    AudioFadeOnly,
    /// Durations or easing of some segments changed.
    SegmentParamsChanged,
}

impl UpdateReason {
    /// Whether cached curved clips are reused verbatim, regardless of fingerprints.
    pub fn reuses_curved_clips(self) -> bool {
        matches!(
            self,
            UpdateReason::AudioFileChanged | UpdateReason::AudioFadeOnly
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UpdateReason::Full => "full",
            UpdateReason::AudioFileChanged => "audio_file_changed",
            UpdateReason::AudioFadeOnly => "audio_fade_only",
            UpdateReason::SegmentParamsChanged => "segment_params_changed",
        }
    }
}

/// Optional background audio mixed under the stitched video.
#[derive(Debug, Clone)]
pub struct AudioTrack {
    pub source: MediaSource,
    pub fade_in_secs: f64,
    pub fade_out_secs: f64,
    /// Where in the source the loop-fill starts (wrapped to the source length).
    pub offset_secs: f64,
}

impl AudioTrack {
    pub fn new(source: MediaSource) -> Self {
        Self {
            source,
            fade_in_secs: 0.0,
            fade_out_secs: 0.0,
            offset_secs: 0.0,
        }
    }

    pub fn with_fades(mut self, fade_in_secs: f64, fade_out_secs: f64) -> Self {
        self.fade_in_secs = fade_in_secs;
        self.fade_out_secs = fade_out_secs;
        self
    }

    pub fn with_offset(mut self, offset_secs: f64) -> Self {
        self.offset_secs = offset_secs;
        self
    }
}

/// Everything one finalize run needs besides the cache.
#[derive(Debug, Clone, Default)]
pub struct FinalizeRequest {
    /// Segments in output order.
    pub segments: Vec<Segment>,
    pub audio: Option<AudioTrack>,
    pub reason: UpdateReason,
    /// Segments known to have changed (`SegmentParamsChanged` only).
    pub changed_segments: Vec<SegmentId>,
}

impl FinalizeRequest {
    pub fn new(segments: Vec<Segment>, reason: UpdateReason) -> Self {
        Self {
            segments,
            audio: None,
            reason,
            changed_segments: Vec::new(),
        }
    }

    pub fn with_audio(mut self, audio: AudioTrack) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn with_changed(mut self, ids: impl IntoIterator<Item = SegmentId>) -> Self {
        self.changed_segments.extend(ids);
        self
    }

    /// Sum of segment target durations (seconds).
    pub fn total_target_secs(&self) -> f64 {
        self.segments.iter().map(Segment::target_duration_secs).sum()
    }
}
