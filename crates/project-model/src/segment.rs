//! Segments: one source clip plus its target duration and easing curve.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::easing::{EasingPreset, EasingSpec};
use crate::media::secs_to_us;

/// Target durations below this (or non-finite ones) are clamped up to it.
pub const MIN_TARGET_DURATION_SECS: f64 = 0.1;

/// Stable segment identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(pub u64);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "segment-{}", self.0)
    }
}

/// Source media bytes with a stable identity.
///
/// The identity participates in cache fingerprints: two sources with the same
/// identity are assumed to hold the same media.
#[derive(Clone)]
pub struct MediaSource {
    identity: String,
    bytes: Arc<[u8]>,
    location: Option<PathBuf>,
}

impl MediaSource {
    /// In-memory source without a backing file.
    pub fn from_bytes(identity: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            identity: identity.into(),
            bytes: bytes.into(),
            location: None,
        }
    }

    /// Read a source from disk. The path doubles as the identity.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        Ok(Self {
            identity: path.display().to_string(),
            bytes: bytes.into(),
            location: Some(path.to_path_buf()),
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Re-read the backing file, if any. `None` when the source is memory-only.
    pub fn refetch(&self) -> Option<std::io::Result<MediaSource>> {
        let path = self.location.as_ref()?;
        Some(std::fs::read(path).map(|bytes| Self {
            identity: self.identity.clone(),
            bytes: bytes.into(),
            location: Some(path.clone()),
        }))
    }
}

impl fmt::Debug for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaSource")
            .field("identity", &self.identity)
            .field("bytes", &self.bytes.len())
            .field("location", &self.location)
            .finish()
    }
}

/// One source clip with its output configuration.
#[derive(Debug, Clone)]
pub struct Segment {
    pub id: SegmentId,
    pub source: MediaSource,
    target_duration_secs: f64,
    easing: EasingSpec,
    /// Which pass of a multi-loop output this segment belongs to.
    pub loop_iteration: u32,
    /// Source length to assume when the container declares none.
    pub source_duration_hint_secs: Option<f64>,
}

impl Segment {
    pub fn new(id: SegmentId, source: MediaSource, target_duration_secs: f64) -> Self {
        Self {
            id,
            source,
            target_duration_secs: clamp_target_duration(target_duration_secs),
            easing: EasingSpec::default(),
            loop_iteration: 0,
            source_duration_hint_secs: None,
        }
    }

    pub fn with_easing(mut self, easing: EasingSpec) -> Self {
        self.easing = easing.normalized();
        self
    }

    pub fn with_loop_iteration(mut self, loop_iteration: u32) -> Self {
        self.loop_iteration = loop_iteration;
        self
    }

    pub fn with_duration_hint(mut self, secs: Option<f64>) -> Self {
        self.source_duration_hint_secs = secs.filter(|s| s.is_finite() && *s > 0.0);
        self
    }

    pub fn target_duration_secs(&self) -> f64 {
        self.target_duration_secs
    }

    pub fn target_duration_us(&self) -> u64 {
        secs_to_us(self.target_duration_secs)
    }

    pub fn set_target_duration(&mut self, secs: f64) {
        self.target_duration_secs = clamp_target_duration(secs);
    }

    pub fn easing(&self) -> EasingSpec {
        self.easing
    }

    /// Switch to a preset; any custom curve is discarded.
    pub fn set_preset(&mut self, preset: EasingPreset) {
        self.easing = EasingSpec::Preset(preset);
    }

    /// Switch to a custom bezier; the preset selection is discarded.
    pub fn set_custom_bezier(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.easing = EasingSpec::bezier(x1, y1, x2, y2);
    }
}

fn clamp_target_duration(secs: f64) -> f64 {
    if !secs.is_finite() || secs < MIN_TARGET_DURATION_SECS {
        return MIN_TARGET_DURATION_SECS;
    }
    secs
}
