//! Media-level types exchanged with the media engine.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Microseconds per second.
pub const MICROS_PER_SEC: f64 = 1_000_000.0;

/// Convert seconds to whole microseconds (rounded, negative clamps to zero).
pub fn secs_to_us(secs: f64) -> u64 {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    (secs * MICROS_PER_SEC).round() as u64
}

/// Convert microseconds to seconds.
pub fn us_to_secs(us: u64) -> f64 {
    us as f64 / MICROS_PER_SEC
}

/// Display rotation stored in container metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Rotation {
    #[default]
    #[serde(rename = "0")]
    R0,
    #[serde(rename = "90")]
    R90,
    #[serde(rename = "180")]
    R180,
    #[serde(rename = "270")]
    R270,
}

impl Rotation {
    /// Normalize any multiple of 90 degrees (negative values included).
    /// Values off the 90-degree grid snap to the nearest quarter turn.
    pub fn from_degrees(degrees: i32) -> Self {
        let quarter = ((degrees as f64 / 90.0).round() as i64).rem_euclid(4);
        match quarter {
            1 => Rotation::R90,
            2 => Rotation::R180,
            3 => Rotation::R270,
            _ => Rotation::R0,
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }
}

/// Properties of a probed clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipMetadata {
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Average bitrate (bits per second, 0 = unknown).
    pub bitrate: u32,
    /// Average frame rate (frames per second, 0 = unknown).
    pub frame_rate: f64,
    /// Coded width in pixels.
    pub width: u32,
    /// Coded height in pixels.
    pub height: u32,
    /// Display rotation.
    pub rotation: Rotation,
}

/// One decoded video frame with its presentation timing.
#[derive(Clone, PartialEq, Eq)]
pub struct VideoSample {
    /// Presentation timestamp (microseconds).
    pub timestamp_us: u64,
    /// Display duration (microseconds).
    pub duration_us: u64,
    /// Decoded pixel payload. Shared so retiming never copies pixels.
    pub data: Arc<[u8]>,
}

impl VideoSample {
    pub fn new(timestamp_us: u64, duration_us: u64, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            timestamp_us,
            duration_us,
            data: data.into(),
        }
    }

    /// End of the sample's display span.
    pub fn end_us(&self) -> u64 {
        self.timestamp_us + self.duration_us
    }

    /// Clone sharing the pixel payload with new timing.
    pub fn retimed(&self, timestamp_us: u64, duration_us: u64) -> Self {
        Self {
            timestamp_us,
            duration_us,
            data: Arc::clone(&self.data),
        }
    }
}

impl fmt::Debug for VideoSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoSample")
            .field("timestamp_us", &self.timestamp_us)
            .field("duration_us", &self.duration_us)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Decoded PCM audio, interleaved `f32` in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl AudioBuffer {
    /// Number of frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / usize::from(self.channels)
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }
}

/// Audio codecs the stitcher can negotiate, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioCodec {
    Aac,
    Opus,
    Mp3,
}

impl AudioCodec {
    /// Negotiation order: AAC first, then Opus, then legacy MP3.
    pub const PREFERENCE: [AudioCodec; 3] = [AudioCodec::Aac, AudioCodec::Opus, AudioCodec::Mp3];

    /// Codec string passed to the encoder.
    pub fn codec_string(self) -> &'static str {
        match self {
            AudioCodec::Aac => "mp4a.40.2",
            AudioCodec::Opus => "opus",
            AudioCodec::Mp3 => "mp3",
        }
    }
}

/// Which rung of the tier ladder a tier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    Native,
    Capped1080,
    Capped720,
}

impl TierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TierKind::Native => "native",
            TierKind::Capped1080 => "capped_1080",
            TierKind::Capped720 => "capped_720",
        }
    }
}

/// One encode configuration candidate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncodeTier {
    pub kind: TierKind,
    /// Output width (even).
    pub width: u32,
    /// Output height (even).
    pub height: u32,
    /// Target bitrate (bits per second).
    pub bitrate: u32,
    /// Codec profile string, e.g. `avc1.640033`.
    pub codec_profile: String,
}

impl fmt::Display for EncodeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}x{} @ {} kbps ({})",
            self.kind.as_str(),
            self.width,
            self.height,
            self.bitrate / 1000,
            self.codec_profile
        )
    }
}

/// Encoded container bytes plus the facts later stages need without re-probing.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedClip {
    pub bytes: Arc<[u8]>,
    /// Total presentation duration (microseconds).
    pub duration_us: u64,
    pub width: u32,
    pub height: u32,
}

impl EncodedClip {
    pub fn duration_secs(&self) -> f64 {
        us_to_secs(self.duration_us)
    }
}

impl fmt::Debug for EncodedClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedClip")
            .field("bytes", &self.bytes.len())
            .field("duration_us", &self.duration_us)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}
