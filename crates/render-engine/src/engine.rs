//! The media engine seam.
//!
//! Everything that touches real codecs sits behind [`MediaEngine`]. Decoders
//! and muxers are handed out as boxed handles that release their resources on
//! drop, so every exit path of a pipeline stage closes what it opened.

use curvecut_common::error::CurvecutResult;
use curvecut_project_model::media::{AudioBuffer, AudioCodec, EncodeTier, Rotation, VideoSample};

/// Video track facts reported by a probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoTrackInfo {
    pub width: u32,
    pub height: u32,
    pub rotation: Rotation,
    /// Average bitrate (bits per second, 0 = unknown).
    pub bitrate: u32,
    /// Average frame rate (0 = unknown).
    pub frame_rate: f64,
}

/// Result of probing a container.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProbeReport {
    /// Duration declared by the video track.
    pub track_duration_us: Option<u64>,
    /// Duration declared by the container.
    pub container_duration_us: Option<u64>,
    pub video: Option<VideoTrackInfo>,
    pub has_audio: bool,
}

impl ProbeReport {
    /// Track-level duration, then container-level, then nothing.
    pub fn best_duration_us(&self) -> Option<u64> {
        self.track_duration_us
            .filter(|d| *d > 0)
            .or(self.container_duration_us.filter(|d| *d > 0))
    }
}

/// Packet-level facts gathered without decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketScan {
    pub first_timestamp_us: u64,
    pub last_timestamp_us: u64,
    pub sample_count: usize,
}

/// Output container configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MuxerConfig {
    pub tier: EncodeTier,
    pub rotation: Rotation,
}

/// Streaming video decoder.
pub trait VideoDecoder {
    /// Next decoded sample, or `None` at end of stream.
    fn next_sample(&mut self) -> CurvecutResult<Option<VideoSample>>;
}

/// Encoder + container writer for one output file.
pub trait ContainerMuxer {
    /// Encode one video sample. Timestamps must not go backwards.
    fn push_video(&mut self, sample: VideoSample) -> CurvecutResult<()>;

    /// Declare the single audio track. Must precede [`ContainerMuxer::push_audio`].
    fn add_audio_track(&mut self, codec: AudioCodec, sample_rate: u32, channels: u16)
        -> CurvecutResult<()>;

    /// Encode the whole prepared audio buffer in one call.
    fn push_audio(&mut self, buffer: &AudioBuffer) -> CurvecutResult<()>;

    /// Flush encoders and return the finished container.
    fn finalize(self: Box<Self>) -> CurvecutResult<Vec<u8>>;
}

/// Decode/encode capability provider.
pub trait MediaEngine: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Read container metadata.
    fn probe(&self, bytes: &[u8]) -> CurvecutResult<ProbeReport>;

    /// Optional packet-only scan. Engines that cannot scan return `Ok(None)`.
    fn scan_packets(&self, _bytes: &[u8]) -> CurvecutResult<Option<PacketScan>> {
        Ok(None)
    }

    /// Open a decoder over the first video track.
    fn open_video_decoder<'a>(&'a self, bytes: &[u8])
        -> CurvecutResult<Box<dyn VideoDecoder + 'a>>;

    /// Whether `tier` can be encoded.
    fn can_encode_video(&self, tier: &EncodeTier) -> bool;

    /// Whether `codec` can be encoded at this rate and channel count.
    fn can_encode_audio(&self, codec: AudioCodec, sample_rate: u32, channels: u16) -> bool;

    /// Open an output container.
    fn open_muxer<'a>(&'a self, config: &MuxerConfig) -> CurvecutResult<Box<dyn ContainerMuxer + 'a>>;

    /// Decode the first audio track fully. `Ok(None)` when there is none.
    fn decode_audio(&self, bytes: &[u8]) -> CurvecutResult<Option<AudioBuffer>>;
}
