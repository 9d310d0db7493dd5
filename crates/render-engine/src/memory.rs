//! In-process reference engine.
//!
//! [`MemoryEngine`] implements [`MediaEngine`] over [`MemoryContainer`], a
//! JSON "sample container" that stores already-decoded samples. It does no
//! real compression, so it is deterministic: identical inputs always produce
//! identical bytes. Encode capabilities are configurable and every handle is
//! counted, which makes it the media fake for tests and the CLI.

use std::f32::consts::TAU;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use curvecut_common::error::{CurvecutError, CurvecutResult};
use curvecut_project_model::media::{
    secs_to_us, AudioBuffer, AudioCodec, EncodeTier, Rotation, VideoSample,
};

use crate::engine::{
    ContainerMuxer, MediaEngine, MuxerConfig, PacketScan, ProbeReport, VideoDecoder,
    VideoTrackInfo,
};

/// Format tag written into every container.
pub const MEMORY_FORMAT: &str = "curvecut-memory/1";

/// A stored video sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySample {
    pub timestamp_us: u64,
    pub duration_us: u64,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryVideoTrack {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default)]
    pub bitrate: u32,
    #[serde(default)]
    pub frame_rate: f64,
    #[serde(default)]
    pub codec_profile: Option<String>,
    /// Declared track duration; may disagree with the samples.
    #[serde(default)]
    pub duration_us: Option<u64>,
    pub samples: Vec<MemorySample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryAudioTrack {
    #[serde(default)]
    pub codec: Option<AudioCodec>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved PCM.
    pub samples: Vec<f32>,
}

/// The container format understood by [`MemoryEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryContainer {
    pub format: String,
    #[serde(default)]
    pub duration_us: Option<u64>,
    #[serde(default)]
    pub video: Option<MemoryVideoTrack>,
    #[serde(default)]
    pub audio: Option<MemoryAudioTrack>,
}

impl MemoryContainer {
    pub fn empty() -> Self {
        Self {
            format: MEMORY_FORMAT.to_string(),
            duration_us: None,
            video: None,
            audio: None,
        }
    }

    /// Parse container bytes.
    pub fn from_bytes(bytes: &[u8]) -> CurvecutResult<Self> {
        let container: MemoryContainer = serde_json::from_slice(bytes)
            .map_err(|e| CurvecutError::unreadable("memory", e.to_string()))?;
        if container.format != MEMORY_FORMAT {
            return Err(CurvecutError::unreadable(
                "memory",
                format!("unsupported container format {:?}", container.format),
            ));
        }
        Ok(container)
    }

    pub fn to_bytes(&self) -> CurvecutResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// A constant-frame-rate clip whose sample payload is the frame index.
    pub fn synthetic_video(
        width: u32,
        height: u32,
        frame_rate: f64,
        duration_secs: f64,
        bitrate: u32,
    ) -> Self {
        let duration_us = secs_to_us(duration_secs);
        let frame_count = (duration_secs * frame_rate).round().max(1.0) as u64;
        let step = duration_us / frame_count;
        let samples = (0..frame_count)
            .map(|i| MemorySample {
                timestamp_us: i * step,
                duration_us: if i + 1 == frame_count {
                    duration_us - i * step
                } else {
                    step
                },
                data: (i as u32).to_le_bytes().to_vec(),
            })
            .collect();

        Self {
            duration_us: Some(duration_us),
            video: Some(MemoryVideoTrack {
                width,
                height,
                rotation: Rotation::R0,
                bitrate,
                frame_rate,
                codec_profile: None,
                duration_us: Some(duration_us),
                samples,
            }),
            ..Self::empty()
        }
    }

    /// An audio-only container holding a sine tone.
    pub fn synthetic_tone(
        sample_rate: u32,
        channels: u16,
        duration_secs: f64,
        frequency_hz: f32,
    ) -> Self {
        let frames = (duration_secs * f64::from(sample_rate)).round() as usize;
        let mut samples = Vec::with_capacity(frames * usize::from(channels));
        for frame in 0..frames {
            let t = frame as f32 / sample_rate as f32;
            let value = (TAU * frequency_hz * t).sin() * 0.5;
            samples.extend(std::iter::repeat(value).take(usize::from(channels)));
        }

        Self {
            duration_us: Some(secs_to_us(duration_secs)),
            audio: Some(MemoryAudioTrack {
                codec: None,
                sample_rate,
                channels,
                samples,
            }),
            ..Self::empty()
        }
    }

    pub fn with_audio(mut self, audio: MemoryAudioTrack) -> Self {
        self.audio = Some(audio);
        self
    }
}

/// What the engine claims it can encode.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryCapabilities {
    /// Largest encodable frame, in pixels (`None` = unlimited).
    pub max_video_pixels: Option<u64>,
    /// Highest encodable bitrate (`None` = unlimited).
    pub max_video_bitrate: Option<u32>,
    /// Accepted codec profiles (`None` = all).
    pub video_profiles: Option<Vec<String>>,
    pub audio_codecs: Vec<AudioCodec>,
    /// Decoders fail after yielding this many samples.
    pub fail_decode_after: Option<usize>,
}

impl Default for MemoryCapabilities {
    fn default() -> Self {
        Self {
            max_video_pixels: None,
            max_video_bitrate: None,
            video_profiles: None,
            audio_codecs: AudioCodec::PREFERENCE.to_vec(),
            fail_decode_after: None,
        }
    }
}

impl MemoryCapabilities {
    /// An engine that cannot encode any video tier.
    pub fn no_video() -> Self {
        Self {
            max_video_pixels: Some(0),
            ..Self::default()
        }
    }
}

/// Instrumentation shared by an engine and all its handles.
#[derive(Debug, Default)]
pub struct EngineCounters {
    open_handles: AtomicUsize,
    decoders_opened: AtomicUsize,
    encoders_opened: AtomicUsize,
    audio_decodes: AtomicUsize,
    probes: AtomicUsize,
}

/// Snapshot of [`EngineCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub open_handles: usize,
    pub decoders_opened: usize,
    pub encoders_opened: usize,
    pub audio_decodes: usize,
    pub probes: usize,
}

impl EngineCounters {
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            open_handles: self.open_handles.load(Ordering::SeqCst),
            decoders_opened: self.decoders_opened.load(Ordering::SeqCst),
            encoders_opened: self.encoders_opened.load(Ordering::SeqCst),
            audio_decodes: self.audio_decodes.load(Ordering::SeqCst),
            probes: self.probes.load(Ordering::SeqCst),
        }
    }
}

/// Reference [`MediaEngine`] over [`MemoryContainer`] bytes.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    capabilities: MemoryCapabilities,
    counters: Arc<EngineCounters>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(capabilities: MemoryCapabilities) -> Self {
        Self {
            capabilities,
            counters: Arc::default(),
        }
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    fn handle(&self) -> HandleGuard {
        self.counters.open_handles.fetch_add(1, Ordering::SeqCst);
        HandleGuard {
            counters: Arc::clone(&self.counters),
        }
    }
}

/// Decrements the open-handle count when dropped.
#[derive(Debug)]
struct HandleGuard {
    counters: Arc<EngineCounters>,
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        self.counters.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MediaEngine for MemoryEngine {
    fn name(&self) -> &str {
        "memory"
    }

    fn probe(&self, bytes: &[u8]) -> CurvecutResult<ProbeReport> {
        self.counters.probes.fetch_add(1, Ordering::SeqCst);
        let container = MemoryContainer::from_bytes(bytes)?;
        let video = container.video.as_ref().map(|track| VideoTrackInfo {
            width: track.width,
            height: track.height,
            rotation: track.rotation,
            bitrate: track.bitrate,
            frame_rate: track.frame_rate,
        });
        Ok(ProbeReport {
            track_duration_us: container.video.as_ref().and_then(|t| t.duration_us),
            container_duration_us: container.duration_us,
            video,
            has_audio: container.audio.is_some(),
        })
    }

    fn scan_packets(&self, bytes: &[u8]) -> CurvecutResult<Option<PacketScan>> {
        let container = MemoryContainer::from_bytes(bytes)?;
        let Some(track) = container.video else {
            return Ok(None);
        };
        let (Some(first), Some(last)) = (track.samples.first(), track.samples.last()) else {
            return Ok(None);
        };
        Ok(Some(PacketScan {
            first_timestamp_us: first.timestamp_us,
            last_timestamp_us: last.timestamp_us,
            sample_count: track.samples.len(),
        }))
    }

    fn open_video_decoder<'a>(
        &'a self,
        bytes: &[u8],
    ) -> CurvecutResult<Box<dyn VideoDecoder + 'a>> {
        let container = MemoryContainer::from_bytes(bytes)?;
        let track = container
            .video
            .ok_or_else(|| CurvecutError::no_video_track("container has no video track"))?;

        self.counters.decoders_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryDecoder {
            samples: track.samples.into_iter(),
            yielded: 0,
            fail_after: self.capabilities.fail_decode_after,
            _handle: self.handle(),
        }))
    }

    fn can_encode_video(&self, tier: &EncodeTier) -> bool {
        let caps = &self.capabilities;
        let pixels = u64::from(tier.width) * u64::from(tier.height);
        caps.max_video_pixels.map_or(true, |max| pixels <= max)
            && caps.max_video_bitrate.map_or(true, |max| tier.bitrate <= max)
            && caps
                .video_profiles
                .as_ref()
                .map_or(true, |profiles| profiles.contains(&tier.codec_profile))
    }

    fn can_encode_audio(&self, codec: AudioCodec, sample_rate: u32, channels: u16) -> bool {
        sample_rate > 0 && channels > 0 && self.capabilities.audio_codecs.contains(&codec)
    }

    fn open_muxer<'a>(&'a self, config: &MuxerConfig) -> CurvecutResult<Box<dyn ContainerMuxer + 'a>> {
        if !self.can_encode_video(&config.tier) {
            return Err(CurvecutError::encode(format!(
                "tier {} is not supported",
                config.tier
            )));
        }
        self.counters.encoders_opened.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(tier = %config.tier, "Memory muxer opened");
        Ok(Box::new(MemoryMuxer {
            engine: self,
            config: config.clone(),
            samples: Vec::new(),
            next_start_us: 0,
            audio: None,
            _handle: self.handle(),
        }))
    }

    fn decode_audio(&self, bytes: &[u8]) -> CurvecutResult<Option<AudioBuffer>> {
        self.counters.audio_decodes.fetch_add(1, Ordering::SeqCst);
        let container = MemoryContainer::from_bytes(bytes)?;
        Ok(container.audio.map(|track| AudioBuffer {
            sample_rate: track.sample_rate,
            channels: track.channels,
            samples: track.samples,
        }))
    }
}

struct MemoryDecoder {
    samples: std::vec::IntoIter<MemorySample>,
    yielded: usize,
    fail_after: Option<usize>,
    _handle: HandleGuard,
}

impl VideoDecoder for MemoryDecoder {
    fn next_sample(&mut self) -> CurvecutResult<Option<VideoSample>> {
        if self.fail_after.is_some_and(|limit| self.yielded >= limit) {
            return Err(CurvecutError::decode(format!(
                "decoder failed after {} samples",
                self.yielded
            )));
        }
        let Some(sample) = self.samples.next() else {
            return Ok(None);
        };
        self.yielded += 1;
        Ok(Some(VideoSample::new(
            sample.timestamp_us,
            sample.duration_us,
            sample.data,
        )))
    }
}

struct MemoryMuxer<'a> {
    engine: &'a MemoryEngine,
    config: MuxerConfig,
    samples: Vec<MemorySample>,
    next_start_us: u64,
    audio: Option<MemoryAudioTrack>,
    _handle: HandleGuard,
}

impl ContainerMuxer for MemoryMuxer<'_> {
    fn push_video(&mut self, sample: VideoSample) -> CurvecutResult<()> {
        if sample.timestamp_us < self.next_start_us {
            return Err(CurvecutError::encode(format!(
                "sample at {} us overlaps previous sample ending at {} us",
                sample.timestamp_us, self.next_start_us
            )));
        }
        self.next_start_us = sample.end_us();
        self.samples.push(MemorySample {
            timestamp_us: sample.timestamp_us,
            duration_us: sample.duration_us,
            data: sample.data.to_vec(),
        });
        Ok(())
    }

    fn add_audio_track(
        &mut self,
        codec: AudioCodec,
        sample_rate: u32,
        channels: u16,
    ) -> CurvecutResult<()> {
        if self.audio.is_some() {
            return Err(CurvecutError::encode("audio track already added"));
        }
        if !self.engine.can_encode_audio(codec, sample_rate, channels) {
            return Err(CurvecutError::encode(format!(
                "audio codec {} is not supported",
                codec.codec_string()
            )));
        }
        self.audio = Some(MemoryAudioTrack {
            codec: Some(codec),
            sample_rate,
            channels,
            samples: Vec::new(),
        });
        Ok(())
    }

    fn push_audio(&mut self, buffer: &AudioBuffer) -> CurvecutResult<()> {
        let track = self
            .audio
            .as_mut()
            .ok_or_else(|| CurvecutError::encode("no audio track declared"))?;
        if buffer.sample_rate != track.sample_rate || buffer.channels != track.channels {
            return Err(CurvecutError::encode(
                "audio buffer format does not match the declared track",
            ));
        }
        track.samples.extend_from_slice(&buffer.samples);
        Ok(())
    }

    fn finalize(self: Box<Self>) -> CurvecutResult<Vec<u8>> {
        let MemoryMuxer {
            config,
            samples,
            audio,
            ..
        } = *self;

        let video_us = samples.last().map(|s| s.timestamp_us + s.duration_us).unwrap_or(0);
        let audio_us = audio
            .as_ref()
            .filter(|a| a.sample_rate > 0 && a.channels > 0)
            .map(|a| {
                let frames = a.samples.len() / usize::from(a.channels);
                (frames as u64 * 1_000_000) / u64::from(a.sample_rate)
            })
            .unwrap_or(0);
        let frame_rate = if video_us > 0 {
            samples.len() as f64 * 1_000_000.0 / video_us as f64
        } else {
            0.0
        };

        let container = MemoryContainer {
            format: MEMORY_FORMAT.to_string(),
            duration_us: Some(video_us.max(audio_us)),
            video: Some(MemoryVideoTrack {
                width: config.tier.width,
                height: config.tier.height,
                rotation: config.rotation,
                bitrate: config.tier.bitrate,
                frame_rate,
                codec_profile: Some(config.tier.codec_profile.clone()),
                duration_us: Some(video_us),
                samples,
            }),
            audio,
        };
        container.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curvecut_project_model::media::TierKind;

    fn tier(width: u32, height: u32) -> EncodeTier {
        EncodeTier {
            kind: TierKind::Native,
            width,
            height,
            bitrate: 4_000_000,
            codec_profile: "avc1.640033".to_string(),
        }
    }

    #[test]
    fn test_synthetic_video_probes_back() {
        let bytes = MemoryContainer::synthetic_video(640, 360, 30.0, 1.0, 3_000_000)
            .to_bytes()
            .unwrap();
        let engine = MemoryEngine::new();
        let report = engine.probe(&bytes).unwrap();
        assert_eq!(report.track_duration_us, Some(1_000_000));
        assert_eq!(report.video.unwrap().width, 640);
        let scan = engine.scan_packets(&bytes).unwrap().unwrap();
        assert_eq!(scan.sample_count, 30);
    }

    #[test]
    fn test_garbage_is_unreadable() {
        let engine = MemoryEngine::new();
        let err = engine.probe(b"not a container").unwrap_err();
        assert!(matches!(err, CurvecutError::UnreadableSource { .. }));
    }

    #[test]
    fn test_handles_are_released_on_drop() {
        let engine = MemoryEngine::new();
        let bytes = MemoryContainer::synthetic_video(64, 64, 10.0, 0.5, 0)
            .to_bytes()
            .unwrap();
        {
            let _decoder = engine.open_video_decoder(&bytes).unwrap();
            let config = MuxerConfig {
                tier: tier(64, 64),
                rotation: Rotation::R0,
            };
            let _muxer = engine.open_muxer(&config).unwrap();
            assert_eq!(engine.counters().open_handles, 2);
        }
        let counters = engine.counters();
        assert_eq!(counters.open_handles, 0);
        assert_eq!(counters.decoders_opened, 1);
        assert_eq!(counters.encoders_opened, 1);
    }

    #[test]
    fn test_muxer_rejects_overlapping_samples() {
        let engine = MemoryEngine::new();
        let config = MuxerConfig {
            tier: tier(64, 64),
            rotation: Rotation::R90,
        };
        let mut muxer = engine.open_muxer(&config).unwrap();
        muxer.push_video(VideoSample::new(0, 100, vec![0u8])).unwrap();
        assert!(muxer.push_video(VideoSample::new(50, 100, vec![1u8])).is_err());
    }

    #[test]
    fn test_capabilities_gate_tiers() {
        let engine = MemoryEngine::with_capabilities(MemoryCapabilities {
            max_video_pixels: Some(1920 * 1080),
            ..Default::default()
        });
        assert!(engine.can_encode_video(&tier(1920, 1080)));
        assert!(!engine.can_encode_video(&tier(3840, 2160)));
        assert!(!MemoryEngine::with_capabilities(MemoryCapabilities::no_video())
            .can_encode_video(&tier(2, 2)));
    }

    #[test]
    fn test_audio_round_trips_through_muxer() {
        let engine = MemoryEngine::new();
        let config = MuxerConfig {
            tier: tier(64, 64),
            rotation: Rotation::R0,
        };
        let mut muxer = engine.open_muxer(&config).unwrap();
        muxer.push_video(VideoSample::new(0, 500_000, vec![0u8])).unwrap();
        muxer.add_audio_track(AudioCodec::Aac, 8_000, 1).unwrap();
        let buffer = AudioBuffer {
            sample_rate: 8_000,
            channels: 1,
            samples: vec![0.25; 8_000],
        };
        muxer.push_audio(&buffer).unwrap();
        let bytes = muxer.finalize().unwrap();

        let container = MemoryContainer::from_bytes(&bytes).unwrap();
        assert_eq!(container.duration_us, Some(1_000_000));
        assert_eq!(container.audio.unwrap().codec, Some(AudioCodec::Aac));
        assert_eq!(engine.decode_audio(&bytes).unwrap().unwrap().frames(), 8_000);
    }
}
