//! Write synthetic media for the in-memory engine.

use std::path::PathBuf;

use clap::Subcommand;
use curvecut_render_engine::MemoryContainer;

#[derive(Subcommand)]
pub enum SynthKind {
    /// A constant-frame-rate video clip
    Video {
        /// Output file path
        output: PathBuf,

        #[arg(long, default_value = "1920")]
        width: u32,

        #[arg(long, default_value = "1080")]
        height: u32,

        #[arg(long, default_value = "30")]
        fps: f64,

        /// Clip length in seconds
        #[arg(long, default_value = "3.0")]
        secs: f64,

        /// Declared bitrate (bits per second)
        #[arg(long, default_value = "6000000")]
        bitrate: u32,
    },

    /// An audio-only sine tone
    Tone {
        /// Output file path
        output: PathBuf,

        #[arg(long, default_value = "48000")]
        sample_rate: u32,

        #[arg(long, default_value = "2")]
        channels: u16,

        /// Tone length in seconds
        #[arg(long, default_value = "5.0")]
        secs: f64,

        #[arg(long, default_value = "440")]
        frequency: f32,
    },
}

pub fn run(kind: SynthKind) -> anyhow::Result<()> {
    let (output, container) = match kind {
        SynthKind::Video {
            output,
            width,
            height,
            fps,
            secs,
            bitrate,
        } => {
            if !(fps > 0.0) || !(secs > 0.0) {
                anyhow::bail!("fps and secs must be positive");
            }
            println!("Writing {width}x{height} @ {fps}fps, {secs}s clip");
            (
                output,
                MemoryContainer::synthetic_video(width, height, fps, secs, bitrate),
            )
        }
        SynthKind::Tone {
            output,
            sample_rate,
            channels,
            secs,
            frequency,
        } => {
            if sample_rate == 0 || channels == 0 || !(secs > 0.0) {
                anyhow::bail!("sample_rate, channels, and secs must be positive");
            }
            println!("Writing {frequency}Hz tone, {sample_rate}Hz x{channels}, {secs}s");
            (
                output,
                MemoryContainer::synthetic_tone(sample_rate, channels, secs, frequency),
            )
        }
    };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&output, container.to_bytes()?)?;
    println!("  Output: {}", output.display());
    Ok(())
}
