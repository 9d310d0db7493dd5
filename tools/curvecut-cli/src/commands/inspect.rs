//! Probe a clip.

use std::path::PathBuf;

use curvecut_processing_core::curve_choice;
use curvecut_processing_core::tiers::build_ladder;
use curvecut_project_model::media::{us_to_secs, ClipMetadata};
use curvecut_project_model::segment::MediaSource;
use curvecut_render_engine::{MediaEngine, MemoryEngine, PipelineConfig};

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let source = MediaSource::from_path(&path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
    let engine = MemoryEngine::new();
    let report = engine.probe(source.bytes())?;
    let scan = engine.scan_packets(source.bytes())?;

    println!("Clip: {}", source.identity());
    match report.best_duration_us() {
        Some(us) => println!("  Duration: {:.3}s", us_to_secs(us)),
        None => println!("  Duration: unknown"),
    }
    if let Some(scan) = scan {
        println!(
            "  Samples: {} ({}us .. {}us)",
            scan.sample_count, scan.first_timestamp_us, scan.last_timestamp_us
        );
    }
    println!("  Audio: {}", if report.has_audio { "yes" } else { "no" });

    let Some(video) = report.video else {
        println!("  Video: none");
        return Ok(());
    };
    println!(
        "  Video: {}x{} @ {:.2}fps, {} bps, rotation {}°",
        video.width,
        video.height,
        video.frame_rate,
        video.bitrate,
        video.rotation.degrees()
    );

    let metadata = ClipMetadata {
        duration_secs: report.best_duration_us().map(us_to_secs).unwrap_or(0.0),
        bitrate: video.bitrate,
        frame_rate: video.frame_rate,
        width: video.width,
        height: video.height,
        rotation: video.rotation,
    };
    println!(
        "  Auto curve: {} (score {})",
        curve_choice::auto_preset(&metadata),
        curve_choice::adaptation_score(&metadata)
    );

    println!("  Encode ladder:");
    let config = PipelineConfig::default();
    for tier in build_ladder(video.width, video.height, video.bitrate, &config.tiers) {
        let supported = if engine.can_encode_video(&tier) { "ok" } else { "unsupported" };
        println!("    {tier} [{supported}]");
    }

    Ok(())
}
