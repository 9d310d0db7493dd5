//! Show configuration and engine capabilities.

use curvecut_common::config::{config_file_path, AppConfig};
use curvecut_processing_core::tiers::build_ladder;
use curvecut_project_model::media::AudioCodec;
use curvecut_render_engine::{MediaEngine, MemoryEngine, PipelineConfig};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("CurveCut Check");
    println!("{}", "=".repeat(50));

    let path = config_file_path();
    if path.exists() {
        println!("[OK] Config file: {}", path.display());
    } else {
        println!("[--] Config file: {} (using defaults)", path.display());
    }

    let pipeline = &config.pipeline;
    match pipeline.validate() {
        Ok(()) => println!("[OK] Pipeline configuration is valid"),
        Err(e) => println!("[ERR] Pipeline configuration: {e}"),
    }
    println!("     Warp model: {:?}", pipeline.warp_model);
    println!(
        "     Minimum sample: {}s, segment: {}s, audio: {}s",
        pipeline.min_sample_duration_secs,
        pipeline.min_segment_duration_secs,
        pipeline.min_audio_duration_secs
    );
    println!(
        "     Tier caps: {}x{} @ {} bps, {}x{} @ {} bps",
        pipeline.hd_long_edge,
        pipeline.hd_short_edge,
        pipeline.hd_max_bitrate,
        pipeline.sd_long_edge,
        pipeline.sd_short_edge,
        pipeline.sd_max_bitrate
    );
    println!("     Log level: {}", config.logging.level);

    let engine = MemoryEngine::new();
    println!();
    println!("[OK] Media engine: {}", engine.name());

    let limits = PipelineConfig::from(pipeline).tiers;
    for tier in build_ladder(3840, 2160, 20_000_000, &limits) {
        let mark = if engine.can_encode_video(&tier) { "OK" } else { "--" };
        println!("[{mark}] Video tier {tier}");
    }
    for codec in AudioCodec::PREFERENCE {
        let mark = if engine.can_encode_audio(codec, 48_000, 2) { "OK" } else { "--" };
        println!("[{mark}] Audio codec {}", codec.codec_string());
    }

    Ok(())
}
