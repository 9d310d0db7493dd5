//! Finalize a project end to end.

use std::path::PathBuf;
use std::sync::Arc;

use curvecut_common::cancel::CancelFlag;
use curvecut_common::config::{AppConfig, WarpModel};
use curvecut_project_model::media::us_to_secs;
use curvecut_project_model::{LoadedProject, SpeedCurvedCache, UpdateReason};
use curvecut_render_engine::{
    finalize_project, FinalizeStage, MediaEngine, MemoryEngine, PipelineConfig, ProgressSink,
};

pub async fn run(
    config: &AppConfig,
    path: PathBuf,
    output: Option<PathBuf>,
    warp_model: Option<String>,
) -> anyhow::Result<()> {
    println!("Finalizing project at: {}", path.display());

    config.pipeline.validate()?;
    let mut pipeline = PipelineConfig::from(&config.pipeline);
    if let Some(model) = warp_model {
        pipeline = pipeline.with_warp_model(match model.as_str() {
            "timestamp" => WarpModel::Timestamp,
            "elastic" => WarpModel::Elastic,
            _ => anyhow::bail!("Unknown warp model: {model}. Use: timestamp, elastic"),
        });
    }

    let project =
        LoadedProject::load(&path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;
    let missing = project.validate_sources();
    if !missing.is_empty() {
        for issue in &missing {
            println!("  - {issue}");
        }
        anyhow::bail!("{} source(s) missing", missing.len());
    }

    let request = project
        .to_request(UpdateReason::Full)
        .map_err(|e| anyhow::anyhow!("Failed to read sources: {e}"))?;
    let output_path = output.unwrap_or_else(|| path.join("output.json"));

    println!("  Segments: {}", request.segments.len());
    println!("  Target duration: {:.3}s", request.total_target_secs());
    println!("  Audio: {}", if request.audio.is_some() { "yes" } else { "no" });
    println!("  Output: {}", output_path.display());

    let engine: Arc<dyn MediaEngine> = Arc::new(MemoryEngine::new());
    let (sink, mut events) = ProgressSink::channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if event.stage == FinalizeStage::Error {
                continue;
            }
            print!(
                "\r  [{:>15}] {:5.1}%  {:<40}",
                event.stage.as_str(),
                event.percent,
                event.message
            );
        }
        println!();
    });

    let cancel = CancelFlag::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, cancelling finalize");
                cancel.cancel();
            }
        })
    };

    let result = finalize_project(
        engine,
        pipeline,
        request,
        SpeedCurvedCache::new(),
        sink,
        cancel,
    )
    .await;
    ctrl_c.abort();
    printer.await.ok();

    let result = match result {
        Ok(result) => result,
        Err(failure) => {
            println!(
                "Finalize failed: {} ({} segment(s) cached)",
                failure.error,
                failure.cache.len()
            );
            return Err(failure.into());
        }
    };

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&output_path, &result.bytes)?;

    let report = &result.report;
    println!("Finalize complete: {}", output_path.display());
    println!("  Duration: {:.3}s", us_to_secs(result.duration_us));
    println!("  Tier: {}", report.tier);
    println!(
        "  Audio: {}",
        report
            .audio_codec
            .map(|codec| codec.codec_string().to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    if let Some(error) = &report.audio_error {
        println!("  Audio skipped: {error}");
    }
    println!(
        "  Segments processed: {}, reused: {}",
        report.processed.len(),
        report.reused.len()
    );

    Ok(())
}
