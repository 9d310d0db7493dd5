//! Sample an easing curve.

use curvecut_processing_core::easing::Curve;
use curvecut_project_model::easing::{EasingPreset, EasingSpec};

pub fn run(easing: String, samples: usize, json: bool, list: bool) -> anyhow::Result<()> {
    if list {
        for preset in EasingPreset::ALL {
            println!("{preset}");
        }
        return Ok(());
    }

    let spec = parse_easing(&easing)?;
    let points = Curve::from_spec(spec).sample(samples);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "easing": spec,
                "points": points,
            }))?
        );
        return Ok(());
    }

    println!("Curve: {spec}");
    if spec.is_auto() {
        println!("  (auto resolves per clip; shown with the gentle hybrid)");
    }
    for point in &points {
        let bar = "#".repeat((point.value * 40.0).round() as usize);
        println!("  t={:.3}  {:.4}  {bar}", point.t, point.value);
    }
    Ok(())
}

/// A preset name, or four comma-separated bezier control values.
fn parse_easing(input: &str) -> anyhow::Result<EasingSpec> {
    if input.contains(',') {
        let values = input
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid bezier value in {input:?}: {e}"))?;
        let [x1, y1, x2, y2] = values[..] else {
            anyhow::bail!("Bezier needs exactly four values, got {}", values.len());
        };
        return Ok(EasingSpec::bezier(x1, y1, x2, y2));
    }

    let preset: EasingPreset = input.parse()?;
    Ok(EasingSpec::Preset(preset))
}
