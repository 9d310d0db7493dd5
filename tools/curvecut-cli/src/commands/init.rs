//! Initialize a new CurveCut project.

use std::path::PathBuf;

use curvecut_project_model::{LoadedProject, PROJECT_FILE_NAME};

pub fn run(name: String, output: PathBuf) -> anyhow::Result<()> {
    let project_dir = output.join(&name);
    println!("Creating project '{}' at {}", name, project_dir.display());

    let project = LoadedProject::create(&project_dir, &name)
        .map_err(|e| anyhow::anyhow!("Failed to create project: {e}"))?;

    println!("Project created:");
    println!("  Directory: {}", project.root.display());
    println!("  Version: {}", project.file.version);
    println!();
    println!("Add segments to {PROJECT_FILE_NAME}, for example:");
    println!(
        r#"  {{ "id": 1, "source": "clip.json", "target_duration_secs": 1.5, "easing": {{ "preset": "ease_in_out_cubic" }} }}"#
    );
    println!("Use `curvecut synth video` to generate test clips.");

    Ok(())
}
