//! CurveCut CLI: command-line interface for speed-curve finalize runs.
//!
//! Usage:
//!   curvecut init <NAME>           Create an empty project
//!   curvecut curve <EASING>        Sample an easing curve
//!   curvecut inspect <FILE>        Probe a clip and show the auto curve choice
//!   curvecut synth video|tone      Write a synthetic clip or tone
//!   curvecut finalize <PATH>       Run a project end to end
//!   curvecut check                 Show configuration and engine capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "curvecut",
    about = "Speed-curved segment rendering and stitching",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new empty project
    Init {
        /// Project name
        name: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Sample an easing curve
    Curve {
        /// Preset name (e.g. ease_in_out_cubic) or x1,y1,x2,y2 bezier points
        #[arg(default_value = "auto")]
        easing: String,

        /// Number of evenly spaced samples
        #[arg(short, long, default_value = "11")]
        samples: usize,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// List every preset name and exit
        #[arg(long)]
        list: bool,
    },

    /// Probe a clip
    Inspect {
        /// Path to the clip
        path: PathBuf,
    },

    /// Write a synthetic clip or tone
    Synth {
        #[command(subcommand)]
        kind: commands::synth::SynthKind,
    },

    /// Run a project end to end
    Finalize {
        /// Path to the project directory
        path: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the configured warp model: timestamp|elastic
        #[arg(long)]
        warp_model: Option<String>,
    },

    /// Show configuration and engine capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = curvecut_common::config::AppConfig::load();
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    curvecut_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Init { name, output } => commands::init::run(name, output),
        Commands::Curve {
            easing,
            samples,
            json,
            list,
        } => commands::curve::run(easing, samples, json, list),
        Commands::Inspect { path } => commands::inspect::run(path),
        Commands::Synth { kind } => commands::synth::run(kind),
        Commands::Finalize {
            path,
            output,
            warp_model,
        } => commands::finalize::run(&config, path, output, warp_model).await,
        Commands::Check => commands::check::run(&config),
    }
}
