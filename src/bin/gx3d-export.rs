use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;

use gx3d::{ExportOptions, Exporter, SceneDocument};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scene document (JSON)
    #[arg(value_name = "SCENE")]
    scene: PathBuf,

    /// Output gx3d file; listings are written next to it
    #[arg(value_name = "OUT")]
    output: PathBuf,

    /// Export options (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Convert Z-up source space to Y-up, overriding the config file
    #[arg(long)]
    y_up: bool,

    /// Print the export report as JSON
    #[arg(long)]
    report: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut options = match &args.config {
        Some(path) => ExportOptions::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => ExportOptions::default(),
    };
    options.y_up |= args.y_up;

    let document =
        SceneDocument::load(&args.scene).with_context(|| format!("loading {}", args.scene.display()))?;
    let mut exporter = Exporter::new(options)?;
    let report = exporter
        .export_to_path(&document, &args.output)
        .with_context(|| format!("exporting {}", args.scene.display()))?;

    info!("Wrote {} ({} bytes)", args.output.display(), report.total_size);
    if args.report {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
