use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use serde_json::json;

use tryon_core::detection::infrastructure::onnx_cascade::ModelPaths;
use tryon_core::image_io::infrastructure::image_file_reader::ImageFileReader;
use tryon_core::image_io::infrastructure::image_file_writer::ImageFileWriter;
use tryon_core::overlay::infrastructure::overlay_asset_loader::OverlayAssetLoader;
use tryon_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use tryon_core::pipeline::try_on_image_use_case::TryOnImageUseCase;
use tryon_core::pipeline::try_on_pipeline::{FrameOutcome, PipelineFactory};
use tryon_core::shared::config::TryOnConfig;
use tryon_core::shared::constants::IMAGE_EXTENSIONS;

/// Head-pose driven accessory try-on for a single image.
#[derive(Parser)]
#[command(name = "tryon")]
struct Cli {
    /// Input image file.
    input: PathBuf,

    /// Accessory manifest (JSON).
    asset: PathBuf,

    /// Where to write the lighting-matched overlay image.
    output: Option<PathBuf>,

    /// Pipeline configuration file (JSON).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the ONNX model files.
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Minimum face detection confidence (0.0-1.0).
    #[arg(long)]
    min_detection_confidence: Option<f64>,

    /// Minimum landmark tracking confidence (0.0-1.0).
    #[arg(long)]
    min_tracking_confidence: Option<f64>,

    /// Use the 468-point mesh model instead of the iris-refined one.
    #[arg(long)]
    no_refine: bool,

    /// Skip brightness matching of the overlay.
    #[arg(long)]
    no_lighting: bool,

    /// Disable the bounding-box fallback detector.
    #[arg(long)]
    mesh_only: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let config = build_config(&cli)?;

    let asset = OverlayAssetLoader::load(&cli.asset)?;

    let paths = ModelPaths::resolve(&config.detector, &config.models, Some(download_progress))?;
    let factory = PipelineFactory::onnx(&config, paths);
    let pipeline = factory
        .create()?
        .with_logger(Box::new(StdoutPipelineLogger::new()));

    let mut use_case = TryOnImageUseCase::new(
        Box::new(ImageFileReader::new()),
        Box::new(ImageFileWriter::new()),
        pipeline,
    );
    let outcome = use_case.execute(&cli.input, &asset, cli.output.as_deref())?;

    println!("{}", serde_json::to_string_pretty(&outcome_json(&outcome))?);
    if let (FrameOutcome::Rendered(_), Some(output)) = (&outcome, &cli.output) {
        log::info!("Overlay written to {}", output.display());
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<TryOnConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => TryOnConfig::load(path)?,
        None => TryOnConfig::default(),
    };
    if let Some(c) = cli.min_detection_confidence {
        config.detector.min_detection_confidence = c;
    }
    if let Some(c) = cli.min_tracking_confidence {
        config.detector.min_tracking_confidence = c;
    }
    if cli.no_refine {
        config.detector.refine_landmarks = false;
    }
    if cli.no_lighting {
        config.lighting = false;
    }
    if cli.mesh_only {
        config.models.mesh_only = true;
    }
    if let Some(dir) = &cli.model_dir {
        config.models.dir = Some(dir.clone());
    }
    config.validate()?;
    Ok(config)
}

fn outcome_json(outcome: &FrameOutcome) -> serde_json::Value {
    match outcome {
        FrameOutcome::NoFace => json!({ "outcome": outcome.name() }),
        FrameOutcome::CoarseOnly(landmarks) => json!({
            "outcome": outcome.name(),
            "source": landmarks.source().to_string(),
            "confidence": landmarks.confidence(),
            "points": landmarks.points().iter().map(|p| [p.x, p.y]).collect::<Vec<_>>(),
        }),
        FrameOutcome::Rendered(overlay) => {
            let angles = overlay.pose.euler_degrees();
            json!({
                "outcome": outcome.name(),
                "source": overlay.source_tier.to_string(),
                "confidence": overlay.confidence,
                "anchors": overlay.anchors_2d.iter().map(|p| [p.x, p.y]).collect::<Vec<_>>(),
                "placement": overlay.placement,
                "pose": {
                    "rotation": overlay.pose.rotation.as_slice(),
                    "translation": overlay.pose.translation.as_slice(),
                    "reprojection_error": overlay.pose.reprojection_error,
                    "pitch": angles.pitch,
                    "yaw": angles.yaw,
                    "roll": angles.roll,
                },
            })
        }
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if !is_image(&cli.input) {
        return Err(format!(
            "Unsupported input '{}', expected one of: {}",
            cli.input.display(),
            IMAGE_EXTENSIONS.join(", ")
        )
        .into());
    }
    if !cli.asset.exists() {
        return Err(format!("Asset manifest not found: {}", cli.asset.display()).into());
    }
    if let Some(output) = &cli.output {
        if !is_image(output) {
            return Err(format!(
                "Output '{}' must have an image extension",
                output.display()
            )
            .into());
        }
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(name: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {name}... {pct}%");
    } else {
        eprint!("\rDownloading {name}... {downloaded} bytes");
    }
    if total > 0 && downloaded >= total {
        eprintln!();
    }
}
