mod image_file;
mod region_args;
mod settings;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::Parser;

use redact_core::detection::domain::candidate_filter::OverlapFilter;
use redact_core::detection::domain::text_detector::TextDetector;
use redact_core::detection::infrastructure::cached_text_detector::CachedTextDetector;
use redact_core::mosaic::domain::coordinate_mapper::PixelRect;
use redact_core::mosaic::domain::region::{MosaicIntensity, Region};
use redact_core::pipeline::redact_image_use_case::{RedactImageUseCase, RedactRequest};
use redact_core::shared::constants::IMAGE_EXTENSIONS;
use redact_core::shared::normalized_rect::NormalizedRect;

use image_file::{ImageFileReader, ImageFileWriter};
use settings::Settings;

/// Pixelate rectangular regions of an image.
#[derive(Parser)]
#[command(name = "redact")]
struct Cli {
    /// Input image file.
    input: PathBuf,

    /// Output image file.
    output: PathBuf,

    /// Region in normalized top-left units: x,y,w,h (repeatable).
    #[arg(long = "region", value_parser = region_args::parse_rect)]
    regions: Vec<NormalizedRect>,

    /// Region in top-left pixel units: x,y,w,h (repeatable).
    #[arg(long = "pixel-region", value_parser = region_args::parse_pixel_rect)]
    pixel_regions: Vec<PixelRect>,

    /// JSON file with an array of regions.
    #[arg(long)]
    regions_file: Option<PathBuf>,

    /// JSON sidecar of precomputed text boxes used by --auto-detect.
    #[arg(long)]
    text_boxes: Option<PathBuf>,

    /// Add detected text boxes as regions.
    #[arg(long)]
    auto_detect: bool,

    /// Mosaic intensity: strong.
    #[arg(long)]
    intensity: Option<MosaicIntensity>,

    /// Region indices to leave unpixelated (comma-separated).
    #[arg(long, value_delimiter = ',')]
    disable: Vec<usize>,

    /// Seconds to wait for text detection before giving up.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Drop detected boxes whose IoU with a region exceeds this (0.0-1.0).
    #[arg(long)]
    overlap_threshold: Option<f64>,

    /// Store the effective intensity, timeout and threshold as defaults.
    #[arg(long)]
    save_settings: bool,
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

    let settings = effective_settings(&cli, Settings::load());
    settings.validate()?;
    if cli.save_settings {
        settings.save();
    }

    let mut regions: Vec<Region> = cli
        .regions
        .iter()
        .map(|rect| Region::new(*rect, settings.intensity))
        .collect();
    if let Some(path) = &cli.regions_file {
        regions.extend(region_args::load_regions_file(path)?);
    }

    let detector = match &cli.text_boxes {
        Some(path) => Some(open_text_boxes(path)?),
        None => None,
    };

    let mut use_case = RedactImageUseCase::new(
        Box::new(ImageFileReader::new()),
        Box::new(ImageFileWriter::new()),
        detector,
    )
    .with_intensity(settings.intensity)
    .with_detection_timeout(Duration::from_secs(settings.detection_timeout_secs));
    if let Some(threshold) = settings.overlap_threshold {
        use_case = use_case.with_candidate_filter(Box::new(OverlapFilter::new(threshold)));
    }

    let request = RedactRequest {
        regions,
        pixel_regions: cli.pixel_regions.clone(),
        auto_detect: cli.auto_detect,
        disabled: cli.disable.clone(),
    };
    let summary = use_case.execute(&cli.input, &cli.output, &request)?;
    log::info!(
        "Pixelated {} of {} regions ({} detected)",
        summary.active,
        summary.regions,
        summary.detected
    );
    log::info!("Output written to {}", cli.output.display());
    Ok(())
}

fn effective_settings(cli: &Cli, stored: Settings) -> Settings {
    Settings {
        intensity: cli.intensity.unwrap_or(stored.intensity),
        detection_timeout_secs: cli.timeout_secs.unwrap_or(stored.detection_timeout_secs),
        overlap_threshold: cli.overlap_threshold.or(stored.overlap_threshold),
    }
}

fn open_text_boxes(path: &Path) -> Result<Box<dyn TextDetector>, Box<dyn std::error::Error>> {
    let file = File::open(path)
        .map_err(|e| format!("Cannot open text boxes {}: {e}", path.display()))?;
    let detector = CachedTextDetector::from_reader(BufReader::new(file))
        .map_err(|e| format!("Invalid text boxes {}: {e}", path.display()))?;
    Ok(Box::new(detector))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if !is_image(&cli.input) {
        return Err(format!("Unsupported input format: {}", cli.input.display()).into());
    }
    if !is_image(&cli.output) {
        return Err(format!("Unsupported output format: {}", cli.output.display()).into());
    }
    if cli.auto_detect && cli.text_boxes.is_none() {
        return Err("--auto-detect requires --text-boxes".into());
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
