//! rectilut - Rectify images through a precomputed lookup table
//!
//! Reads a rig description, builds the remapping table from the distorted
//! source camera to a rotated linear camera, and writes the rectified image.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rectilut::config::Config;
use rectilut::{lookup_table_for_target, rectify_to_vec, valid_region, CameraModel};

/// rectilut - LUT-based rectification of distorted camera images
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "rectilut.toml")]
    config: PathBuf,

    /// Input image (converted to 8-bit grayscale)
    #[arg(short, long, required_unless_present = "bounds_only")]
    input: Option<PathBuf>,

    /// Output image path
    #[arg(short, long, required_unless_present = "bounds_only")]
    output: Option<PathBuf>,

    /// Only report the valid column and row ranges, then exit
    #[arg(long)]
    bounds_only: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("rectilut v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load_or_create(&args.config)?;
    let camera = config.camera_model();
    let rotation = config.rotation();

    info!(
        "Source camera: {} {}x{}",
        config.camera.model_name(),
        camera.width(),
        camera.height()
    );

    if args.bounds_only {
        let (cols, rows) = valid_region(camera.as_ref(), &rotation.transpose());
        info!("Valid columns: {}", cols);
        info!("Valid rows: {}", rows);
        return Ok(());
    }

    let (Some(input), Some(output)) = (args.input.as_ref(), args.output.as_ref()) else {
        anyhow::bail!("--input and --output are required unless --bounds-only is set");
    };

    let image = image::open(input)
        .with_context(|| format!("Failed to read image {:?}", input))?
        .to_luma8();
    anyhow::ensure!(
        image.width() as usize == camera.width() && image.height() as usize == camera.height(),
        "Image {:?} is {}x{} but the source camera is {}x{}",
        input,
        image.width(),
        image.height(),
        camera.width(),
        camera.height()
    );

    let target = config.target_camera()?;
    info!(
        "Target camera: {}x{} f=({:.1}, {:.1}) c=({:.1}, {:.1})",
        target.width, target.height, target.fx, target.fy, target.cx, target.cy
    );

    let start = Instant::now();
    let lut = lookup_table_for_target(camera.as_ref(), &rotation, &target)
        .context("Failed to build lookup table")?;
    info!(
        "Lookup table ready in {:.2} ms",
        start.elapsed().as_secs_f64() * 1000.0
    );

    let start = Instant::now();
    let pixels = rectify_to_vec(&lut, image.as_raw()).context("Failed to rectify image")?;
    info!(
        "Rectified {}x{} image in {:.2} ms",
        lut.width(),
        lut.height(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    let rectified = image::GrayImage::from_raw(lut.width() as u32, lut.height() as u32, pixels)
        .context("Rectified buffer does not match the table size")?;
    rectified
        .save(output)
        .with_context(|| format!("Failed to write image {:?}", output))?;
    info!("Wrote {:?}", output);

    Ok(())
}
