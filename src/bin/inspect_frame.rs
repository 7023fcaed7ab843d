//! inspect_frame - run the color observer and target mask on a saved image.
//!
//! Useful for tuning palette minimums and the target box offline: the image is
//! decoded, treated as one camera frame, and classified with the same rules the
//! control loop uses.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use arena_pilot::{ColorObserver, Frame, PilotConfig, PixelClassifier};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Classify a saved camera image with the pilot's color and target rules"
)]
struct Args {
    /// Image to inspect (PNG or JPEG).
    image: PathBuf,

    /// Config file (.toml or JSON).
    #[arg(long, env = "PILOT_CONFIG")]
    config: Option<PathBuf>,

    /// Averaging window; defaults to the configured camera sample size.
    #[arg(long)]
    sample_size: Option<u32>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let cfg = PilotConfig::load_from(args.config.as_deref())?;

    let image = image::open(&args.image)
        .with_context(|| format!("failed to decode {}", args.image.display()))?;
    let frame = Frame::from_image(&image);
    if frame.width() != cfg.camera.width || frame.height() != cfg.camera.height {
        log::warn!(
            "image is {}x{}, configured camera is {}x{}",
            frame.width(),
            frame.height(),
            cfg.camera.width,
            cfg.camera.height
        );
    }

    let sample = args.sample_size.unwrap_or(cfg.camera.sample_size);
    let average = frame.center_average(sample);
    let observer = ColorObserver::new(&cfg.palette);
    let color = observer
        .classify(&average)
        .map(|c| c.name())
        .unwrap_or("none");

    let target = cfg.spotter.target;
    let mask = target.classify_frame(&frame);
    let fraction = mask.fraction();

    println!("image: {} ({}x{})", args.image.display(), frame.width(), frame.height());
    println!(
        "average color ({}x{} center): r={:.1} g={:.1} b={:.1} -> {}",
        sample, sample, average.red, average.green, average.blue, color
    );
    println!(
        "{}: {}/{} pixels = {:.2}% (threshold {:.2}%) -> {}",
        target.name(),
        mask.matching,
        mask.total,
        fraction * 100.0,
        cfg.spotter.fraction_threshold * 100.0,
        if fraction > cfg.spotter.fraction_threshold {
            "TRIGGER"
        } else {
            "no trigger"
        }
    );
    Ok(())
}
