//! pilot - run the arena control loop
//!
//! This binary:
//! 1. Loads configuration (defaults, optional file, env overrides) and validates it
//! 2. Attaches the synthetic arena gateway
//! 3. Runs the cycle arbiter until a gateway call fails, or for --max-cycles

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use arena_pilot::{ArenaConfig, CycleArbiter, PilotConfig, SyntheticArena};

#[derive(Parser, Debug)]
#[command(author, version, about = "Reactive control loop for a small arena robot")]
struct Args {
    /// Config file (.toml or JSON).
    #[arg(long, env = "PILOT_CONFIG")]
    config: Option<PathBuf>,

    /// Seed for the synthetic arena.
    #[arg(long, env = "PILOT_SEED", default_value_t = 7)]
    seed: u64,

    /// Stop after this many cycles instead of running until interrupted.
    #[arg(long, env = "PILOT_MAX_CYCLES")]
    max_cycles: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // Configuration errors are fatal before the loop starts.
    let cfg = PilotConfig::load_from(args.config.as_deref())?;

    let arena = SyntheticArena::new(ArenaConfig {
        width: cfg.camera.width,
        height: cfg.camera.height,
        sensor_count: cfg.sensor_count(),
        front_sensors: cfg.navigator.front_sensors.clone(),
        seed: args.seed,
    })?;

    log::info!(
        "pilot running: camera {}x{}, spotter every {} cycles (threshold {:.2}), snapshot {}",
        cfg.camera.width,
        cfg.camera.height,
        cfg.spotter.check_interval,
        cfg.spotter.fraction_threshold,
        cfg.spotter.snapshot_path.display()
    );
    log::info!(
        "pause {:?} for {}ms, timestep {}ms",
        cfg.maneuver.pause_mode,
        cfg.maneuver.pause.as_millis(),
        cfg.timestep.as_millis()
    );

    let mut arbiter = CycleArbiter::new(&cfg, arena)?;
    match args.max_cycles {
        Some(count) => arbiter.run_cycles(count)?,
        None => arbiter.run()?,
    }

    let stats = arbiter.gateway().stats();
    let seen: Vec<&str> = arbiter
        .observer()
        .seen_summary()
        .into_iter()
        .map(|c| c.name())
        .collect();
    log::info!(
        "pilot stopped after {} cycles ({} ticks, {} frames); colors seen: [{}]; target triggered: {}",
        arbiter.cycles(),
        stats.ticks,
        stats.frames_rendered,
        seen.join(", "),
        arbiter.spotter().state().triggered()
    );
    log::info!(
        "last committed: left={:.2} right={:.2} leds={:08b}",
        stats.last_command.left,
        stats.last_command.right,
        stats.last_indicators.bits()
    );
    Ok(())
}
