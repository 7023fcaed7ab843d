use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::detect::{ChannelRange, TargetBox};

const DEFAULT_CAMERA_WIDTH: u32 = 52;
const DEFAULT_CAMERA_HEIGHT: u32 = 39;
const DEFAULT_SAMPLE_SIZE: u32 = 5;
const DEFAULT_RED_MIN: f64 = 100.0;
const DEFAULT_GREEN_MIN: f64 = 100.0;
// Higher than red/green so open sky does not register as blue.
const DEFAULT_BLUE_MIN: f64 = 135.0;
const DEFAULT_CHECK_INTERVAL: u32 = 5;
const DEFAULT_FRACTION_THRESHOLD: f64 = 0.05;
const DEFAULT_SNAPSHOT_PATH: &str = "target_detected.png";
const DEFAULT_SNAPSHOT_SIZE: u32 = 32;
const DEFAULT_PAUSE_MS: u64 = 3000;
const DEFAULT_MANEUVER_REVERSE: f64 = 3.0;
const DEFAULT_MANEUVER_TURN: f64 = 2.0;
const DEFAULT_MAX_SPEED: f64 = 6.28;
const DEFAULT_BASE_SPEED: f64 = 3.14;
const DEFAULT_SENSOR_MAX: f64 = 4096.0;
const DEFAULT_OBSTACLE_THRESHOLD: f64 = 0.15;
const DEFAULT_FRONT_SENSORS: [usize; 2] = [0, 7];
const DEFAULT_NAV_REVERSE: f64 = 3.0;
const DEFAULT_TURN_BIAS: f64 = 1.5;
const DEFAULT_BLINK_PERIOD: u32 = 4;
const DEFAULT_TIMESTEP_MS: u64 = 64;

/// Sensor index -> [left, right] coefficient, e-puck ring order (ps0..ps7).
const DEFAULT_WEIGHTS: [[f64; 2]; 8] = [
    [-1.3, -1.0],
    [-1.3, -1.0],
    [-0.5, 0.5],
    [0.0, 0.0],
    [0.0, 0.0],
    [0.05, -0.5],
    [-0.75, 0.0],
    [-0.75, 0.0],
];

#[derive(Debug, Deserialize, Default)]
struct PilotConfigFile {
    camera: Option<CameraConfigFile>,
    palette: Option<PaletteConfigFile>,
    spotter: Option<SpotterConfigFile>,
    maneuver: Option<ManeuverConfigFile>,
    navigator: Option<NavigatorConfigFile>,
    indicators: Option<IndicatorConfigFile>,
    timestep_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    width: Option<u32>,
    height: Option<u32>,
    sample_size: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct PaletteConfigFile {
    red_min: Option<f64>,
    green_min: Option<f64>,
    blue_min: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct SpotterConfigFile {
    check_interval: Option<u32>,
    fraction_threshold: Option<f64>,
    snapshot_path: Option<PathBuf>,
    snapshot_size: Option<u32>,
    target: Option<TargetConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct TargetConfigFile {
    blue: Option<ChannelRange>,
    green: Option<ChannelRange>,
    red: Option<ChannelRange>,
}

#[derive(Debug, Deserialize, Default)]
struct ManeuverConfigFile {
    pause_ms: Option<u64>,
    pause_mode: Option<String>,
    reverse_speed: Option<f64>,
    turn_speed: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct NavigatorConfigFile {
    max_speed: Option<f64>,
    base_speed: Option<f64>,
    sensor_max: Option<f64>,
    obstacle_threshold: Option<f64>,
    front_sensors: Option<Vec<usize>>,
    reverse_speed: Option<f64>,
    turn_bias: Option<f64>,
    weights: Option<Vec<[f64; 2]>>,
}

#[derive(Debug, Deserialize, Default)]
struct IndicatorConfigFile {
    blink_period: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct PilotConfig {
    pub camera: CameraSettings,
    pub palette: PaletteSettings,
    pub spotter: SpotterSettings,
    pub maneuver: ManeuverSettings,
    pub navigator: NavigatorSettings,
    pub indicators: IndicatorSettings,
    /// Length of one simulation tick.
    pub timestep: Duration,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub width: u32,
    pub height: u32,
    /// Side of the centered square averaged for color observation.
    pub sample_size: u32,
}

#[derive(Debug, Clone)]
pub struct PaletteSettings {
    pub red_min: f64,
    pub green_min: f64,
    pub blue_min: f64,
}

#[derive(Debug, Clone)]
pub struct SpotterSettings {
    pub check_interval: u32,
    pub fraction_threshold: f64,
    pub snapshot_path: PathBuf,
    pub snapshot_size: u32,
    pub target: TargetBox,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PauseMode {
    /// Block the host; simulated time is frozen for the duration.
    WallClock,
    /// Keep stepping the simulation with the wheels stopped.
    SimTicks,
}

impl FromStr for PauseMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "wall_clock" | "wall-clock" => Ok(PauseMode::WallClock),
            "sim_ticks" | "sim-ticks" => Ok(PauseMode::SimTicks),
            other => Err(anyhow!(
                "unknown pause mode '{}' (expected wall_clock or sim_ticks)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ManeuverSettings {
    pub pause: Duration,
    pub pause_mode: PauseMode,
    pub reverse_speed: f64,
    pub turn_speed: f64,
}

#[derive(Debug, Clone)]
pub struct NavigatorSettings {
    pub max_speed: f64,
    pub base_speed: f64,
    /// Raw reading that normalizes to 1.0.
    pub sensor_max: f64,
    /// Normalized front reading above which the robot avoids.
    pub obstacle_threshold: f64,
    pub front_sensors: Vec<usize>,
    pub reverse_speed: f64,
    pub turn_bias: f64,
    pub weights: Vec<[f64; 2]>,
}

#[derive(Debug, Clone)]
pub struct IndicatorSettings {
    pub blink_period: u32,
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            camera: CameraSettings {
                width: DEFAULT_CAMERA_WIDTH,
                height: DEFAULT_CAMERA_HEIGHT,
                sample_size: DEFAULT_SAMPLE_SIZE,
            },
            palette: PaletteSettings {
                red_min: DEFAULT_RED_MIN,
                green_min: DEFAULT_GREEN_MIN,
                blue_min: DEFAULT_BLUE_MIN,
            },
            spotter: SpotterSettings {
                check_interval: DEFAULT_CHECK_INTERVAL,
                fraction_threshold: DEFAULT_FRACTION_THRESHOLD,
                snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
                snapshot_size: DEFAULT_SNAPSHOT_SIZE,
                target: TargetBox::default(),
            },
            maneuver: ManeuverSettings {
                pause: Duration::from_millis(DEFAULT_PAUSE_MS),
                pause_mode: PauseMode::WallClock,
                reverse_speed: DEFAULT_MANEUVER_REVERSE,
                turn_speed: DEFAULT_MANEUVER_TURN,
            },
            navigator: NavigatorSettings {
                max_speed: DEFAULT_MAX_SPEED,
                base_speed: DEFAULT_BASE_SPEED,
                sensor_max: DEFAULT_SENSOR_MAX,
                obstacle_threshold: DEFAULT_OBSTACLE_THRESHOLD,
                front_sensors: DEFAULT_FRONT_SENSORS.to_vec(),
                reverse_speed: DEFAULT_NAV_REVERSE,
                turn_bias: DEFAULT_TURN_BIAS,
                weights: DEFAULT_WEIGHTS.to_vec(),
            },
            indicators: IndicatorSettings {
                blink_period: DEFAULT_BLINK_PERIOD,
            },
            timestep: Duration::from_millis(DEFAULT_TIMESTEP_MS),
        }
    }
}

impl PilotConfig {
    /// Load using the file named by `PILOT_CONFIG`, if any.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("PILOT_CONFIG")
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Defaults, then the optional file, then env overrides, then validation.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: PilotConfigFile) -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(camera) = file.camera {
            cfg.camera.width = camera.width.unwrap_or(cfg.camera.width);
            cfg.camera.height = camera.height.unwrap_or(cfg.camera.height);
            cfg.camera.sample_size = camera.sample_size.unwrap_or(cfg.camera.sample_size);
        }
        if let Some(palette) = file.palette {
            cfg.palette.red_min = palette.red_min.unwrap_or(cfg.palette.red_min);
            cfg.palette.green_min = palette.green_min.unwrap_or(cfg.palette.green_min);
            cfg.palette.blue_min = palette.blue_min.unwrap_or(cfg.palette.blue_min);
        }
        if let Some(spotter) = file.spotter {
            let s = &mut cfg.spotter;
            s.check_interval = spotter.check_interval.unwrap_or(s.check_interval);
            s.fraction_threshold = spotter.fraction_threshold.unwrap_or(s.fraction_threshold);
            if let Some(path) = spotter.snapshot_path {
                s.snapshot_path = path;
            }
            s.snapshot_size = spotter.snapshot_size.unwrap_or(s.snapshot_size);
            if let Some(target) = spotter.target {
                s.target.blue = target.blue.unwrap_or(s.target.blue);
                s.target.green = target.green.unwrap_or(s.target.green);
                s.target.red = target.red.unwrap_or(s.target.red);
            }
        }
        if let Some(maneuver) = file.maneuver {
            let m = &mut cfg.maneuver;
            if let Some(ms) = maneuver.pause_ms {
                m.pause = Duration::from_millis(ms);
            }
            if let Some(mode) = maneuver.pause_mode.as_deref() {
                m.pause_mode = mode.parse()?;
            }
            m.reverse_speed = maneuver.reverse_speed.unwrap_or(m.reverse_speed);
            m.turn_speed = maneuver.turn_speed.unwrap_or(m.turn_speed);
        }
        if let Some(nav) = file.navigator {
            let n = &mut cfg.navigator;
            n.max_speed = nav.max_speed.unwrap_or(n.max_speed);
            n.base_speed = nav.base_speed.unwrap_or(n.base_speed);
            n.sensor_max = nav.sensor_max.unwrap_or(n.sensor_max);
            n.obstacle_threshold = nav.obstacle_threshold.unwrap_or(n.obstacle_threshold);
            if let Some(front) = nav.front_sensors {
                n.front_sensors = front;
            }
            n.reverse_speed = nav.reverse_speed.unwrap_or(n.reverse_speed);
            n.turn_bias = nav.turn_bias.unwrap_or(n.turn_bias);
            if let Some(weights) = nav.weights {
                n.weights = weights;
            }
        }
        if let Some(indicators) = file.indicators {
            cfg.indicators.blink_period = indicators
                .blink_period
                .unwrap_or(cfg.indicators.blink_period);
        }
        if let Some(ms) = file.timestep_ms {
            cfg.timestep = Duration::from_millis(ms);
        }
        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("PILOT_SNAPSHOT_PATH") {
            if !path.trim().is_empty() {
                self.spotter.snapshot_path = PathBuf::from(path);
            }
        }
        if let Ok(interval) = std::env::var("PILOT_CHECK_INTERVAL") {
            self.spotter.check_interval = interval
                .trim()
                .parse()
                .map_err(|_| anyhow!("PILOT_CHECK_INTERVAL must be a positive integer"))?;
        }
        if let Ok(pause) = std::env::var("PILOT_PAUSE_MS") {
            let ms: u64 = pause
                .trim()
                .parse()
                .map_err(|_| anyhow!("PILOT_PAUSE_MS must be an integer number of milliseconds"))?;
            self.maneuver.pause = Duration::from_millis(ms);
        }
        if let Ok(mode) = std::env::var("PILOT_PAUSE_MODE") {
            if !mode.trim().is_empty() {
                self.maneuver.pause_mode = mode.parse()?;
            }
        }
        if let Ok(step) = std::env::var("PILOT_TIMESTEP_MS") {
            let ms: u64 = step
                .trim()
                .parse()
                .map_err(|_| anyhow!("PILOT_TIMESTEP_MS must be an integer number of milliseconds"))?;
            self.timestep = Duration::from_millis(ms);
        }
        Ok(())
    }

    /// Startup checks. A config that fails here never reaches the control loop.
    pub fn validate(&self) -> Result<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera dimensions must be non-zero"));
        }
        if self.camera.sample_size == 0 {
            return Err(anyhow!("camera sample_size must be at least 1"));
        }
        for (name, min) in [
            ("red_min", self.palette.red_min),
            ("green_min", self.palette.green_min),
            ("blue_min", self.palette.blue_min),
        ] {
            if !(0.0..=255.0).contains(&min) {
                return Err(anyhow!("palette {} must be within 0..=255, got {}", name, min));
            }
        }

        let spotter = &self.spotter;
        if spotter.check_interval == 0 {
            return Err(anyhow!("spotter check_interval must be at least 1"));
        }
        if !(spotter.fraction_threshold > 0.0 && spotter.fraction_threshold < 1.0) {
            return Err(anyhow!(
                "spotter fraction_threshold must be within (0, 1), got {}",
                spotter.fraction_threshold
            ));
        }
        if spotter.snapshot_size == 0 {
            return Err(anyhow!("spotter snapshot_size must be at least 1"));
        }
        if spotter.snapshot_path.as_os_str().is_empty() {
            return Err(anyhow!("spotter snapshot_path must not be empty"));
        }
        spotter.target.validate()?;

        let nav = &self.navigator;
        if !(nav.max_speed.is_finite() && nav.max_speed > 0.0) {
            return Err(anyhow!("navigator max_speed must be positive"));
        }
        if !(nav.sensor_max.is_finite() && nav.sensor_max > 0.0) {
            return Err(anyhow!("navigator sensor_max must be positive"));
        }
        if !(0.0..=1.0).contains(&nav.obstacle_threshold) {
            return Err(anyhow!(
                "navigator obstacle_threshold is normalized and must be within 0..=1"
            ));
        }
        if nav.weights.is_empty() {
            return Err(anyhow!("navigator weight table must not be empty"));
        }
        if nav.weights.iter().flatten().any(|w| !w.is_finite()) {
            return Err(anyhow!("navigator weight table contains a non-finite value"));
        }
        if nav.front_sensors.is_empty() {
            return Err(anyhow!("navigator needs at least one front sensor"));
        }
        if let Some(bad) = nav.front_sensors.iter().find(|&&idx| idx >= nav.weights.len()) {
            return Err(anyhow!(
                "front sensor {} out of range for {} weighted sensors",
                bad,
                nav.weights.len()
            ));
        }
        for (name, speed) in [
            ("navigator base_speed", nav.base_speed),
            ("navigator reverse_speed", nav.reverse_speed),
            ("navigator turn_bias", nav.turn_bias),
            ("maneuver reverse_speed", self.maneuver.reverse_speed),
            ("maneuver turn_speed", self.maneuver.turn_speed),
        ] {
            if !(speed.is_finite() && speed.abs() <= nav.max_speed) {
                return Err(anyhow!(
                    "{} must be within max_speed {}, got {}",
                    name,
                    nav.max_speed,
                    speed
                ));
            }
        }

        if self.indicators.blink_period == 0 {
            return Err(anyhow!("indicator blink_period must be at least 1"));
        }
        if self.timestep.is_zero() {
            return Err(anyhow!("timestep_ms must be greater than zero"));
        }
        Ok(())
    }

    /// Number of proximity sensors the weight table expects.
    pub fn sensor_count(&self) -> usize {
        self.navigator.weights.len()
    }
}

fn read_config_file(path: &Path) -> Result<PilotConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg: PilotConfigFile = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
