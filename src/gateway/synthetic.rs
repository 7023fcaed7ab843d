//! Synthetic arena gateway.
//!
//! Stands in for the simulator when none is attached. The arena is a fixed
//! schedule of scenes that repeats every `CYCLE_TICKS` ticks:
//! - a red wall, then a green wall ahead
//! - an obstacle close to the front sensors
//! - a blue wall
//! - open floor with a brown target object on the left of the image
//!
//! Readings carry seeded noise so runs are reproducible per seed. The arena
//! does not model kinematics: motor commands are recorded, not integrated.

use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::actuator::{IndicatorPattern, MotorCommand};
use crate::frame::Frame;
use crate::gateway::DeviceGateway;

const CYCLE_TICKS: u64 = 400;

const SKY_BGR: [u8; 3] = [210, 160, 120];
const FLOOR_BGR: [u8; 3] = [110, 110, 110];
const RED_WALL_BGR: [u8; 3] = [40, 40, 190];
const GREEN_WALL_BGR: [u8; 3] = [40, 180, 50];
const BLUE_WALL_BGR: [u8; 3] = [200, 50, 40];
const TARGET_BGR: [u8; 3] = [40, 65, 130];

/// Raw proximity reading with nothing in range.
const AMBIENT_READING: f64 = 60.0;
/// Raw proximity reading for an obstacle almost touching the sensor.
const OBSTACLE_READING: f64 = 2400.0;

/// Configuration for the synthetic arena.
#[derive(Clone, Debug)]
pub struct ArenaConfig {
    pub width: u32,
    pub height: u32,
    pub sensor_count: usize,
    /// Sensor indices that face forward; these see the scheduled obstacle.
    pub front_sensors: Vec<usize>,
    pub seed: u64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 52,
            height: 39,
            sensor_count: 8,
            front_sensors: vec![0, 7],
            seed: 7,
        }
    }
}

/// Statistics for a synthetic arena run.
#[derive(Clone, Debug, Default)]
pub struct ArenaStats {
    pub ticks: u64,
    pub frames_rendered: u64,
    pub last_command: MotorCommand,
    pub last_indicators: IndicatorPattern,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    RedWall,
    GreenWall,
    Obstacle,
    BlueWall,
    Target,
}

pub struct SyntheticArena {
    config: ArenaConfig,
    rng: StdRng,
    stats: ArenaStats,
    pending_command: MotorCommand,
    pending_indicators: IndicatorPattern,
}

impl SyntheticArena {
    pub fn new(config: ArenaConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(anyhow!("synthetic arena needs a non-empty camera"));
        }
        if let Some(bad) = config
            .front_sensors
            .iter()
            .find(|&&idx| idx >= config.sensor_count)
        {
            return Err(anyhow!(
                "front sensor {} out of range for {} sensors",
                bad,
                config.sensor_count
            ));
        }
        log::info!(
            "SyntheticArena: {}x{} camera, {} sensors, seed {}",
            config.width,
            config.height,
            config.sensor_count,
            config.seed
        );
        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            stats: ArenaStats::default(),
            pending_command: MotorCommand::STOP,
            pending_indicators: IndicatorPattern::OFF,
        })
    }

    pub fn stats(&self) -> &ArenaStats {
        &self.stats
    }

    fn phase(&self) -> Phase {
        match self.stats.ticks % CYCLE_TICKS {
            0..=99 => Phase::RedWall,
            100..=159 => Phase::GreenWall,
            160..=219 => Phase::Obstacle,
            220..=299 => Phase::BlueWall,
            _ => Phase::Target,
        }
    }

    fn jitter(&mut self, value: u8) -> u8 {
        let delta: i16 = self.rng.gen_range(-6..=6);
        (value as i16 + delta).clamp(0, 255) as u8
    }

    fn render(&mut self) -> Frame {
        let (width, height) = (self.config.width, self.config.height);
        let phase = self.phase();
        let wall = match phase {
            Phase::RedWall => Some(RED_WALL_BGR),
            Phase::GreenWall => Some(GREEN_WALL_BGR),
            Phase::BlueWall => Some(BLUE_WALL_BGR),
            Phase::Obstacle | Phase::Target => None,
        };

        let mut frame = Frame::filled(width, height, FLOOR_BGR);
        for y in 0..height {
            for x in 0..width {
                let base = if y < height / 3 {
                    SKY_BGR
                } else if y < height * 2 / 3 {
                    wall.unwrap_or(FLOOR_BGR)
                } else {
                    FLOOR_BGR
                };
                let base = if phase == Phase::Target && x < width / 3 && y >= height / 2 {
                    TARGET_BGR
                } else {
                    base
                };
                let px = [self.jitter(base[0]), self.jitter(base[1]), self.jitter(base[2])];
                frame.set_pixel(x, y, px);
            }
        }
        self.stats.frames_rendered += 1;
        frame
    }
}

impl DeviceGateway for SyntheticArena {
    fn read_distances(&mut self) -> Result<Vec<f64>> {
        let obstacle = self.phase() == Phase::Obstacle;
        let mut readings = Vec::with_capacity(self.config.sensor_count);
        for idx in 0..self.config.sensor_count {
            let base = if obstacle && self.config.front_sensors.contains(&idx) {
                OBSTACLE_READING
            } else {
                AMBIENT_READING
            };
            readings.push(base + self.rng.gen_range(0.0..20.0));
        }
        Ok(readings)
    }

    fn read_camera_frame(&mut self) -> Result<Frame> {
        Ok(self.render())
    }

    fn set_indicators(&mut self, pattern: IndicatorPattern) -> Result<()> {
        self.pending_indicators = pattern;
        Ok(())
    }

    fn set_motor_speeds(&mut self, command: MotorCommand) -> Result<()> {
        if !command.left.is_finite() || !command.right.is_finite() {
            return Err(anyhow!("non-finite motor command {:?}", command));
        }
        self.pending_command = command;
        Ok(())
    }

    fn commit_and_step(&mut self) -> Result<()> {
        self.stats.ticks += 1;
        self.stats.last_command = self.pending_command;
        self.stats.last_indicators = self.pending_indicators;
        log::trace!(
            "arena tick {}: left={:.2} right={:.2} leds={:08b}",
            self.stats.ticks,
            self.pending_command.left,
            self.pending_command.right,
            self.pending_indicators.bits()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_front_sensor_out_of_range() {
        let config = ArenaConfig {
            front_sensors: vec![9],
            ..ArenaConfig::default()
        };
        assert!(SyntheticArena::new(config).is_err());
    }

    #[test]
    fn same_seed_same_readings() -> Result<()> {
        let mut a = SyntheticArena::new(ArenaConfig::default())?;
        let mut b = SyntheticArena::new(ArenaConfig::default())?;
        assert_eq!(a.read_distances()?, b.read_distances()?);
        Ok(())
    }

    #[test]
    fn obstacle_phase_raises_front_sensors() -> Result<()> {
        let mut arena = SyntheticArena::new(ArenaConfig::default())?;
        for _ in 0..170 {
            arena.commit_and_step()?;
        }
        let readings = arena.read_distances()?;
        assert!(readings[0] >= OBSTACLE_READING);
        assert!(readings[7] >= OBSTACLE_READING);
        assert!(readings[3] < OBSTACLE_READING);
        Ok(())
    }

    #[test]
    fn stats_record_committed_actuators() -> Result<()> {
        let mut arena = SyntheticArena::new(ArenaConfig::default())?;
        arena.set_motor_speeds(MotorCommand::new(1.5, -1.5))?;
        arena.set_indicators(IndicatorPattern::ALL_ON)?;
        assert_eq!(arena.stats().last_command, MotorCommand::STOP);

        arena.commit_and_step()?;
        let stats = arena.stats();
        assert_eq!(stats.ticks, 1);
        assert_eq!(stats.last_command, MotorCommand::new(1.5, -1.5));
        assert_eq!(stats.last_indicators, IndicatorPattern::ALL_ON);
        Ok(())
    }

    #[test]
    fn red_wall_fills_image_center() -> Result<()> {
        let mut arena = SyntheticArena::new(ArenaConfig::default())?;
        let avg = arena.read_camera_average_color(5)?;
        assert!(avg.red > 150.0);
        assert!(avg.red > avg.green && avg.red > avg.blue);
        Ok(())
    }
}
