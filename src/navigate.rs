//! Reactive navigator.
//!
//! Cruising is Braitenberg-style: each wheel runs at the base speed plus a
//! fixed weighted sum of the normalized proximity readings. When any front
//! sensor crosses the obstacle threshold the navigator switches to a fixed
//! reverse-and-turn-left command instead.

use anyhow::{anyhow, Result};

use crate::actuator::MotorCommand;
use crate::config::NavigatorSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavMode {
    Cruising,
    Avoiding,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NavDecision {
    pub mode: NavMode,
    pub command: MotorCommand,
}

#[derive(Clone, Debug)]
pub struct Navigator {
    settings: NavigatorSettings,
}

impl Navigator {
    pub fn new(settings: &NavigatorSettings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    /// Readings expected per snapshot (one weight row per sensor).
    pub fn sensor_count(&self) -> usize {
        self.settings.weights.len()
    }

    /// Backing up with the left wheel reversing harder, so the robot swings left.
    pub fn avoidance_command(&self) -> MotorCommand {
        let s = &self.settings;
        MotorCommand::new(-(s.reverse_speed + s.turn_bias), -(s.reverse_speed - s.turn_bias))
            .clipped(s.max_speed)
    }

    pub fn decide(&self, readings: &[f64]) -> Result<NavDecision> {
        let normalized = self.normalize(readings)?;

        let mut blocked = false;
        for &idx in &self.settings.front_sensors {
            let reading = normalized.get(idx).ok_or_else(|| {
                anyhow!(
                    "malformed sensor snapshot: front sensor {} missing from {} readings",
                    idx,
                    normalized.len()
                )
            })?;
            blocked |= *reading > self.settings.obstacle_threshold;
        }
        if blocked {
            return Ok(NavDecision {
                mode: NavMode::Avoiding,
                command: self.avoidance_command(),
            });
        }

        let s = &self.settings;
        let mut wheels = [s.base_speed; 2];
        for (reading, weights) in normalized.iter().zip(&s.weights) {
            wheels[0] += s.max_speed * weights[0] * reading;
            wheels[1] += s.max_speed * weights[1] * reading;
        }
        Ok(NavDecision {
            mode: NavMode::Cruising,
            command: MotorCommand::new(wheels[0], wheels[1]).clipped(s.max_speed),
        })
    }

    fn normalize(&self, readings: &[f64]) -> Result<Vec<f64>> {
        if readings.len() != self.sensor_count() {
            return Err(anyhow!(
                "malformed sensor snapshot: expected {} readings, got {}",
                self.sensor_count(),
                readings.len()
            ));
        }
        readings
            .iter()
            .enumerate()
            .map(|(idx, &raw)| {
                if raw.is_finite() {
                    Ok((raw / self.settings.sensor_max).clamp(0.0, 1.0))
                } else {
                    Err(anyhow!("malformed sensor snapshot: sensor {} read {}", idx, raw))
                }
            })
            .collect()
    }
}
