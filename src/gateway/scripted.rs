//! Scripted gateway.
//!
//! Inputs are queued one `TickScript` per simulation tick; `commit_and_step`
//! advances to the next script. When the queue runs dry the idle script is
//! replayed. Every call is recorded so tests can assert on the exact actuator
//! sequence the controller produced.

use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::time::Duration;

use crate::actuator::{IndicatorPattern, MotorCommand};
use crate::frame::{Frame, Rgb};
use crate::gateway::DeviceGateway;

/// One recorded gateway call.
#[derive(Clone, Debug, PartialEq)]
pub enum GatewayCall {
    ReadDistances,
    ReadAverageColor(u32),
    ReadFrame,
    SetIndicators(IndicatorPattern),
    SetMotors(MotorCommand),
    Step,
    Hold(Duration),
}

/// How the camera image for a tick is rendered.
#[derive(Clone, Debug, PartialEq)]
pub enum Scene {
    /// Every pixel the same BGR color.
    Uniform([u8; 3]),
    /// `fraction` of the pixels (rounded, filled row-major from the top left)
    /// take the `target` color; the rest take `background`.
    Target {
        background: [u8; 3],
        target: [u8; 3],
        fraction: f64,
    },
}

impl Scene {
    pub fn render(&self, width: u32, height: u32) -> Frame {
        match self {
            Scene::Uniform(bgr) => Frame::filled(width, height, *bgr),
            Scene::Target {
                background,
                target,
                fraction,
            } => {
                let mut frame = Frame::filled(width, height, *background);
                let total = (width as usize) * (height as usize);
                let marked = ((total as f64) * fraction).round() as usize;
                for index in 0..marked.min(total) {
                    let x = (index % width as usize) as u32;
                    let y = (index / width as usize) as u32;
                    frame.set_pixel(x, y, *target);
                }
                frame
            }
        }
    }
}

/// Inputs for one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TickScript {
    pub distances: Vec<f64>,
    /// Overrides the center-window average when set.
    pub average: Option<Rgb>,
    pub scene: Scene,
}

impl TickScript {
    /// Nothing nearby, flat gray camera image.
    pub fn quiet(sensor_count: usize) -> Self {
        Self {
            distances: vec![0.0; sensor_count],
            average: None,
            scene: Scene::Uniform([90, 90, 90]),
        }
    }

    pub fn with_distances(mut self, distances: Vec<f64>) -> Self {
        self.distances = distances;
        self
    }

    pub fn with_average(mut self, average: Rgb) -> Self {
        self.average = Some(average);
        self
    }

    pub fn with_scene(mut self, scene: Scene) -> Self {
        self.scene = scene;
        self
    }
}

pub struct ScriptedGateway {
    width: u32,
    height: u32,
    script: VecDeque<TickScript>,
    idle: TickScript,
    calls: Vec<GatewayCall>,
    steps: u64,
    fail_reads_at_step: Option<u64>,
    fail_frames_at_step: Option<u64>,
    fail_motors_at_step: Option<u64>,
}

impl ScriptedGateway {
    pub fn new(width: u32, height: u32, sensor_count: usize) -> Self {
        Self {
            width,
            height,
            script: VecDeque::new(),
            idle: TickScript::quiet(sensor_count),
            calls: Vec::new(),
            steps: 0,
            fail_reads_at_step: None,
            fail_frames_at_step: None,
            fail_motors_at_step: None,
        }
    }

    pub fn with_idle(mut self, idle: TickScript) -> Self {
        self.idle = idle;
        self
    }

    /// Queue inputs for the next unscripted tick.
    pub fn push(&mut self, tick: TickScript) -> &mut Self {
        self.script.push_back(tick);
        self
    }

    pub fn push_repeated(&mut self, tick: TickScript, count: usize) -> &mut Self {
        for _ in 0..count {
            self.script.push_back(tick.clone());
        }
        self
    }

    /// Make every sensor read fail once `steps` ticks have been committed.
    pub fn fail_reads_at_step(mut self, steps: u64) -> Self {
        self.fail_reads_at_step = Some(steps);
        self
    }

    /// Make full-frame reads fail once `steps` ticks have been committed.
    /// Averaged color reads keep working.
    pub fn fail_frames_at_step(mut self, steps: u64) -> Self {
        self.fail_frames_at_step = Some(steps);
        self
    }

    /// Make `set_motor_speeds` fail once `steps` ticks have been committed.
    pub fn fail_motors_at_step(mut self, steps: u64) -> Self {
        self.fail_motors_at_step = Some(steps);
        self
    }

    pub fn calls(&self) -> &[GatewayCall] {
        &self.calls
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn frame_reads(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, GatewayCall::ReadFrame))
            .count()
    }

    /// The motor command in force at each committed step, in order.
    pub fn committed_commands(&self) -> Vec<MotorCommand> {
        let mut current = MotorCommand::STOP;
        let mut committed = Vec::new();
        for call in &self.calls {
            match call {
                GatewayCall::SetMotors(cmd) => current = *cmd,
                GatewayCall::Step => committed.push(current),
                _ => {}
            }
        }
        committed
    }

    fn current(&self) -> &TickScript {
        self.script.front().unwrap_or(&self.idle)
    }

    fn check_health(&self) -> Result<()> {
        match self.fail_reads_at_step {
            Some(at) if self.steps >= at => {
                Err(anyhow!("scripted gateway: sensor bus offline at step {}", self.steps))
            }
            _ => Ok(()),
        }
    }

    fn failing(&self, at: Option<u64>) -> bool {
        at.is_some_and(|at| self.steps >= at)
    }
}

impl DeviceGateway for ScriptedGateway {
    fn read_distances(&mut self) -> Result<Vec<f64>> {
        self.calls.push(GatewayCall::ReadDistances);
        self.check_health()?;
        Ok(self.current().distances.clone())
    }

    fn read_camera_frame(&mut self) -> Result<Frame> {
        self.calls.push(GatewayCall::ReadFrame);
        self.check_health()?;
        if self.failing(self.fail_frames_at_step) {
            return Err(anyhow!("scripted gateway: camera offline at step {}", self.steps));
        }
        Ok(self.current().scene.render(self.width, self.height))
    }

    fn read_camera_average_color(&mut self, sample_size: u32) -> Result<Rgb> {
        self.calls.push(GatewayCall::ReadAverageColor(sample_size));
        self.check_health()?;
        let tick = self.current();
        Ok(match tick.average {
            Some(avg) => avg,
            None => tick
                .scene
                .render(self.width, self.height)
                .center_average(sample_size),
        })
    }

    fn set_indicators(&mut self, pattern: IndicatorPattern) -> Result<()> {
        self.calls.push(GatewayCall::SetIndicators(pattern));
        Ok(())
    }

    fn set_motor_speeds(&mut self, command: MotorCommand) -> Result<()> {
        self.calls.push(GatewayCall::SetMotors(command));
        if self.failing(self.fail_motors_at_step) {
            return Err(anyhow!("scripted gateway: motor driver fault at step {}", self.steps));
        }
        Ok(())
    }

    fn commit_and_step(&mut self) -> Result<()> {
        self.calls.push(GatewayCall::Step);
        self.steps += 1;
        self.script.pop_front();
        Ok(())
    }

    fn hold(&mut self, duration: Duration) -> Result<()> {
        self.calls.push(GatewayCall::Hold(duration));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_scene_marks_rounded_fraction() {
        let frame = Scene::Target {
            background: [200, 200, 200],
            target: [40, 60, 130],
            fraction: 0.06,
        }
        .render(20, 10);

        let marked = frame.pixels().filter(|px| px[0] == 40).count();
        assert_eq!(marked, 12);
    }

    #[test]
    fn step_advances_script_then_falls_back_to_idle() -> Result<()> {
        let mut gw = ScriptedGateway::new(4, 4, 2);
        gw.push(TickScript::quiet(2).with_distances(vec![1.0, 2.0]));

        assert_eq!(gw.read_distances()?, vec![1.0, 2.0]);
        gw.commit_and_step()?;
        assert_eq!(gw.read_distances()?, vec![0.0, 0.0]);
        assert_eq!(gw.steps(), 1);
        Ok(())
    }

    #[test]
    fn committed_commands_track_last_set_before_step() -> Result<()> {
        let mut gw = ScriptedGateway::new(4, 4, 2);
        gw.set_motor_speeds(MotorCommand::new(1.0, 1.0))?;
        gw.set_motor_speeds(MotorCommand::new(2.0, 2.0))?;
        gw.commit_and_step()?;
        gw.commit_and_step()?;

        assert_eq!(
            gw.committed_commands(),
            vec![MotorCommand::new(2.0, 2.0), MotorCommand::new(2.0, 2.0)]
        );
        Ok(())
    }

    #[test]
    fn reads_fail_after_configured_step() -> Result<()> {
        let mut gw = ScriptedGateway::new(4, 4, 2).fail_reads_at_step(1);
        assert!(gw.read_distances().is_ok());
        gw.commit_and_step()?;
        assert!(gw.read_distances().is_err());
        assert!(gw.read_camera_frame().is_err());
        Ok(())
    }

    #[test]
    fn frame_and_motor_faults_are_independent() -> Result<()> {
        let mut gw = ScriptedGateway::new(4, 4, 2)
            .fail_frames_at_step(0)
            .fail_motors_at_step(1);
        assert!(gw.read_camera_frame().is_err());
        assert!(gw.read_camera_average_color(3).is_ok());
        assert!(gw.read_distances().is_ok());

        gw.set_motor_speeds(MotorCommand::STOP)?;
        gw.commit_and_step()?;
        assert!(gw.set_motor_speeds(MotorCommand::STOP).is_err());
        assert!(gw.set_indicators(IndicatorPattern::OFF).is_ok());
        Ok(())
    }
}
