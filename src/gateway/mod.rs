//! Device gateways.
//!
//! A gateway is the only path between the control loop and the robot:
//! - proximity readings and camera images flow in
//! - motor speeds and indicator patterns flow out
//! - `commit_and_step` applies the outputs and advances one simulated tick
//!
//! Gateways shipped with the crate:
//! - `ScriptedGateway`: tick-by-tick scripted inputs, records every call (tests)
//! - `SyntheticArena`: seeded procedural arena (the `pilot` binary)
//!
//! Every call is synchronous. A failing call is not recoverable inside the loop;
//! errors propagate and stop the controller.

pub mod scripted;
pub mod synthetic;

use anyhow::Result;
use std::time::Duration;

use crate::actuator::{IndicatorPattern, MotorCommand};
use crate::frame::{Frame, Rgb};

pub use scripted::{GatewayCall, ScriptedGateway, Scene, TickScript};
pub use synthetic::{ArenaConfig, ArenaStats, SyntheticArena};

/// Synchronous access to the robot's sensors and actuators.
pub trait DeviceGateway {
    /// One reading per proximity sensor, in sensor index order.
    fn read_distances(&mut self) -> Result<Vec<f64>>;

    /// The full current camera image.
    fn read_camera_frame(&mut self) -> Result<Frame>;

    /// Average color of a `sample_size` square at the image center.
    fn read_camera_average_color(&mut self, sample_size: u32) -> Result<Rgb> {
        let frame = self.read_camera_frame()?;
        Ok(frame.center_average(sample_size))
    }

    fn set_indicators(&mut self, pattern: IndicatorPattern) -> Result<()>;

    fn set_motor_speeds(&mut self, command: MotorCommand) -> Result<()>;

    /// Commit pending actuator values and advance the simulation by one tick.
    fn commit_and_step(&mut self) -> Result<()>;

    /// Block the host for `duration` without stepping the simulation.
    fn hold(&mut self, duration: Duration) -> Result<()> {
        std::thread::sleep(duration);
        Ok(())
    }
}
