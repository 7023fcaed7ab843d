//! One-shot avoidance sequence run after the target is spotted.
//!
//! Stopping -> Pausing -> Backing -> Turning -> Done. Each call to
//! `next_action` yields the action for the current phase and advances, so the
//! caller decides how (and how quickly) each step reaches the gateway.

use std::time::Duration;

use crate::actuator::MotorCommand;
use crate::config::{ManeuverSettings, PauseMode};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManeuverPhase {
    Idle,
    Stopping,
    Pausing,
    Backing,
    Turning,
    Done,
}

/// How the settle pause is spent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pause {
    /// Block the host for the duration.
    WallClock(Duration),
    /// Step the simulation this many times with the wheels stopped.
    SimTicks(u32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ManeuverAction {
    /// Apply `command`; when `step` is set, commit and advance one tick.
    Drive { command: MotorCommand, step: bool },
    Hold(Pause),
}

#[derive(Clone, Debug)]
pub struct AvoidanceSequence {
    phase: ManeuverPhase,
    pause: Pause,
    reverse: MotorCommand,
    turn_right: MotorCommand,
}

impl AvoidanceSequence {
    pub fn new(settings: &ManeuverSettings, timestep: Duration) -> Self {
        let pause = match settings.pause_mode {
            PauseMode::WallClock => Pause::WallClock(settings.pause),
            PauseMode::SimTicks => {
                let step_ms = timestep.as_millis().max(1);
                let ticks = settings.pause.as_millis().div_ceil(step_ms);
                Pause::SimTicks(u32::try_from(ticks).unwrap_or(u32::MAX))
            }
        };
        Self {
            phase: ManeuverPhase::Idle,
            pause,
            reverse: MotorCommand::new(-settings.reverse_speed, -settings.reverse_speed),
            turn_right: MotorCommand::new(settings.turn_speed, -settings.turn_speed),
        }
    }

    pub fn phase(&self) -> ManeuverPhase {
        self.phase
    }

    pub fn pause(&self) -> Pause {
        self.pause
    }

    pub fn is_done(&self) -> bool {
        self.phase == ManeuverPhase::Done
    }

    /// Arm the sequence. Returns false if it was already started.
    pub fn start(&mut self) -> bool {
        if self.phase != ManeuverPhase::Idle {
            return false;
        }
        self.phase = ManeuverPhase::Stopping;
        true
    }

    /// Action for the current phase; `None` while idle or once done.
    pub fn next_action(&mut self) -> Option<ManeuverAction> {
        let (action, next) = match self.phase {
            ManeuverPhase::Idle | ManeuverPhase::Done => return None,
            ManeuverPhase::Stopping => (
                ManeuverAction::Drive {
                    command: MotorCommand::STOP,
                    step: true,
                },
                ManeuverPhase::Pausing,
            ),
            ManeuverPhase::Pausing => (ManeuverAction::Hold(self.pause), ManeuverPhase::Backing),
            ManeuverPhase::Backing => (
                ManeuverAction::Drive {
                    command: self.reverse,
                    step: true,
                },
                ManeuverPhase::Turning,
            ),
            // Committed by the cycle's closing step.
            ManeuverPhase::Turning => (
                ManeuverAction::Drive {
                    command: self.turn_right,
                    step: false,
                },
                ManeuverPhase::Done,
            ),
        };
        self.phase = next;
        Some(action)
    }
}
