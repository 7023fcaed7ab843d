//! Arena Pilot
//!
//! Reactive control loop for a small wheeled robot in a simulated arena.
//!
//! # Architecture
//!
//! Every control cycle fuses proximity readings and the camera into exactly one
//! motor command and an indicator pattern. Three behaviors evolve independently:
//!
//! 1. **Color observation**: the averaged camera color is classified against a
//!    red/green/blue palette; each color's "ever seen" flag only moves forward.
//! 2. **Object spotting**: every Nth cycle the full frame is masked for the
//!    target material. The first confident detection writes a small snapshot
//!    and runs a one-shot stop, pause, back up, turn right sequence.
//! 3. **Navigation**: Braitenberg cruising, or a fixed reverse-and-turn when
//!    something is directly ahead.
//!
//! The cycle arbiter decides which behavior owns the motor command; the object
//! spotter's sequence always wins on the cycle it fires.
//!
//! # Module Structure
//!
//! - `frame`: Camera frames and averaged color samples
//! - `gateway`: The device gateway trait plus scripted and synthetic gateways
//! - `observe`: Color observer and palette history
//! - `detect`: Target classifier, snapshot writer, avoidance sequence, spotter
//! - `navigate`: Reactive navigator
//! - `actuator`: Motor commands, indicator patterns, blinker
//! - `arbiter`: The per-cycle control loop
//! - `config`: Startup configuration (defaults, file, env) and validation

pub mod actuator;
pub mod arbiter;
pub mod config;
pub mod detect;
pub mod frame;
pub mod gateway;
pub mod navigate;
pub mod observe;

pub use actuator::{ActuatorState, Blinker, IndicatorPattern, MotorCommand};
pub use arbiter::{CycleArbiter, CycleReport, MotorSource};
pub use config::{PauseMode, PilotConfig};
pub use detect::{
    AvoidanceSequence, ChannelRange, DetectionState, ManeuverPhase, MaskResult, ObjectSpotter,
    PixelClassifier, SnapshotRecord, SpotOutcome, TargetBox,
};
pub use frame::{Frame, Rgb};
pub use gateway::{
    ArenaConfig, DeviceGateway, GatewayCall, Scene, ScriptedGateway, SyntheticArena, TickScript,
};
pub use navigate::{NavDecision, NavMode, Navigator};
pub use observe::{ColorObserver, Observation, PaletteColor};
