//! Cycle arbiter: the per-tick control loop.
//!
//! Each cycle runs, in order:
//! 1. reset pending actuators to neutral
//! 2. read proximity sensors
//! 3. update the indicator pattern
//! 4. sample the averaged camera color and observe it
//! 5. report the observed color and the seen summary
//! 6. poll the object spotter; on a trigger, drive the avoidance sequence
//! 7. otherwise let the navigator pick the motor command
//! 8. apply actuators and step the simulation
//!
//! Steps 6 and 7 are exclusive: a cycle's motor command has exactly one source.

use anyhow::Result;

use crate::actuator::{ActuatorState, Blinker, IndicatorPattern, MotorCommand};
use crate::config::PilotConfig;
use crate::detect::{ManeuverAction, ObjectSpotter, Pause, SpotOutcome};
use crate::gateway::DeviceGateway;
use crate::navigate::{NavMode, Navigator};
use crate::observe::{ColorObserver, Observation};

/// Which behavior produced the cycle's final motor command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotorSource {
    Navigator(NavMode),
    Spotter,
}

/// What happened during one cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct CycleReport {
    /// 1-based cycle number.
    pub cycle: u64,
    pub observation: Observation,
    pub spot: SpotOutcome,
    pub source: MotorSource,
    pub command: MotorCommand,
    pub indicators: IndicatorPattern,
}

pub struct CycleArbiter<G> {
    gateway: G,
    observer: ColorObserver,
    spotter: ObjectSpotter,
    navigator: Navigator,
    blinker: Blinker,
    actuators: ActuatorState,
    sample_size: u32,
    cycle: u64,
}

impl<G: DeviceGateway> CycleArbiter<G> {
    /// Validates `config` first; an invalid config never reaches the gateway.
    pub fn new(config: &PilotConfig, gateway: G) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            gateway,
            observer: ColorObserver::new(&config.palette),
            spotter: ObjectSpotter::new(config),
            navigator: Navigator::new(&config.navigator),
            blinker: Blinker::new(config.indicators.blink_period),
            actuators: ActuatorState::default(),
            sample_size: config.camera.sample_size,
            cycle: 0,
        })
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn into_gateway(self) -> G {
        self.gateway
    }

    pub fn observer(&self) -> &ColorObserver {
        &self.observer
    }

    pub fn spotter(&self) -> &ObjectSpotter {
        &self.spotter
    }

    /// Cycles completed so far.
    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Run until a gateway call fails. There is no other exit.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.run_cycle()?;
        }
    }

    pub fn run_cycles(&mut self, count: u64) -> Result<()> {
        for _ in 0..count {
            self.run_cycle()?;
        }
        Ok(())
    }

    pub fn run_cycle(&mut self) -> Result<CycleReport> {
        self.cycle += 1;
        self.actuators.reset();

        let distances = self.gateway.read_distances()?;
        self.actuators.indicators = self.blinker.next_pattern();

        let average = self.gateway.read_camera_average_color(self.sample_size)?;
        let observation = self.observer.observe(&average);
        if let Some(color) = observation.detected {
            if observation.newly_seen {
                log::info!("I see {} (first sighting)", color);
            } else {
                log::info!("I see {}", color);
            }
            let summary: Vec<&str> = self
                .observer
                .seen_summary()
                .into_iter()
                .map(|c| c.name())
                .collect();
            log::info!("previously seen colors: {}", summary.join(", "));
        }

        let spot = self.spotter.poll(&mut self.gateway)?;
        let (source, command) = if spot.is_triggered() {
            (MotorSource::Spotter, self.drive_maneuver()?)
        } else {
            let decision = self.navigator.decide(&distances)?;
            (MotorSource::Navigator(decision.mode), decision.command)
        };
        self.actuators.motors = command;

        self.actuators.apply(&mut self.gateway)?;
        self.gateway.commit_and_step()?;

        log::debug!(
            "cycle {}: {:?} left={:.2} right={:.2}",
            self.cycle,
            source,
            command.left,
            command.right
        );
        Ok(CycleReport {
            cycle: self.cycle,
            observation,
            spot,
            source,
            command,
            indicators: self.actuators.indicators,
        })
    }

    /// Drive the armed avoidance sequence to completion. Returns the last
    /// command it applied, which the cycle's closing step commits.
    fn drive_maneuver(&mut self) -> Result<MotorCommand> {
        let mut last = MotorCommand::STOP;
        while let Some(action) = self.spotter.sequence_mut().next_action() {
            match action {
                ManeuverAction::Drive { command, step } => {
                    self.actuators.motors = command;
                    self.actuators.apply(&mut self.gateway)?;
                    if step {
                        self.gateway.commit_and_step()?;
                    }
                    last = command;
                }
                ManeuverAction::Hold(Pause::WallClock(duration)) => {
                    log::info!("holding for {:.1}s", duration.as_secs_f64());
                    self.gateway.hold(duration)?;
                }
                ManeuverAction::Hold(Pause::SimTicks(ticks)) => {
                    log::info!("holding for {} simulation ticks", ticks);
                    for _ in 0..ticks {
                        self.gateway.commit_and_step()?;
                    }
                }
            }
        }
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayCall, ScriptedGateway, TickScript};

    fn small_config() -> PilotConfig {
        let mut cfg = PilotConfig::default();
        cfg.camera.width = 10;
        cfg.camera.height = 10;
        cfg
    }

    #[test]
    fn cycle_reads_then_applies_then_steps() -> Result<()> {
        let cfg = small_config();
        let mut arbiter = CycleArbiter::new(&cfg, ScriptedGateway::new(10, 10, 8))?;

        let report = arbiter.run_cycle()?;
        assert_eq!(report.cycle, 1);
        assert_eq!(report.source, MotorSource::Navigator(NavMode::Cruising));
        assert_eq!(report.spot, SpotOutcome::Waiting);
        assert_eq!(
            arbiter.gateway().calls(),
            &[
                GatewayCall::ReadDistances,
                GatewayCall::ReadAverageColor(5),
                GatewayCall::SetMotors(MotorCommand::new(3.14, 3.14)),
                GatewayCall::SetIndicators(IndicatorPattern::ALL_ON),
                GatewayCall::Step,
            ]
        );
        Ok(())
    }

    #[test]
    fn obstacle_cycle_reports_avoiding() -> Result<()> {
        let cfg = small_config();
        let mut gw = ScriptedGateway::new(10, 10, 8);
        let mut blocked = vec![0.0; 8];
        blocked[0] = 3000.0;
        gw.push(TickScript::quiet(8).with_distances(blocked));
        let mut arbiter = CycleArbiter::new(&cfg, gw)?;

        let report = arbiter.run_cycle()?;
        assert_eq!(report.source, MotorSource::Navigator(NavMode::Avoiding));
        assert_eq!(report.command, MotorCommand::new(-4.5, -1.5));

        let report = arbiter.run_cycle()?;
        assert_eq!(report.source, MotorSource::Navigator(NavMode::Cruising));
        Ok(())
    }

    #[test]
    fn indicators_follow_the_blinker() -> Result<()> {
        let mut cfg = small_config();
        cfg.indicators.blink_period = 1;
        let mut arbiter = CycleArbiter::new(&cfg, ScriptedGateway::new(10, 10, 8))?;

        let lit = arbiter.run_cycle()?.indicators;
        let dark = arbiter.run_cycle()?.indicators;
        assert_eq!((lit, dark), (IndicatorPattern::ALL_ON, IndicatorPattern::OFF));
        Ok(())
    }

    #[test]
    fn invalid_config_is_rejected_before_the_loop() {
        let mut cfg = small_config();
        cfg.navigator.front_sensors = vec![0, 9];

        let err = match CycleArbiter::new(&cfg, ScriptedGateway::new(10, 10, 8)) {
            Ok(_) => panic!("front sensor 9 should fail validation"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn gateway_failure_stops_the_loop() {
        let cfg = small_config();
        let gw = ScriptedGateway::new(10, 10, 8).fail_reads_at_step(3);
        let mut arbiter = CycleArbiter::new(&cfg, gw).expect("valid config");

        let err = arbiter.run().unwrap_err();
        assert!(err.to_string().contains("offline"));
        assert_eq!(arbiter.cycles(), 4);
        assert_eq!(arbiter.gateway().steps(), 3);
    }
}
