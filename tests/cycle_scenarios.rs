use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;

use arena_pilot::{
    ArenaConfig, CycleArbiter, GatewayCall, MotorCommand, MotorSource, NavMode, PaletteColor,
    PauseMode, PilotConfig, Rgb, Scene, ScriptedGateway, SpotOutcome, SyntheticArena, TickScript,
};

const SENSORS: usize = 8;
const BACKGROUND: [u8; 3] = [200, 200, 200];
const BROWN: [u8; 3] = [40, 60, 130];

fn config(dir: &TempDir) -> PilotConfig {
    let mut cfg = PilotConfig::default();
    cfg.spotter.snapshot_path = dir.path().join("target_detected.png");
    cfg
}

fn target_scene(fraction: f64) -> TickScript {
    TickScript::quiet(SENSORS).with_scene(Scene::Target {
        background: BACKGROUND,
        target: BROWN,
        fraction,
    })
}

fn gateway(cfg: &PilotConfig, idle: TickScript) -> ScriptedGateway {
    ScriptedGateway::new(cfg.camera.width, cfg.camera.height, SENSORS).with_idle(idle)
}

#[test]
fn red_average_is_reported_and_remembered() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let cfg = config(&dir);
    let mut gw = gateway(&cfg, TickScript::quiet(SENSORS));
    gw.push(TickScript::quiet(SENSORS).with_average(Rgb::new(200.0, 50.0, 50.0)));
    let mut arbiter = CycleArbiter::new(&cfg, gw)?;

    let first = arbiter.run_cycle()?;
    assert_eq!(first.observation.detected, Some(PaletteColor::Red));
    assert!(first.observation.newly_seen);
    assert_eq!(arbiter.observer().seen_summary(), vec![PaletteColor::Red]);

    let second = arbiter.run_cycle()?;
    assert_eq!(second.observation.detected, None);
    assert!(arbiter.observer().has_seen(PaletteColor::Red));
    Ok(())
}

#[test]
fn blue_must_clear_the_higher_minimum() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let cfg = config(&dir);
    let mut gw = gateway(&cfg, TickScript::quiet(SENSORS));
    gw.push(TickScript::quiet(SENSORS).with_average(Rgb::new(30.0, 40.0, 130.0)));
    gw.push(TickScript::quiet(SENSORS).with_average(Rgb::new(30.0, 40.0, 200.0)));
    let mut arbiter = CycleArbiter::new(&cfg, gw)?;

    let sky = arbiter.run_cycle()?;
    assert_eq!(sky.observation.detected, None);
    assert!(!arbiter.observer().has_seen(PaletteColor::Blue));

    let wall = arbiter.run_cycle()?;
    assert_eq!(wall.observation.detected, Some(PaletteColor::Blue));
    assert_eq!(arbiter.observer().seen_summary(), vec![PaletteColor::Blue]);
    Ok(())
}

#[test]
fn target_above_threshold_runs_the_maneuver_once() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let cfg = config(&dir);
    let snapshot = cfg.spotter.snapshot_path.clone();
    let mut arbiter = CycleArbiter::new(&cfg, gateway(&cfg, target_scene(0.06)))?;

    for _ in 0..4 {
        let report = arbiter.run_cycle()?;
        assert_eq!(report.spot, SpotOutcome::Waiting);
        assert_eq!(report.source, MotorSource::Navigator(NavMode::Cruising));
    }
    assert!(!snapshot.exists());

    let fired = arbiter.run_cycle()?;
    assert!(fired.spot.is_triggered());
    assert!(fired.spot.fraction().is_some_and(|f| f > 0.05));
    assert_eq!(fired.source, MotorSource::Spotter);
    assert_eq!(fired.command, MotorCommand::new(2.0, -2.0));
    assert!(snapshot.exists());
    assert!(arbiter.spotter().state().triggered());
    let written = match &fired.spot {
        SpotOutcome::Triggered { snapshot, .. } => snapshot.clone(),
        other => panic!("expected trigger, got {:?}", other),
    };
    assert_eq!(written.map(|r| (r.width, r.height)), Some((32, 32)));

    let gw = arbiter.gateway();
    let cruise = MotorCommand::new(3.14, 3.14);
    assert_eq!(
        gw.committed_commands(),
        vec![
            cruise,
            cruise,
            cruise,
            cruise,
            MotorCommand::STOP,
            MotorCommand::new(-3.0, -3.0),
            MotorCommand::new(2.0, -2.0),
        ]
    );
    let holds: Vec<_> = gw
        .calls()
        .iter()
        .filter(|call| matches!(call, GatewayCall::Hold(_)))
        .collect();
    assert_eq!(holds, vec![&GatewayCall::Hold(Duration::from_millis(3000))]);

    // The latch holds: later cycles never fetch a frame or rewrite the snapshot.
    std::fs::remove_file(&snapshot)?;
    for _ in 0..20 {
        let report = arbiter.run_cycle()?;
        assert_eq!(report.spot, SpotOutcome::Disabled);
        assert_eq!(report.source, MotorSource::Navigator(NavMode::Cruising));
    }
    assert!(!snapshot.exists());
    assert_eq!(arbiter.gateway().frame_reads(), 1);
    Ok(())
}

#[test]
fn target_below_threshold_has_no_side_effects() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let cfg = config(&dir);
    let snapshot = cfg.spotter.snapshot_path.clone();
    let mut arbiter = CycleArbiter::new(&cfg, gateway(&cfg, target_scene(0.04)))?;

    let mut fractions = Vec::new();
    for _ in 0..15 {
        let report = arbiter.run_cycle()?;
        assert_eq!(report.source, MotorSource::Navigator(NavMode::Cruising));
        if let Some(fraction) = report.spot.fraction() {
            assert!(!report.spot.is_triggered());
            fractions.push(fraction);
        }
    }

    assert_eq!(fractions.len(), 3);
    assert!(fractions.iter().all(|f| (f - 0.04).abs() < 0.001));
    assert_eq!(arbiter.spotter().state().target_fraction(), fractions.last().copied());
    assert!(!arbiter.spotter().state().triggered());
    assert!(!snapshot.exists());
    assert_eq!(arbiter.gateway().steps(), 15);
    Ok(())
}

#[test]
fn sim_tick_pause_keeps_stepping_with_wheels_stopped() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut cfg = config(&dir);
    cfg.spotter.check_interval = 1;
    cfg.maneuver.pause_mode = PauseMode::SimTicks;
    let mut arbiter = CycleArbiter::new(&cfg, gateway(&cfg, target_scene(0.5)))?;

    let report = arbiter.run_cycle()?;
    assert!(report.spot.is_triggered());

    let gw = arbiter.gateway();
    assert!(!gw.calls().iter().any(|call| matches!(call, GatewayCall::Hold(_))));
    // 3000ms at 64ms per tick, rounded up.
    let committed = gw.committed_commands();
    assert_eq!(committed.len(), 1 + 47 + 1 + 1);
    assert!(committed[..48].iter().all(|cmd| *cmd == MotorCommand::STOP));
    assert_eq!(committed[48], MotorCommand::new(-3.0, -3.0));
    assert_eq!(committed[49], MotorCommand::new(2.0, -2.0));
    Ok(())
}

#[test]
fn obstacle_ahead_overrides_cruising() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let cfg = config(&dir);
    let mut gw = gateway(&cfg, TickScript::quiet(SENSORS));
    let mut blocked = vec![0.0; SENSORS];
    blocked[7] = 2000.0;
    gw.push(TickScript::quiet(SENSORS).with_distances(blocked));
    let mut arbiter = CycleArbiter::new(&cfg, gw)?;

    let report = arbiter.run_cycle()?;
    assert_eq!(report.source, MotorSource::Navigator(NavMode::Avoiding));
    assert_eq!(report.command, MotorCommand::new(-4.5, -1.5));
    Ok(())
}

#[test]
fn malformed_sensor_snapshot_stops_the_loop() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = config(&dir);
    let mut gw = gateway(&cfg, TickScript::quiet(SENSORS));
    gw.push(TickScript::quiet(SENSORS).with_distances(vec![0.0; 3]));
    let mut arbiter = CycleArbiter::new(&cfg, gw).expect("valid config");

    let err = arbiter.run().unwrap_err();
    assert!(err.to_string().contains("malformed sensor snapshot"));
    assert_eq!(arbiter.gateway().steps(), 0);
}

#[test]
fn camera_failure_on_analysis_cycle_stops_the_loop() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = config(&dir);
    let gw = gateway(&cfg, target_scene(0.06)).fail_frames_at_step(0);
    let mut arbiter = CycleArbiter::new(&cfg, gw).expect("valid config");

    let err = arbiter.run().unwrap_err();
    assert!(err.to_string().contains("camera offline"));
    // Four waiting cycles stepped; the fifth failed at its frame fetch.
    assert_eq!(arbiter.cycles(), 5);
    assert_eq!(arbiter.gateway().steps(), 4);
    assert_eq!(arbiter.gateway().calls().last(), Some(&GatewayCall::ReadFrame));
    assert!(!arbiter.spotter().state().triggered());
    assert!(!cfg.spotter.snapshot_path.exists());
}

#[test]
fn actuator_failure_mid_maneuver_stops_the_loop() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = config(&dir);
    cfg.spotter.check_interval = 1;
    // The stop step is committed; the reverse command then hits the fault.
    let gw = gateway(&cfg, target_scene(0.5)).fail_motors_at_step(1);
    let mut arbiter = CycleArbiter::new(&cfg, gw).expect("valid config");

    let err = arbiter.run().unwrap_err();
    assert!(err.to_string().contains("motor driver fault"));
    assert_eq!(arbiter.cycles(), 1);

    let gw = arbiter.gateway();
    assert_eq!(gw.steps(), 1);
    assert_eq!(gw.committed_commands(), vec![MotorCommand::STOP]);
    assert_eq!(
        gw.calls().last(),
        Some(&GatewayCall::SetMotors(MotorCommand::new(-3.0, -3.0)))
    );
    assert!(arbiter.spotter().state().triggered());
}

#[test]
fn invalid_config_never_reaches_the_gateway() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = config(&dir);
    cfg.navigator.front_sensors = vec![0, 9];
    assert!(cfg.validate().is_err());

    let result = CycleArbiter::new(&cfg, gateway(&cfg, TickScript::quiet(SENSORS)));
    let err = match result {
        Ok(_) => panic!("invalid config accepted"),
        Err(e) => e,
    };
    assert!(err.to_string().contains("front sensor 9"));
}

#[test]
fn synthetic_arena_run_sees_walls_and_finds_target() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut cfg = config(&dir);
    cfg.maneuver.pause = Duration::ZERO;
    let arena = SyntheticArena::new(ArenaConfig {
        width: cfg.camera.width,
        height: cfg.camera.height,
        sensor_count: cfg.sensor_count(),
        front_sensors: cfg.navigator.front_sensors.clone(),
        seed: 11,
    })?;
    let mut arbiter = CycleArbiter::new(&cfg, arena)?;

    let mut avoided = false;
    for _ in 0..400 {
        let report = arbiter.run_cycle()?;
        avoided |= report.source == MotorSource::Navigator(NavMode::Avoiding);
    }

    assert!(avoided);
    assert_eq!(
        arbiter.observer().seen_summary(),
        vec![PaletteColor::Red, PaletteColor::Green, PaletteColor::Blue]
    );
    assert!(arbiter.spotter().state().triggered());
    assert!(cfg.spotter.snapshot_path.exists());
    assert!(arbiter.gateway().stats().ticks > 400);
    Ok(())
}
