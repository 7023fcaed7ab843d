use anyhow::{anyhow, Result};

use crate::config::PilotConfig;
use crate::detect::classifier::{PixelClassifier, TargetBox};
use crate::detect::maneuver::AvoidanceSequence;
use crate::detect::result::MaskResult;
use crate::detect::snapshot::{SnapshotRecord, SnapshotWriter};
use crate::frame::Frame;
use crate::gateway::DeviceGateway;

/// Throttle counter and the one-way trigger latch.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionState {
    frames_since_last_check: u32,
    check_interval: u32,
    triggered: bool,
    target_fraction: Option<f64>,
    fraction_threshold: f64,
}

impl DetectionState {
    pub fn new(check_interval: u32, fraction_threshold: f64) -> Self {
        Self {
            frames_since_last_check: 0,
            check_interval: check_interval.max(1),
            triggered: false,
            target_fraction: None,
            fraction_threshold,
        }
    }

    pub fn frames_since_last_check(&self) -> u32 {
        self.frames_since_last_check
    }

    pub fn check_interval(&self) -> u32 {
        self.check_interval
    }

    /// Once true, stays true for the life of the process.
    pub fn triggered(&self) -> bool {
        self.triggered
    }

    /// Fraction measured by the most recent analysis, if any ran.
    pub fn target_fraction(&self) -> Option<f64> {
        self.target_fraction
    }

    pub fn fraction_threshold(&self) -> f64 {
        self.fraction_threshold
    }

    /// Count one cycle. Returns true (and resets) when the interval fires.
    fn tick(&mut self) -> bool {
        self.frames_since_last_check += 1;
        if self.frames_since_last_check >= self.check_interval {
            self.frames_since_last_check = 0;
            true
        } else {
            false
        }
    }
}

/// Result of one `ObjectSpotter::poll`.
#[derive(Clone, Debug, PartialEq)]
pub enum SpotOutcome {
    /// Between analysis cycles; nothing fetched.
    Waiting,
    /// Frame analyzed, fraction at or below the threshold.
    Analyzed { fraction: f64 },
    /// First confident detection. `snapshot` is `None` when the write failed.
    Triggered {
        fraction: f64,
        snapshot: Option<SnapshotRecord>,
    },
    /// Already triggered earlier; the spotter no longer runs.
    Disabled,
}

impl SpotOutcome {
    pub fn is_triggered(&self) -> bool {
        matches!(self, SpotOutcome::Triggered { .. })
    }

    pub fn fraction(&self) -> Option<f64> {
        match self {
            SpotOutcome::Analyzed { fraction } | SpotOutcome::Triggered { fraction, .. } => {
                Some(*fraction)
            }
            SpotOutcome::Waiting | SpotOutcome::Disabled => None,
        }
    }
}

/// Throttled full-frame target search with a one-shot response.
pub struct ObjectSpotter<C = TargetBox> {
    state: DetectionState,
    classifier: C,
    snapshot: SnapshotWriter,
    sequence: AvoidanceSequence,
    width: u32,
    height: u32,
}

impl ObjectSpotter<TargetBox> {
    pub fn new(config: &PilotConfig) -> Self {
        Self::with_classifier(config, config.spotter.target)
    }
}

impl<C: PixelClassifier> ObjectSpotter<C> {
    pub fn with_classifier(config: &PilotConfig, classifier: C) -> Self {
        let spotter = &config.spotter;
        Self {
            state: DetectionState::new(spotter.check_interval, spotter.fraction_threshold),
            classifier,
            snapshot: SnapshotWriter::new(&spotter.snapshot_path, spotter.snapshot_size),
            sequence: AvoidanceSequence::new(&config.maneuver, config.timestep),
            width: config.camera.width,
            height: config.camera.height,
        }
    }

    pub fn state(&self) -> &DetectionState {
        &self.state
    }

    pub fn sequence(&self) -> &AvoidanceSequence {
        &self.sequence
    }

    pub fn sequence_mut(&mut self) -> &mut AvoidanceSequence {
        &mut self.sequence
    }

    /// Classify `frame`, which must match the configured camera size.
    pub fn analyze(&self, frame: &Frame) -> Result<MaskResult> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(anyhow!(
                "camera frame is {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            ));
        }
        Ok(self.classifier.classify_frame(frame))
    }

    /// Run once per control cycle.
    ///
    /// Only every `check_interval`-th call fetches and analyzes a frame. On the
    /// first analysis above the threshold the snapshot is written, the latch is
    /// set and the avoidance sequence is armed; the caller drives the sequence.
    /// A failed snapshot write is logged and still sets the latch.
    pub fn poll<G: DeviceGateway + ?Sized>(&mut self, gateway: &mut G) -> Result<SpotOutcome> {
        if self.state.triggered {
            return Ok(SpotOutcome::Disabled);
        }
        if !self.state.tick() {
            return Ok(SpotOutcome::Waiting);
        }

        let frame = gateway.read_camera_frame()?;
        let mask = self.analyze(&frame)?;
        let fraction = mask.fraction();
        self.state.target_fraction = Some(fraction);
        log::debug!(
            "{}: {}/{} target pixels ({:.3})",
            self.classifier.name(),
            mask.matching,
            mask.total,
            fraction
        );

        if fraction <= self.state.fraction_threshold {
            return Ok(SpotOutcome::Analyzed { fraction });
        }

        log::info!(
            "target detected ({:.1}% of frame), saving snapshot",
            fraction * 100.0
        );
        let snapshot = match self.snapshot.write(&frame) {
            Ok(record) => {
                log::info!(
                    "snapshot {}x{} written to {} sha256={}",
                    record.width,
                    record.height,
                    record.path.display(),
                    record.sha256
                );
                Some(record)
            }
            Err(e) => {
                log::error!("snapshot write failed: {:#}", e);
                None
            }
        };
        self.state.triggered = true;
        self.sequence.start();

        Ok(SpotOutcome::Triggered { fraction, snapshot })
    }
}
