mod classifier;
mod maneuver;
mod result;
mod snapshot;
mod spotter;

pub use classifier::{ChannelRange, PixelClassifier, TargetBox};
pub use maneuver::{AvoidanceSequence, ManeuverAction, ManeuverPhase, Pause};
pub use result::MaskResult;
pub use snapshot::{SnapshotRecord, SnapshotWriter};
pub use spotter::{DetectionState, ObjectSpotter, SpotOutcome};
