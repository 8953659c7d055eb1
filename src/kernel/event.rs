use image::RgbaImage;
use std::sync::Arc;

use super::state::{FrameSlot, Score};
use super::time::Millis;
use crate::artifact::Artifact;
use crate::error::Failure;
use crate::memory::history::HistoryRecord;

/// Everything the state machine reacts to. User controls and effect
/// outcomes arrive through the same channel.
#[derive(Debug, Clone)]
pub enum Event {
    /// Primary control pressed while idle, or the camera retry affordance.
    ArmRequested,
    CameraGranted { width: u32, height: u32 },
    CameraDenied { reason: String },
    CameraStabilized,
    FrameCaptured {
        slot: FrameSlot,
        at: Millis,
        image: Arc<RgbaImage>,
    },
    ScoreSelected(Score),
    ArtifactCompiled(Arc<Artifact>),
    TensionElapsed,
    RecordPersisted(HistoryRecord),
    Failed(Failure),
    Reset,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ArmRequested => "arm_requested",
            Event::CameraGranted { .. } => "camera_granted",
            Event::CameraDenied { .. } => "camera_denied",
            Event::CameraStabilized => "camera_stabilized",
            Event::FrameCaptured { .. } => "frame_captured",
            Event::ScoreSelected(_) => "score_selected",
            Event::ArtifactCompiled(_) => "artifact_compiled",
            Event::TensionElapsed => "tension_elapsed",
            Event::RecordPersisted(_) => "record_persisted",
            Event::Failed(_) => "failed",
            Event::Reset => "reset",
        }
    }
}
